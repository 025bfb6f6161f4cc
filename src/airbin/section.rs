//! AIRBIN section naming.
//!
//! Output sections are named after the register region their start
//! address falls into, so a loader (or a human with `readelf`) can tell
//! what each blob of writes configures.

use crate::device::regs::{
    reg_dma_addr_a_bd, reg_dma_s2mm_ctrl, DATA_MEM_OFFSET, PROG_MEM_OFFSET, REG_SHM_MUX,
    REG_SSM_CFG_0, REG_SSS_CFG_0, REG_SSS_CFG_SLOT_0,
};
use crate::device::addr::TILE_ADDR_OFF_WIDTH;

/// Section kinds recognized by the AIRBIN loader, in string-table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SectionKind {
    Null = 0,
    SsMaster,
    SsSlave,
    SsPacket,
    ShimDmaBd,
    ShimMux,
    ShimDmaCtl,
    ProgMem,
    TileDmaBd,
    TileDmaCtl,
    Deprecated,
    DataMem,
}

impl SectionKind {
    /// Number of section kinds.
    pub const COUNT: usize = 12;

    /// All kinds, in index order.
    pub const ALL: [SectionKind; Self::COUNT] = [
        SectionKind::Null,
        SectionKind::SsMaster,
        SectionKind::SsSlave,
        SectionKind::SsPacket,
        SectionKind::ShimDmaBd,
        SectionKind::ShimMux,
        SectionKind::ShimDmaCtl,
        SectionKind::ProgMem,
        SectionKind::TileDmaBd,
        SectionKind::TileDmaCtl,
        SectionKind::Deprecated,
        SectionKind::DataMem,
    ];

    /// The canonical section name.
    pub fn name(self) -> &'static str {
        match self {
            SectionKind::Null => "null",
            SectionKind::SsMaster => ".ssmast",
            SectionKind::SsSlave => ".ssslve",
            SectionKind::SsPacket => ".sspckt",
            SectionKind::ShimDmaBd => ".sdma.bd",
            SectionKind::ShimMux => ".shmmux",
            SectionKind::ShimDmaCtl => ".sdma.ctl",
            SectionKind::ProgMem => ".prgm.mem",
            SectionKind::TileDmaBd => ".tdma.bd",
            SectionKind::TileDmaCtl => ".tdma.ctl",
            SectionKind::Deprecated => "deprecated",
            SectionKind::DataMem => ".data.mem",
        }
    }

    /// Classify a device address by the register region of its tile-local
    /// offset.
    pub fn from_address(addr: u64) -> Self {
        const BD0: u32 = reg_dma_addr_a_bd(0);
        const BD10: u32 = reg_dma_addr_a_bd(10);
        const S2MM_CTRL0: u32 = reg_dma_s2mm_ctrl(0);

        match (addr & ((1 << TILE_ADDR_OFF_WIDTH) - 1)) as u32 {
            DATA_MEM_OFFSET => SectionKind::DataMem,
            REG_SSM_CFG_0 => SectionKind::SsMaster,
            REG_SSS_CFG_0 => SectionKind::SsSlave,
            REG_SSS_CFG_SLOT_0 => SectionKind::SsPacket,
            BD0 => SectionKind::ShimDmaBd,
            REG_SHM_MUX => SectionKind::ShimMux,
            BD10 => SectionKind::ShimDmaCtl,
            PROG_MEM_OFFSET => SectionKind::ProgMem,
            S2MM_CTRL0 => SectionKind::TileDmaCtl,
            _ => SectionKind::Null,
        }
    }
}
