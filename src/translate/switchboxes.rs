//! Stream switch and shim mux configuration.
//!
//! Logical `(bundle, index)` ports are resolved to the physical port
//! numbers of the tile's crossbar, then each connect, master-set, and
//! packet-rules op becomes writes into the master, slave, and slot
//! register banks. Shim mux/demux connections accumulate into two shared
//! mask registers, read back through the write store so that successive
//! connects compose.

use crate::airbin::WriteStore;
use crate::device::regs::{
    DISABLE, ENABLE, REG_SHM_DEMUX, REG_SHM_MUX, REG_SSM_CFG_0, REG_SSS_CFG_0, REG_SSS_CFG_SLOT_0,
};
use crate::device::{Address, Bit, Field, TileAddress};
use crate::ir::{Device, ShimConnect, SwitchOp, WireBundle};

type StreamEnable = Bit<31>;
type StreamPacketEnable = Bit<30>;
type StreamMasterDropHeader = Bit<7>;
type StreamMasterConfig = Field<6, 0>;

const STREAM_SWITCH_MSEL_SHIFT: u32 = 3;
const STREAM_SWITCH_ARB_SHIFT: u32 = 0;
const STREAM_NUM_SLOTS: u32 = 4;

/// Resolve a logical bundle + index to a physical slave port number.
pub(crate) fn compute_slave_port(bundle: WireBundle, index: u8, is_shim: bool) -> u8 {
    assert!((index as usize) < u8::MAX as usize - 21);

    match bundle {
        WireBundle::Dma => 2 + index,
        WireBundle::East => (if is_shim { 19 } else { 21 }) + index,
        WireBundle::North => (if is_shim { 15 } else { 17 }) + index,
        WireBundle::South => (if is_shim { 3 } else { 7 }) + index,
        WireBundle::West => (if is_shim { 11 } else { 13 }) + index,
        other => panic!("no slave port mapping for wire bundle {other:?}"),
    }
}

/// Resolve a logical bundle + index to a physical master port number.
pub(crate) fn compute_master_port(bundle: WireBundle, index: u8, is_shim: bool) -> u8 {
    assert!((index as usize) < u8::MAX as usize - 21);

    match bundle {
        WireBundle::Dma => 2 + index,
        WireBundle::East => (if is_shim { 19 } else { 21 }) + index,
        WireBundle::North => (if is_shim { 13 } else { 15 }) + index,
        WireBundle::South => (if is_shim { 3 } else { 7 }) + index,
        WireBundle::West => (if is_shim { 9 } else { 11 }) + index,
        other => panic!("no master port mapping for wire bundle {other:?}"),
    }
}

/// Program every switchbox and shim mux of the device.
pub(crate) fn configure_switchboxes(device: &Device, store: &mut WriteStore) {
    log::debug!("configuring switchboxes");

    for switchbox in &device.switchboxes {
        if switchbox.ops.is_empty() {
            continue;
        }
        let tile = TileAddress::new(switchbox.col, switchbox.row);

        for op in &switchbox.ops {
            match op {
                SwitchOp::Connect { source, dest } => {
                    let slave_port = compute_slave_port(source.bundle, source.index, tile.is_shim());
                    let master_port = compute_master_port(dest.bundle, dest.index, tile.is_shim());

                    // Master side. Port numbers with bit 7 set ask the
                    // master to strip the packet header.
                    let drop_header = ((slave_port & 0x80) >> 7) as u32;
                    store.write32(
                        Address::new(tile, REG_SSM_CFG_0 + master_port as u32 * 4),
                        StreamEnable::of(ENABLE)
                            | StreamPacketEnable::of(DISABLE)
                            | StreamMasterDropHeader::of(drop_header)
                            | StreamMasterConfig::of(slave_port as u32),
                    );

                    // Slave side.
                    store.write32(
                        Address::new(tile, REG_SSS_CFG_0 + slave_port as u32 * 4),
                        StreamEnable::of(ENABLE) | StreamPacketEnable::of(DISABLE),
                    );
                }

                SwitchOp::MasterSet { dest, amsels } => {
                    let master_port = compute_master_port(dest.bundle, dest.index, tile.is_shim());

                    let mut mask = 0u32;
                    let mut arbiter = 0u32;
                    for amsel in amsels {
                        arbiter = amsel.arbiter as u32;
                        mask |= 1 << amsel.msel;
                    }

                    let drop_header = (dest.bundle == WireBundle::Dma) as u32;
                    // The mask and arbiter are folded through the 7-bit
                    // slave-config field; bit 7 of the composite is lost
                    // to the mask.
                    let config = StreamMasterDropHeader::of(drop_header)
                        | (mask << STREAM_SWITCH_MSEL_SHIFT)
                        | (arbiter << STREAM_SWITCH_ARB_SHIFT);

                    store.write32(
                        Address::new(tile, REG_SSM_CFG_0 + master_port as u32 * 4),
                        StreamEnable::of(ENABLE)
                            | StreamPacketEnable::of(ENABLE)
                            | StreamMasterDropHeader::of(drop_header)
                            | StreamMasterConfig::of(config),
                    );
                }

                SwitchOp::PacketRules { source, rules } => {
                    let slave_port = compute_slave_port(source.bundle, source.index, tile.is_shim());

                    store.write32(
                        Address::new(tile, REG_SSS_CFG_0 + slave_port as u32 * 4),
                        StreamEnable::of(ENABLE) | StreamPacketEnable::of(ENABLE),
                    );

                    type StreamSlotId = Field<28, 24>;
                    type StreamSlotMask = Field<20, 16>;
                    type StreamSlotEnable = Bit<8>;
                    type StreamSlotMsel = Field<5, 4>;
                    type StreamSlotArbit = Field<2, 0>;

                    for (slot, rule) in rules.iter().enumerate() {
                        let config = StreamSlotId::of(rule.value as u32)
                            | StreamSlotMask::of(rule.mask as u32)
                            | StreamSlotEnable::of(ENABLE)
                            | StreamSlotMsel::of(rule.amsel.msel as u32)
                            | StreamSlotArbit::of(rule.amsel.arbiter as u32);

                        store.write32(
                            Address::new(
                                tile,
                                REG_SSS_CFG_SLOT_0
                                    + STREAM_NUM_SLOTS * slave_port as u32
                                    + slot as u32,
                            ),
                            config,
                        );
                    }
                }
            }
        }
    }

    for mux in &device.shim_muxes {
        let tile = TileAddress::new(mux.col, mux.row);
        for connect in &mux.connects {
            config_shim_mux_connect(tile, connect, store);
        }
    }
}

/// Stream source selection code for the shim mux/demux registers.
fn input_mask_for(bundle: WireBundle, shift: u32) -> u32 {
    match bundle {
        WireBundle::Plio => 0 << shift,
        WireBundle::Dma => 1 << shift,
        WireBundle::Noc => 2 << shift,
        other => panic!("wire bundle {other:?} cannot drive the shim mux"),
    }
}

fn config_shim_mux_connect(tile: TileAddress, connect: &ShimConnect, store: &mut WriteStore) {
    if connect.source.bundle == WireBundle::North {
        // Demux: a north stream fans out to PLIO, DMA, or NOC.
        let shift = match connect.source.index {
            2 => 4,
            3 => 6,
            6 => 8,
            7 => 10,
            other => panic!("no demux selector for north index {other}"),
        };

        // Add to the possibly preexisting mask.
        let addr = Address::new(tile, REG_SHM_DEMUX);
        let current = store.read32(addr);
        store.write32(addr, current | input_mask_for(connect.dest.bundle, shift));
    } else if connect.dest.bundle == WireBundle::North {
        // Mux: PLIO, DMA, or NOC feeds a north stream.
        let shift = match connect.dest.index {
            2 => 8,
            3 => 10,
            6 => 12,
            7 => 14,
            other => panic!("no mux selector for north index {other}"),
        };

        let addr = Address::new(tile, REG_SHM_MUX);
        let current = store.read32(addr);
        store.write32(addr, current | input_mask_for(connect.source.bundle, shift));
    }
}
