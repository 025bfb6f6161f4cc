//! Per-tile register map.
//!
//! All offsets are tile-local (below `1 << 18`) and hold 32-bit registers.
//! Compute tiles and shim tiles share the stream switch register layout
//! but differ in block sizes and slot counts; the DMA blocks differ in
//! stride.

/// Generic register value: bit not set / feature off
pub const DISABLE: u32 = 0;

/// Generic register value: bit set / feature on
pub const ENABLE: u32 = 1;

// Tile DMA

/// Buffer descriptors per tile DMA
pub const DMA_BD_COUNT: u32 = 16;

/// Bytes between consecutive tile DMA BDs
pub const REG_DMA_BD_BLOCK_SIZE: u32 = 0x20;

/// Address-A register of tile DMA BD `idx`
pub const fn reg_dma_addr_a_bd(idx: u32) -> u32 {
    0x1D000 + idx * REG_DMA_BD_BLOCK_SIZE
}

/// S2MM DMA channels per tile
pub const DMA_S2MM_CHANNEL_COUNT: u32 = 2;

/// Bytes between consecutive S2MM channel register pairs
pub const REG_DMA_S2MM_BLOCK_SIZE: u32 = 0x08;

/// Control register of S2MM channel `channel`
pub const fn reg_dma_s2mm_ctrl(channel: u32) -> u32 {
    0x1DE00 + channel * REG_DMA_S2MM_BLOCK_SIZE
}

/// Start-queue register of S2MM channel `channel`
pub const fn reg_dma_s2mm_queue(channel: u32) -> u32 {
    reg_dma_s2mm_ctrl(channel) + 0x4
}

/// MM2S DMA channels per tile
pub const DMA_MM2S_CHANNEL_COUNT: u32 = 2;

/// Bytes between consecutive MM2S channel register pairs
pub const REG_DMA_MM2S_BLOCK_SIZE: u32 = 0x08;

/// Control register of MM2S channel `channel`
pub const fn reg_dma_mm2s_ctrl(channel: u32) -> u32 {
    0x1DE10 + channel * REG_DMA_MM2S_BLOCK_SIZE
}

/// Start-queue register of MM2S channel `channel`
pub const fn reg_dma_mm2s_queue(channel: u32) -> u32 {
    reg_dma_mm2s_ctrl(channel) + 0x4
}

// Shim DMA

/// Buffer descriptors per shim DMA
pub const SHIM_DMA_BD_COUNT: u32 = 16;

/// Bytes between consecutive shim DMA BDs
pub const REG_SHIM_DMA_BD_SIZE: u32 = 0x14;

/// Low-address register of shim DMA BD `idx`
pub const fn reg_shim_dma_bd(idx: u32) -> u32 {
    0x1D000 + idx * REG_SHIM_DMA_BD_SIZE
}

/// Shim stream mux configuration register
pub const REG_SHM_MUX: u32 = 0x1F000;

/// Shim stream demux configuration register
pub const REG_SHM_DEMUX: u32 = 0x1F004;

// Common stream switch definitions

/// First stream switch master port configuration register
pub const REG_SSM_CFG_0: u32 = 0x3F000;

/// First stream switch slave port configuration register
pub const REG_SSS_CFG_0: u32 = 0x3F100;

/// First stream switch packet slot configuration register
pub const REG_SSS_CFG_SLOT_0: u32 = 0x3F200;

/// Bytes per packet slot block
pub const SSS_CFG_SLOT_BLOCK_SIZE: u32 = 0x10;

// ME (compute tile) stream switches

pub const ME_SSM_BLOCK_SIZE: u32 = 0x64;
pub const ME_SSS_CFG_BLOCK_SIZE: u32 = 0x6C;
pub const ME_SSS_CFG_SLOT_COUNT: u32 = 26;

// Shim stream switches

pub const SHIM_SSM_BLOCK_SIZE: u32 = 0x5C;
pub const SHIM_SSS_CFG_BLOCK_SIZE: u32 = 0x60;
pub const SHIM_SSS_CFG_SLOT_COUNT: u32 = 24;

// Memories

/// 32KB data memory
pub const DATA_MEM_OFFSET: u32 = 0x00000;
pub const DATA_MEM_SIZE: u32 = 0x08000;

/// 16KB program memory
pub const PROG_MEM_OFFSET: u32 = 0x20000;
pub const PROG_MEM_SIZE: u32 = 0x4000;
