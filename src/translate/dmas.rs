//! Tile DMA configuration: buffer descriptor chains and channel starts.
//!
//! Each compute tile's DMA program is a list of basic blocks. Every block
//! holding a BD op is assigned the next free descriptor slot; the block's
//! lock, packet, and buffer ops are folded into the slot's registers, and
//! block successors become next-BD chains. Channel-start ops then point
//! the channel queues at their first descriptor and enable the channels.

use std::collections::HashMap;

use anyhow::{anyhow, Result};

use crate::airbin::WriteStore;
use crate::device::regs::{
    reg_dma_addr_a_bd, reg_dma_mm2s_ctrl, reg_dma_mm2s_queue, reg_dma_s2mm_ctrl,
    reg_dma_s2mm_queue, DISABLE, DMA_BD_COUNT, DMA_MM2S_CHANNEL_COUNT, DMA_S2MM_CHANNEL_COUNT,
    ENABLE,
};
use crate::device::{Address, Bit, Field, TileAddress};
use crate::ir::{BdSide, Device, DmaBlock, DmaDirection, DmaOp, LockAction, NetlistAnalysis};

type DmaChannelReset = Bit<1>;
type DmaChannelEnable = Bit<0>;

/// Everything gathered from one block's BD ops.
#[derive(Debug, Default)]
struct BdInfo {
    found_bd: bool,
    has_a: bool,
    has_b: bool,
    base_a: u64,
    base_b: u64,
    len_a: u32,
    len_b: u32,
    bytes_a: u32,
    bytes_b: u32,
    offset_a: u32,
    offset_b: u32,
    ab_mode: u32,
    fifo_mode: u32,
    found_packet: bool,
    packet_type: u8,
    packet_id: u8,
}

fn bd_info(block: &DmaBlock, device: &Device, netlist: &NetlistAnalysis) -> Result<BdInfo> {
    let mut info = BdInfo::default();

    for op in &block.ops {
        let DmaOp::Bd {
            side,
            buffer,
            len,
            offset,
        } = op
        else {
            continue;
        };

        info.found_bd = true;
        let def = device
            .buffer(buffer)
            .ok_or_else(|| anyhow!("BD references unknown buffer {buffer}"))?;
        let base = netlist
            .buffer_base_address(buffer)
            .ok_or_else(|| anyhow!("buffer {buffer} has no base address"))?;

        match side {
            BdSide::A => {
                info.base_a = base;
                info.len_a = *len;
                info.bytes_a = def.element_bits / 8;
                info.offset_a = *offset;
                info.has_a = true;
            }
            BdSide::B => {
                info.base_b = base;
                info.len_b = *len;
                info.bytes_b = def.element_bits / 8;
                info.offset_b = *offset;
                info.has_b = true;
            }
        }
    }

    Ok(info)
}

/// Configure the DMA of every compute tile with a memory op.
pub(crate) fn configure_dmas(
    device: &Device,
    netlist: &NetlistAnalysis,
    store: &mut WriteStore,
) -> Result<()> {
    log::debug!("configuring DMAs");

    for mem in &device.mems {
        let tile = TileAddress::new(mem.col, mem.row);
        log::debug!("DMA: tile {tile}");

        // Quiesce every channel before touching descriptors.
        for ch in 0..DMA_S2MM_CHANNEL_COUNT {
            store.write32(
                Address::new(tile, reg_dma_s2mm_ctrl(ch)),
                DmaChannelReset::of(DISABLE) | DmaChannelEnable::of(DISABLE),
            );
            store.write32(Address::new(tile, reg_dma_s2mm_queue(ch)), 0);
        }
        for ch in 0..DMA_MM2S_CHANNEL_COUNT {
            store.write32(
                Address::new(tile, reg_dma_mm2s_ctrl(ch)),
                DmaChannelReset::of(DISABLE) | DmaChannelEnable::of(DISABLE),
            );
            store.write32(Address::new(tile, reg_dma_mm2s_queue(ch)), 0);
        }

        // Assign each block holding a BD op a descriptor slot.
        let mut bd_nums: HashMap<usize, u32> = HashMap::new();
        let mut next_num = 0u32;
        for (index, block) in mem.blocks.iter().enumerate() {
            if block.ops.iter().any(|op| matches!(op, DmaOp::Bd { .. })) {
                bd_nums.insert(index, next_num);
                next_num += 1;
            }
        }

        for (index, block) in mem.blocks.iter().enumerate() {
            let mut info = bd_info(block, device, netlist)?;

            if info.has_a && info.has_b {
                info.ab_mode = ENABLE;
                if info.len_a != info.len_b {
                    log::error!("AB mode must have matching lengths");
                }
                if info.bytes_a != info.bytes_b {
                    log::error!("AB mode must have matching element data types");
                }
            }

            let mut acq_value = 0u32;
            let mut rel_value = 0u32;
            let mut acq_enable = DISABLE;
            let mut rel_enable = DISABLE;
            let mut lock_id: Option<u32> = None;

            for op in &block.ops {
                let DmaOp::UseLock { lock, action, value } = op else {
                    continue;
                };
                lock_id = Some(*lock);
                match action {
                    LockAction::Acquire => {
                        acq_enable = ENABLE;
                        acq_value = *value;
                    }
                    LockAction::Release => {
                        rel_enable = ENABLE;
                        rel_value = *value;
                    }
                }
            }

            // Either the scan saw a lock and set an enable, or it saw
            // nothing and both stay disabled.
            assert!(
                lock_id.is_some() != (acq_enable == DISABLE && rel_enable == DISABLE),
                "lock use in tile {tile} must acquire or release exactly one lock"
            );

            for op in &block.ops {
                let DmaOp::Packet {
                    packet_type,
                    packet_id,
                } = op
                else {
                    continue;
                };
                info.found_packet = true;
                info.packet_type = *packet_type;
                info.packet_id = *packet_id;
            }

            if !info.found_bd {
                continue;
            }
            let bd_num = bd_nums[&index];

            type BdAddressLockId = Field<25, 22>;
            type BdAddressReleaseEnable = Bit<21>;
            type BdAddressReleaseValue = Bit<20>;
            type BdAddressReleaseValueEnable = Bit<19>;
            type BdAddressAcquireEnable = Bit<18>;
            type BdAddressAcquireValue = Bit<17>;
            type BdAddressAcquireValueEnable = Bit<16>;
            type BdAddressBase = Field<12, 0>;

            let mut addr_a = 0u32;
            let mut addr_b = 0u32;

            if info.has_a {
                if let Some(lock) = lock_id {
                    addr_a = BdAddressLockId::of(lock)
                        | BdAddressReleaseEnable::of(rel_enable)
                        | BdAddressAcquireEnable::of(acq_enable);

                    if rel_value != 0xFF {
                        addr_a |= BdAddressReleaseValueEnable::of(ENABLE)
                            | BdAddressReleaseValue::of(rel_value);
                    }
                    if acq_value != 0xFF {
                        addr_a |= BdAddressAcquireValueEnable::of(ENABLE)
                            | BdAddressAcquireValue::of(acq_value);
                    }
                }
            } else if lock_id.is_some() {
                // The B side has no lock-control encoding in this BD layout.
                panic!("lock controls on a B-only descriptor are not supported");
            }

            let base_a = info.base_a + info.offset_a as u64;
            let base_b = info.base_b + info.offset_b as u64;
            addr_a |= BdAddressBase::of((base_a >> 2) as u32);
            addr_b |= BdAddressBase::of((base_b >> 2) as u32);

            type BdControlLength = Field<12, 0>;
            type BdControlFifo = Bit<28>;
            type BdControlAbMode = Bit<30>;
            type BdControlEnableNextBd = Bit<17>;
            type BdControlNextBd = Field<16, 13>;
            type BdControlEnablePacket = Bit<27>;
            type BdControlValid = Bit<31>;

            let mut control = BdControlLength::of(info.len_a.wrapping_sub(1))
                | BdControlFifo::of(info.fifo_mode)
                | BdControlAbMode::of(info.ab_mode);

            if let Some(successor) = block.next {
                let next_bd = bd_nums.get(&successor).copied().unwrap_or(0);
                control |= BdControlEnableNextBd::of(ENABLE) | BdControlNextBd::of(next_bd);
            }

            // The X and Y registers have fields which need to be nonzero
            // in the default state.
            let x = 0x00FF_0001u32;
            let y = 0xFFFF_0100u32;
            let mut packet = 0u32;
            let interleave = 0u32;

            if info.found_packet {
                type BdPacketType = Field<14, 12>;
                type BdPacketId = Field<4, 0>;

                packet = BdPacketId::of(info.packet_id as u32)
                    | BdPacketType::of(info.packet_type as u32);
                control |= BdControlEnablePacket::of(ENABLE);
            }

            let bd_offset = reg_dma_addr_a_bd(bd_num);
            assert!(
                bd_offset < reg_dma_addr_a_bd(DMA_BD_COUNT),
                "descriptor number {bd_num} exceeds the BD slots of tile {tile}"
            );

            store.write32(Address::new(tile, bd_offset), addr_a);
            store.write32(Address::new(tile, bd_offset + 0x4), addr_b);
            store.write32(Address::new(tile, bd_offset + 0x8), x);
            store.write32(Address::new(tile, bd_offset + 0xC), y);
            store.write32(Address::new(tile, bd_offset + 0x10), packet);
            store.write32(Address::new(tile, bd_offset + 0x14), interleave);
            store.write32(
                Address::new(tile, bd_offset + 0x18),
                control | BdControlValid::of(ENABLE),
            );
        }

        // Point the channel queues at their start descriptors.
        for block in &mem.blocks {
            for op in &block.ops {
                let DmaOp::Start {
                    direction,
                    channel,
                    dest,
                } = op
                else {
                    continue;
                };
                let Some(&bd_num) = bd_nums.get(dest) else {
                    continue;
                };

                type DmaChannelQueueStartBd = Field<4, 0>;

                let ch = *channel as u32;
                let (queue, ctrl) = match direction {
                    DmaDirection::Mm2s => (reg_dma_mm2s_queue(ch), reg_dma_mm2s_ctrl(ch)),
                    DmaDirection::S2mm => (reg_dma_s2mm_queue(ch), reg_dma_s2mm_ctrl(ch)),
                };
                store.write32(Address::new(tile, queue), DmaChannelQueueStartBd::of(bd_num));
                store.write32(
                    Address::new(tile, ctrl),
                    DmaChannelEnable::of(ENABLE) | DmaChannelReset::of(DISABLE),
                );
            }
        }
    }

    Ok(())
}
