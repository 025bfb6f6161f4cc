//! Netlist analysis: buffer placement in tile data memory.
//!
//! The translator itself never decides where a buffer lives; it asks this
//! collaborator. Placement is a first-fit stack per tile: buffers with a
//! pinned `address` keep it, everything else is packed upward from 0 in
//! declaration order, word aligned.

use std::collections::HashMap;

use crate::device::regs::DATA_MEM_SIZE;
use crate::device::TileAddress;

use super::Device;

/// Resolved buffer base addresses for one device.
#[derive(Debug, Default)]
pub struct NetlistAnalysis {
    bases: HashMap<String, u64>,
}

impl NetlistAnalysis {
    /// Place every buffer of the device.
    pub fn new(device: &Device) -> Self {
        let mut bases = HashMap::new();
        // Allocation cursors keyed by 16-bit tile identity.
        let mut cursors: HashMap<u16, u64> = HashMap::new();

        for buf in &device.buffers {
            let tile = TileAddress::new(buf.col, buf.row);
            let cursor = cursors.entry(tile.id()).or_insert(0);

            let base = buf.address.unwrap_or(*cursor);
            let end = (base + buf.size_bytes as u64 + 3) & !3;
            if end > *cursor {
                *cursor = end;
            }

            if end > DATA_MEM_SIZE as u64 {
                log::warn!(
                    "buffer {} ends at 0x{:X}, past data memory of tile {}",
                    buf.name,
                    end,
                    tile
                );
            }

            bases.insert(buf.name.clone(), base);
        }

        Self { bases }
    }

    /// Base address of a buffer in its tile's data memory.
    pub fn buffer_base_address(&self, name: &str) -> Option<u64> {
        self.bases.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::BufferDef;

    fn buffer(name: &str, col: u8, row: u8, size: u32, address: Option<u64>) -> BufferDef {
        BufferDef {
            name: name.into(),
            col,
            row,
            size_bytes: size,
            element_bits: 32,
            address,
        }
    }

    #[test]
    fn test_buffers_stack_per_tile() {
        let device = Device {
            buffers: vec![
                buffer("a", 1, 1, 0x100, None),
                buffer("b", 1, 1, 0x40, None),
                buffer("c", 2, 1, 0x80, None),
            ],
            ..Device::default()
        };

        let nl = NetlistAnalysis::new(&device);
        assert_eq!(nl.buffer_base_address("a"), Some(0));
        assert_eq!(nl.buffer_base_address("b"), Some(0x100));
        // A different tile starts its own stack.
        assert_eq!(nl.buffer_base_address("c"), Some(0));
    }

    #[test]
    fn test_pinned_address_is_kept() {
        let device = Device {
            buffers: vec![
                buffer("a", 1, 1, 0x40, Some(0x400)),
                buffer("b", 1, 1, 0x40, None),
            ],
            ..Device::default()
        };

        let nl = NetlistAnalysis::new(&device);
        assert_eq!(nl.buffer_base_address("a"), Some(0x400));
        assert_eq!(nl.buffer_base_address("b"), Some(0x440));
    }

    #[test]
    fn test_unaligned_sizes_round_up() {
        let device = Device {
            buffers: vec![
                buffer("a", 1, 1, 0x41, None),
                buffer("b", 1, 1, 0x10, None),
            ],
            ..Device::default()
        };

        let nl = NetlistAnalysis::new(&device);
        assert_eq!(nl.buffer_base_address("b"), Some(0x44));
    }

    #[test]
    fn test_unknown_buffer() {
        let nl = NetlistAnalysis::new(&Device::default());
        assert_eq!(nl.buffer_base_address("missing"), None);
    }
}
