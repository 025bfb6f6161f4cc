//! Input view of the device configuration.
//!
//! The translator consumes one [`Device`]: a grid of tiles plus the
//! per-tile DMA programs, stream switchbox settings, and shim mux
//! connections that describe the desired hardware state. The types here
//! are plain data with serde derives, so a description can be built in
//! code or loaded from JSON.
//!
//! Op payloads are tagged variants ([`DmaOp`], [`SwitchOp`]) rather than
//! trait objects; the configuration passes discriminate on the tag and
//! ignore kinds they do not handle.

pub mod netlist;

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub use netlist::NetlistAnalysis;

/// A logical stream endpoint bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireBundle {
    Core,
    Dma,
    Fifo,
    South,
    West,
    North,
    East,
    Plio,
    Noc,
    Trace,
}

/// A bundle plus an index within it: one logical port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRef {
    pub bundle: WireBundle,
    pub index: u8,
}

/// What kind of tile sits at a grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    /// Compute tile with a core, program memory, and tile DMA
    Compute,
    /// Boundary tile interfacing the PL
    Shim,
    /// Boundary tile with a NOC-facing DMA
    ShimNoc,
}

/// A core loaded onto a compute tile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreDef {
    /// Executable to load; defaults to `core_<col>_<row>.elf`
    #[serde(default)]
    pub elf_file: Option<String>,
}

/// One tile of the array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileDef {
    pub col: u8,
    pub row: u8,
    pub kind: TileKind,
    #[serde(default)]
    pub core: Option<CoreDef>,
}

impl TileDef {
    pub fn is_shim(&self) -> bool {
        matches!(self.kind, TileKind::Shim | TileKind::ShimNoc)
    }

    pub fn is_shim_noc(&self) -> bool {
        self.kind == TileKind::ShimNoc
    }
}

/// A buffer allocated in a tile's data memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferDef {
    pub name: String,
    pub col: u8,
    pub row: u8,
    pub size_bytes: u32,
    /// Bit width of the buffer's element type
    pub element_bits: u32,
    /// Pinned base address; unpinned buffers are placed by netlist analysis
    #[serde(default)]
    pub address: Option<u64>,
}

/// Which side of an A/B descriptor pair a BD op configures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BdSide {
    A,
    B,
}

/// Acquire or release a lock around a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockAction {
    Acquire,
    Release,
}

/// DMA transfer direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DmaDirection {
    S2mm,
    Mm2s,
}

/// One op inside a DMA basic block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DmaOp {
    /// Configure one side of the block's buffer descriptor
    Bd {
        side: BdSide,
        buffer: String,
        /// Transfer length in elements
        len: u32,
        /// Offset into the buffer, in bytes
        offset: u32,
    },
    /// Acquire or release a lock for the duration of the block
    UseLock {
        lock: u32,
        action: LockAction,
        value: u32,
    },
    /// Attach a packet header to the transfer
    Packet { packet_type: u8, packet_id: u8 },
    /// Start a channel at the BD of the destination block
    Start {
        direction: DmaDirection,
        channel: u8,
        /// Index of the block whose BD the channel starts on
        dest: usize,
    },
}

/// A basic block of a tile's DMA program.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DmaBlock {
    pub ops: Vec<DmaOp>,
    /// Successor block index; BD chains have at most one successor
    #[serde(default)]
    pub next: Option<usize>,
}

/// The DMA program of one compute tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemOp {
    pub col: u8,
    pub row: u8,
    pub blocks: Vec<DmaBlock>,
}

/// An arbiter + mselect pair selecting a master-side routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amsel {
    pub arbiter: u8,
    pub msel: u8,
}

/// One packet rule: match `(id & mask) == value` and route via the amsel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketRule {
    pub value: u8,
    pub mask: u8,
    pub amsel: Amsel,
}

/// One op inside a switchbox region.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchOp {
    /// Circuit-switched connection from a slave port to a master port
    Connect { source: PortRef, dest: PortRef },
    /// Packet-switched master configuration from a set of amsels
    MasterSet { dest: PortRef, amsels: Vec<Amsel> },
    /// Packet-switched slave rules for one source port
    PacketRules {
        source: PortRef,
        rules: Vec<PacketRule>,
    },
}

/// The stream switch configuration of one tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Switchbox {
    pub col: u8,
    pub row: u8,
    #[serde(default)]
    pub ops: Vec<SwitchOp>,
}

/// A connection through a shim tile's stream mux/demux.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShimConnect {
    pub source: PortRef,
    pub dest: PortRef,
}

/// The mux/demux configuration of one shim tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShimMux {
    pub col: u8,
    pub row: u8,
    #[serde(default)]
    pub connects: Vec<ShimConnect>,
}

/// A complete device configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Device {
    pub tiles: Vec<TileDef>,
    #[serde(default)]
    pub buffers: Vec<BufferDef>,
    #[serde(default)]
    pub mems: Vec<MemOp>,
    #[serde(default)]
    pub switchboxes: Vec<Switchbox>,
    #[serde(default)]
    pub shim_muxes: Vec<ShimMux>,
}

impl Device {
    /// Load a device description from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("cannot parse {}", path.display()))
    }

    /// Look up a buffer definition by name.
    pub fn buffer(&self, name: &str) -> Option<&BufferDef> {
        self.buffers.iter().find(|b| b.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_predicates() {
        let shim = TileDef {
            col: 2,
            row: 0,
            kind: TileKind::Shim,
            core: None,
        };
        assert!(shim.is_shim());
        assert!(!shim.is_shim_noc());

        let noc = TileDef {
            kind: TileKind::ShimNoc,
            ..shim.clone()
        };
        assert!(noc.is_shim());
        assert!(noc.is_shim_noc());

        let compute = TileDef {
            row: 1,
            kind: TileKind::Compute,
            ..shim
        };
        assert!(!compute.is_shim());
    }

    #[test]
    fn test_device_from_json() {
        let json = r#"{
            "tiles": [
                {"col": 1, "row": 0, "kind": "shim_noc"},
                {"col": 1, "row": 1, "kind": "compute", "core": {}}
            ],
            "buffers": [
                {"name": "buf0", "col": 1, "row": 1,
                 "size_bytes": 256, "element_bits": 32}
            ],
            "mems": [
                {"col": 1, "row": 1, "blocks": [
                    {"ops": [
                        {"bd": {"side": "a", "buffer": "buf0",
                                "len": 64, "offset": 0}},
                        {"use_lock": {"lock": 0, "action": "acquire",
                                      "value": 1}}
                    ]}
                ]}
            ],
            "switchboxes": [
                {"col": 1, "row": 1, "ops": [
                    {"connect": {"source": {"bundle": "south", "index": 0},
                                 "dest": {"bundle": "north", "index": 0}}}
                ]}
            ]
        }"#;

        let device: Device = serde_json::from_str(json).unwrap();
        assert_eq!(device.tiles.len(), 2);
        assert!(device.tiles[0].is_shim_noc());
        assert!(device.tiles[1].core.is_some());
        assert_eq!(device.buffer("buf0").unwrap().element_bits, 32);
        assert_eq!(device.mems[0].blocks[0].ops.len(), 2);

        match &device.switchboxes[0].ops[0] {
            SwitchOp::Connect { source, dest } => {
                assert_eq!(source.bundle, WireBundle::South);
                assert_eq!(dest.bundle, WireBundle::North);
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn test_device_round_trips_through_json() {
        let device = Device {
            tiles: vec![TileDef {
                col: 3,
                row: 2,
                kind: TileKind::Compute,
                core: Some(CoreDef {
                    elf_file: Some("core_3_2.elf".into()),
                }),
            }],
            ..Device::default()
        };

        let text = serde_json::to_string(&device).unwrap();
        let back: Device = serde_json::from_str(&text).unwrap();
        assert_eq!(back.tiles.len(), 1);
        assert_eq!(back.tiles[0].core.as_ref().unwrap().elf_file.as_deref(), Some("core_3_2.elf"));
    }
}
