//! Hardware model of the AIE array address space.
//!
//! Everything the translator emits is a 32-bit write to a 64-bit device
//! address. This module owns the pieces that make those writes bit-exact:
//! the tile address encoding, the per-tile register map, and the bitfield
//! helpers used to compose register values.

pub mod addr;
pub mod field;
pub mod regs;

pub use addr::{Address, TileAddress};
pub use field::{Bit, Field};
