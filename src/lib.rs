//! airbin-gen library
//!
//! Back-end translator for AMD AI Engine arrays: consumes an in-memory
//! description of a device configuration (tiles, DMA programs, stream
//! switches, loaded core executables) and emits an AIRBIN, an ELF64 image
//! of raw register and memory writes that a runtime loader maps directly
//! onto hardware.
//!
//! # Module Organization
//!
//! - [`ir`]: Input view of the device (tiles, DMA programs, switchboxes)
//! - [`device`]: Tile address space, register map, and bitfield encoding
//! - [`translate`]: Configuration passes that turn the IR into writes
//! - [`airbin`]: Write store, section grouping, and the ELF64 emitter

pub mod airbin;
pub mod device;
pub mod ir;
pub mod translate;
