//! AIRBIN image assembly.
//!
//! The configuration passes record every register and memory write into a
//! [`WriteStore`]. Once translation is complete, the store is grouped into
//! contiguous [`Section`]s and emitted as an ELF64 image whose sections
//! carry raw device addresses.

pub mod elf;
pub mod section;
pub mod store;

pub use elf::write_airbin;
pub use section::SectionKind;
pub use store::{Section, WriteStore};
