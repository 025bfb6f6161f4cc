//! AIRBIN ELF64 emitter.
//!
//! The container is a plain 64-bit little-endian ELF with no program
//! headers: one `.shstrtab` plus one `SHT_PROGBITS` section per
//! contiguous run of writes. Each PROGBITS section carries the raw device
//! address of its first word in `sh_addr`, so the loader can replay the
//! image with nothing but a memcpy per section.
//!
//! # Layout
//!
//! ```text
//! +--------------------------+
//! | ELF header (64 bytes)    |
//! +--------------------------+
//! | .shstrtab contents       |
//! +--------------------------+
//! | section payloads, packed |
//! +--------------------------+
//! | section header table     |  <- e_shoff, 8-byte aligned
//! +--------------------------+
//! ```

use std::io::{self, Write};
use std::mem;

use byteorder::{LittleEndian, WriteBytesExt};
use zerocopy::byteorder::{LittleEndian as LE, U16, U32, U64};
use zerocopy::{Immutable, IntoBytes};

use super::section::SectionKind;
use super::store::Section;

/// Machine number claimed by AMD AIR platforms.
pub const EM_AMDAIR: u16 = 225;

const ELFCLASS64: u8 = 2;
const ELFDATA2LSB: u8 = 1;
const ELFOSABI_GNU: u8 = 3;
const EV_CURRENT: u8 = 1;
const ET_NONE: u16 = 0;

const SHT_PROGBITS: u32 = 1;
const SHT_STRTAB: u32 = 3;
const SHF_ALLOC: u64 = 2;

type U16Le = U16<LE>;
type U32Le = U32<LE>;
type U64Le = U64<LE>;

/// ELF64 file header.
#[derive(IntoBytes, Immutable)]
#[repr(C)]
struct Elf64Ehdr {
    e_ident: [u8; 16],
    e_type: U16Le,
    e_machine: U16Le,
    e_version: U32Le,
    e_entry: U64Le,
    e_phoff: U64Le,
    e_shoff: U64Le,
    e_flags: U32Le,
    e_ehsize: U16Le,
    e_phentsize: U16Le,
    e_phnum: U16Le,
    e_shentsize: U16Le,
    e_shnum: U16Le,
    e_shstrndx: U16Le,
}

/// ELF64 section header.
#[derive(IntoBytes, Immutable)]
#[repr(C)]
struct Elf64Shdr {
    sh_name: U32Le,
    sh_type: U32Le,
    sh_flags: U64Le,
    sh_addr: U64Le,
    sh_offset: U64Le,
    sh_size: U64Le,
    sh_link: U32Le,
    sh_info: U32Le,
    sh_addralign: U64Le,
    sh_entsize: U64Le,
}

impl Elf64Shdr {
    /// The mandatory all-zero section at index 0.
    fn null() -> Self {
        Self {
            sh_name: U32Le::ZERO,
            sh_type: U32Le::ZERO,
            sh_flags: U64Le::ZERO,
            sh_addr: U64Le::ZERO,
            sh_offset: U64Le::ZERO,
            sh_size: U64Le::ZERO,
            sh_link: U32Le::ZERO,
            sh_info: U32Le::ZERO,
            sh_addralign: U64Le::ZERO,
            sh_entsize: U64Le::ZERO,
        }
    }
}

/// Section header string table under construction.
///
/// Strings are appended NUL-terminated; `add` returns the offset of the
/// start of the string for use in `sh_name`.
#[derive(Debug, Default)]
struct StringTable {
    data: Vec<u8>,
}

impl StringTable {
    fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, s: &str) -> u32 {
        let offset = self.data.len() as u32;
        self.data.extend_from_slice(s.as_bytes());
        self.data.push(0);
        offset
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Stream an AIRBIN image for the given sections into `out`.
///
/// Section names are classified from each section's base address; all the
/// canonical names are registered in `.shstrtab` up front so the string
/// table is identical regardless of which regions the image touches.
pub fn write_airbin<W: Write>(sections: &[Section], out: &mut W) -> io::Result<()> {
    // Build the string table: NULL string first, then ".shstrtab", then
    // every AIRBIN section name, indexed by kind.
    let mut shstrtab = StringTable::new();
    shstrtab.add("");
    let shstrtab_name = shstrtab.add(".shstrtab");

    let mut name_offset = [0u32; SectionKind::COUNT];
    for kind in &SectionKind::ALL[1..] {
        name_offset[*kind as usize] = shstrtab.add(kind.name());
    }

    // Lay out the file.
    let ehsize = mem::size_of::<Elf64Ehdr>() as u64;
    let shstrtab_offset = ehsize;

    let mut cursor = shstrtab_offset + shstrtab.len() as u64;
    let mut payload_offsets = Vec::with_capacity(sections.len());
    for section in sections {
        payload_offsets.push(cursor);
        cursor += section.len_bytes() as u64;
    }

    let shoff = (cursor + 7) & !7;
    let padding = (shoff - cursor) as usize;
    let shnum = sections.len() as u16 + 2;

    let ehdr = Elf64Ehdr {
        e_ident: [
            0x7F,
            b'E',
            b'L',
            b'F',
            ELFCLASS64,
            ELFDATA2LSB,
            EV_CURRENT,
            ELFOSABI_GNU,
            0,
            0,
            0,
            0,
            0,
            0,
            0,
            0,
        ],
        e_type: U16Le::new(ET_NONE),
        e_machine: U16Le::new(EM_AMDAIR),
        e_version: U32Le::new(EV_CURRENT as u32),
        e_entry: U64Le::ZERO,
        e_phoff: U64Le::ZERO,
        e_shoff: U64Le::new(shoff),
        e_flags: U32Le::ZERO,
        e_ehsize: U16Le::new(ehsize as u16),
        e_phentsize: U16Le::ZERO,
        e_phnum: U16Le::ZERO,
        e_shentsize: U16Le::new(mem::size_of::<Elf64Shdr>() as u16),
        e_shnum: U16Le::new(shnum),
        e_shstrndx: U16Le::new(1),
    };
    out.write_all(ehdr.as_bytes())?;
    out.write_all(shstrtab.as_bytes())?;

    for section in sections {
        for &word in section.data() {
            out.write_u32::<LittleEndian>(word)?;
        }
    }
    out.write_all(&[0u8; 8][..padding])?;

    // Section header table: null entry, .shstrtab, then the payloads.
    out.write_all(Elf64Shdr::null().as_bytes())?;

    let strtab_shdr = Elf64Shdr {
        sh_name: U32Le::new(shstrtab_name),
        sh_type: U32Le::new(SHT_STRTAB),
        sh_offset: U64Le::new(shstrtab_offset),
        sh_size: U64Le::new(shstrtab.len() as u64),
        sh_addralign: U64Le::new(1),
        ..Elf64Shdr::null()
    };
    out.write_all(strtab_shdr.as_bytes())?;

    for (section, &offset) in sections.iter().zip(&payload_offsets) {
        let kind = SectionKind::from_address(section.address());
        let shdr = Elf64Shdr {
            sh_name: U32Le::new(name_offset[kind as usize]),
            sh_type: U32Le::new(SHT_PROGBITS),
            sh_flags: U64Le::new(SHF_ALLOC),
            sh_addr: U64Le::new(section.address()),
            sh_offset: U64Le::new(offset),
            sh_size: U64Le::new(section.len_bytes() as u64),
            sh_addralign: U64Le::new(1),
            ..Elf64Shdr::null()
        };
        out.write_all(shdr.as_bytes())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airbin::WriteStore;
    use crate::device::{Address, TileAddress};

    fn sample_sections() -> Vec<Section> {
        let mut store = WriteStore::new();
        let tile = TileAddress::new(1, 1);
        store.write32(Address::new(tile, 0x20000), 0xDEADBEEF);
        store.write32(Address::new(tile, 0x20004), 0xCAFEBABE);
        store.write32(Address::new(tile, 0x3F000), 0x80000007);
        store.group_sections()
    }

    #[test]
    fn test_header_sizes() {
        assert_eq!(mem::size_of::<Elf64Ehdr>(), 64);
        assert_eq!(mem::size_of::<Elf64Shdr>(), 64);
    }

    #[test]
    fn test_string_table_offsets() {
        let mut tab = StringTable::new();
        assert_eq!(tab.add(""), 0);
        assert_eq!(tab.add(".shstrtab"), 1);
        assert_eq!(tab.add(".ssmast"), 11);
        assert_eq!(tab.len(), 19);
        assert_eq!(&tab.as_bytes()[..2], &[0, b'.']);
    }

    #[test]
    fn test_emitted_image_parses_back() {
        let sections = sample_sections();
        let mut image = Vec::new();
        write_airbin(&sections, &mut image).unwrap();

        let elf = goblin::elf::Elf::parse(&image).unwrap();
        assert!(elf.is_64);
        assert!(elf.little_endian);
        assert_eq!(elf.header.e_machine, EM_AMDAIR);
        assert_eq!(elf.header.e_type, ET_NONE);
        assert_eq!(elf.header.e_phnum, 0);

        // Null section + .shstrtab + two payload sections.
        assert_eq!(elf.section_headers.len(), 4);

        let progbits: Vec<_> = elf
            .section_headers
            .iter()
            .filter(|sh| sh.sh_type == SHT_PROGBITS)
            .collect();
        assert_eq!(progbits.len(), 2);

        let tile = TileAddress::new(1, 1);
        assert_eq!(progbits[0].sh_addr, tile.full_address(0x20000));
        assert_eq!(progbits[0].sh_size, 8);
        assert_eq!(
            elf.shdr_strtab.get_at(progbits[0].sh_name),
            Some(".prgm.mem")
        );
        assert_eq!(progbits[1].sh_addr, tile.full_address(0x3F000));
        assert_eq!(elf.shdr_strtab.get_at(progbits[1].sh_name), Some(".ssmast"));

        // Payload bytes are the little-endian words.
        let off = progbits[0].sh_offset as usize;
        assert_eq!(&image[off..off + 4], &0xDEADBEEFu32.to_le_bytes());
        assert_eq!(&image[off + 4..off + 8], &0xCAFEBABEu32.to_le_bytes());
    }

    #[test]
    fn test_emission_is_deterministic() {
        let sections = sample_sections();
        let mut a = Vec::new();
        let mut b = Vec::new();
        write_airbin(&sections, &mut a).unwrap();
        write_airbin(&sections, &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_image() {
        let mut image = Vec::new();
        write_airbin(&[], &mut image).unwrap();

        let elf = goblin::elf::Elf::parse(&image).unwrap();
        assert_eq!(elf.section_headers.len(), 2);
    }
}
