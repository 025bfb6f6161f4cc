//! Tile reset and core executable loading.
//!
//! Every tile named by the device gets its configuration registers (and,
//! for compute tiles, its memories) reset to zero in the image, so the
//! loader starts from a known state. Compute tiles with a core then get
//! the loadable segments of the core's ELF copied into program and data
//! memory. Locks and hardware resets are the runtime's responsibility,
//! not the image's.

use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};
use goblin::elf::program_header::{PF_X, PT_LOAD};
use goblin::elf::Elf;
use memmap2::Mmap;
use thiserror::Error;

use crate::airbin::WriteStore;
use crate::device::regs::{
    reg_dma_addr_a_bd, reg_dma_mm2s_ctrl, reg_dma_s2mm_ctrl, reg_shim_dma_bd, DATA_MEM_OFFSET,
    DATA_MEM_SIZE, DMA_BD_COUNT, DMA_MM2S_CHANNEL_COUNT, DMA_S2MM_CHANNEL_COUNT,
    ME_SSM_BLOCK_SIZE, ME_SSS_CFG_BLOCK_SIZE, ME_SSS_CFG_SLOT_COUNT, PROG_MEM_OFFSET,
    PROG_MEM_SIZE, REG_DMA_BD_BLOCK_SIZE, REG_DMA_MM2S_BLOCK_SIZE, REG_DMA_S2MM_BLOCK_SIZE,
    REG_SHIM_DMA_BD_SIZE, REG_SSM_CFG_0, REG_SSS_CFG_0, REG_SSS_CFG_SLOT_0, SHIM_DMA_BD_COUNT,
    SHIM_SSM_BLOCK_SIZE, SHIM_SSS_CFG_BLOCK_SIZE, SHIM_SSS_CFG_SLOT_COUNT,
    SSS_CFG_SLOT_BLOCK_SIZE,
};
use crate::device::{Address, TileAddress};
use crate::ir::{Device, TileDef};

/// Why a core executable could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: goblin::error::Error,
    },
    #[error("{}: core executables must be 32-bit little-endian ELF", path.display())]
    WrongFormat { path: PathBuf },
}

/// Write the initial configuration for every tile of the device.
pub(crate) fn configure_cores(device: &Device, store: &mut WriteStore) {
    log::debug!("configuring cores");

    for tile in &device.tiles {
        log::debug!("tile <{},{}>", tile.col, tile.row);
        if tile.is_shim() {
            config_shim_tile(tile, store);
        } else {
            config_compute_tile(tile, store);
        }
    }
}

fn config_shim_tile(tile: &TileDef, store: &mut WriteStore) {
    assert!(tile.is_shim(), "tile {},{} is not a shim", tile.col, tile.row);
    let addr = TileAddress::new(tile.col, tile.row);

    if tile.is_shim_noc() {
        store.clear_range(
            addr,
            reg_shim_dma_bd(0),
            REG_SHIM_DMA_BD_SIZE * SHIM_DMA_BD_COUNT,
        );
    }
    store.clear_range(addr, REG_SSM_CFG_0, SHIM_SSM_BLOCK_SIZE);
    store.clear_range(addr, REG_SSS_CFG_0, SHIM_SSS_CFG_BLOCK_SIZE);
    store.clear_range(
        addr,
        REG_SSS_CFG_SLOT_0,
        SSS_CFG_SLOT_BLOCK_SIZE * SHIM_SSS_CFG_SLOT_COUNT,
    );
}

fn config_compute_tile(tile: &TileDef, store: &mut WriteStore) {
    let addr = TileAddress::new(tile.col, tile.row);

    store.clear_range(addr, PROG_MEM_OFFSET, PROG_MEM_SIZE);
    store.clear_range(addr, DATA_MEM_OFFSET, DATA_MEM_SIZE);

    store.clear_range(
        addr,
        reg_dma_addr_a_bd(0),
        DMA_BD_COUNT * REG_DMA_BD_BLOCK_SIZE,
    );
    store.clear_range(
        addr,
        reg_dma_s2mm_ctrl(0),
        DMA_S2MM_CHANNEL_COUNT * REG_DMA_S2MM_BLOCK_SIZE,
    );
    store.clear_range(
        addr,
        reg_dma_mm2s_ctrl(0),
        DMA_MM2S_CHANNEL_COUNT * REG_DMA_MM2S_BLOCK_SIZE,
    );

    store.clear_range(addr, REG_SSM_CFG_0, ME_SSM_BLOCK_SIZE);
    store.clear_range(addr, REG_SSS_CFG_0, ME_SSS_CFG_BLOCK_SIZE);
    store.clear_range(
        addr,
        REG_SSS_CFG_SLOT_0,
        SSS_CFG_SLOT_BLOCK_SIZE * ME_SSS_CFG_SLOT_COUNT,
    );

    // Copy in the loadable parts of the core executable, if any. A missing
    // file leaves the tile's memories cleared and the translation running.
    if let Some(core) = &tile.core {
        let file_name = core
            .elf_file
            .clone()
            .unwrap_or_else(|| format!("core_{}_{}.elf", tile.col, tile.row));

        if let Err(err) = load_core_elf(addr, Path::new(&file_name), store) {
            log::error!("error loading {file_name}: {err}");
        }
    }
}

/// Read a core executable and record its loadable segments as writes.
///
/// Executable segments land in program memory at their virtual address;
/// everything else wraps into data memory. Segment tails past the file
/// image (`p_memsz > p_filesz`) stay zero from the preceding memory clear.
pub fn load_core_elf(
    tile: TileAddress,
    path: &Path,
    store: &mut WriteStore,
) -> Result<(), LoadError> {
    log::debug!("reading core ELF {} for tile {}", path.display(), tile);

    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_owned(),
        source,
    })?;
    let map = unsafe { Mmap::map(&file) }.map_err(|source| LoadError::Open {
        path: path.to_owned(),
        source,
    })?;

    let elf = Elf::parse(&map).map_err(|source| LoadError::Parse {
        path: path.to_owned(),
        source,
    })?;
    if elf.is_64 || !elf.little_endian {
        return Err(LoadError::WrongFormat {
            path: path.to_owned(),
        });
    }

    for phdr in &elf.program_headers {
        if phdr.p_type != PT_LOAD {
            continue;
        }

        let mut dest = if phdr.p_flags & PF_X != 0 {
            PROG_MEM_OFFSET + phdr.p_vaddr as u32
        } else {
            DATA_MEM_OFFSET + (phdr.p_vaddr as u32 & (DATA_MEM_SIZE - 1))
        };
        log::debug!(
            "segment flags=0x{:X} vaddr=0x{:X} dest=0x{:X}",
            phdr.p_flags,
            phdr.p_vaddr,
            dest
        );

        let start = (phdr.p_offset as usize).min(map.len());
        let end = (start + phdr.p_filesz as usize).min(map.len());
        let mut words = Cursor::new(&map[start..end]);
        while let Ok(word) = words.read_u32::<LittleEndian>() {
            store.write32(Address::new(tile, dest), word);
            dest += 4;
        }
    }

    Ok(())
}
