//! Configuration passes.
//!
//! A [`Translator`] owns the write store for one translation and runs the
//! passes in a fixed order: cores first (resets plus executable loads),
//! then switchboxes, then DMAs. Later passes observe earlier writes
//! through the store, which is how the shim mux pass accumulates its
//! masks. The store is consumed once at the end by the section grouper
//! and the AIRBIN emitter.

pub mod cores;
pub mod dmas;
pub mod switchboxes;

use std::io::Write;

use anyhow::{ensure, Context, Result};

use crate::airbin::{self, WriteStore};
use crate::ir::{Device, NetlistAnalysis};

/// One translation in flight: the device view plus the accumulated writes.
pub struct Translator<'a> {
    device: &'a Device,
    netlist: &'a NetlistAnalysis,
    store: WriteStore,
}

impl<'a> Translator<'a> {
    pub fn new(device: &'a Device, netlist: &'a NetlistAnalysis) -> Self {
        Self {
            device,
            netlist,
            store: WriteStore::new(),
        }
    }

    /// Run all configuration passes.
    pub fn run(&mut self) -> Result<()> {
        cores::configure_cores(self.device, &mut self.store);
        switchboxes::configure_switchboxes(self.device, &mut self.store);
        dmas::configure_dmas(self.device, self.netlist, &mut self.store)?;
        Ok(())
    }

    pub fn store(&self) -> &WriteStore {
        &self.store
    }

    pub fn into_store(self) -> WriteStore {
        self.store
    }
}

/// Translate a device description into an AIRBIN image on `out`.
pub fn translate<W: Write>(device: &Device, out: &mut W) -> Result<()> {
    ensure!(
        !device.tiles.is_empty(),
        "device description contains no tiles"
    );

    let netlist = NetlistAnalysis::new(device);
    let mut translator = Translator::new(device, &netlist);
    translator.run()?;

    let store = translator.into_store();
    let sections = store.group_sections();
    log::info!("{} writes in {} sections", store.len(), sections.len());

    airbin::write_airbin(&sections, out).context("cannot write AIRBIN image")
}
