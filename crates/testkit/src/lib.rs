#![warn(missing_docs)]
//! Deterministic testing surfaces (event stream + yield accounting).

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use vineyard_core::{ItemKind, SimTick};

/// Primary event record captured by headless tests.
#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    /// Simulation tick when the event occurred.
    pub tick: SimTick,
    /// Human-readable kind label.
    pub kind: &'a str,
    /// Free-form payload for smoke tests.
    pub payload: &'a str,
}

/// A sink that writes newline-delimited JSON to disk.
pub struct JsonlSink {
    file: File,
}

impl JsonlSink {
    /// Create a new sink at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self { file })
    }

    /// Append an event to the log.
    pub fn write(&mut self, event: &EventRecord<'_>) -> Result<()> {
        let line = serde_json::to_string(event)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        Ok(())
    }
}

/// Running tally of harvested produce for a headless run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestLedger {
    /// Total red grape bunches granted.
    pub red_bunches: u64,
    /// Total white grape bunches granted.
    pub white_bunches: u64,
    /// Number of harvest interactions recorded.
    pub harvests: u64,
}

impl HarvestLedger {
    /// Fold one granted stack into the tally.
    pub fn record(&mut self, kind: ItemKind, count: u32) {
        match kind {
            ItemKind::RedGrapeBunch => self.red_bunches += u64::from(count),
            ItemKind::WhiteGrapeBunch => self.white_bunches += u64::from(count),
            ItemKind::BoneMeal => {}
        }
        self.harvests += 1;
    }

    /// Total bunches across both families.
    pub fn total_bunches(&self) -> u64 {
        self.red_bunches + self.white_bunches
    }
}
