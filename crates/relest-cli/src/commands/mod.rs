//! CLI command implementations.

pub mod estimate;
pub mod fit;
pub mod show;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use relest_engine::{Config, SchemaNetwork};
use serde::{Deserialize, Serialize};

/// A fitted model as stored on disk.
#[derive(Serialize, Deserialize)]
pub struct ModelFile {
    /// Settings the model was fitted with.
    pub config: Config,
    /// The fitted networks.
    pub schema: SchemaNetwork,
}

impl ModelFile {
    /// Reads a model written by `relest fit`.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("reading model from {}", path.display()))
    }

    /// Writes the model as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer(BufWriter::new(file), self)
            .with_context(|| format!("writing model to {}", path.display()))
    }
}
