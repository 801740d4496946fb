//! Model fitting command.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use comfy_table::Cell;
use relest_common::types::Relation;
use relest_engine::{BucketConfig, Config, NullPolicy, SchemaNetwork};
use serde::Serialize;

use super::ModelFile;
use crate::OutputFormat;
use crate::output::{self, Format};

/// Fitting settings taken from the command line.
pub struct FitArgs {
    pub m: usize,
    pub n: usize,
    pub max_rows: usize,
    pub seed: u64,
    pub null_policy: NullPolicy,
    pub sequential: bool,
}

impl FitArgs {
    fn config(&self) -> Config {
        let config = Config::new()
            .with_buckets(BucketConfig::uniform(self.m, self.n))
            .with_max_rows(self.max_rows)
            .with_seed(self.seed)
            .with_null_policy(self.null_policy);
        if self.sequential {
            config.sequential()
        } else {
            config
        }
    }
}

/// Summary of one fitted relation.
#[derive(Serialize)]
struct RelationOutput {
    name: String,
    attributes: usize,
    root: Option<String>,
    extensions: Vec<String>,
}

/// Summary of a fit.
#[derive(Serialize)]
struct FitOutput {
    model: String,
    passes: usize,
    elapsed_ms: u128,
    relations: Vec<RelationOutput>,
}

/// Run the fit command.
pub fn run(
    relations_path: &Path,
    model_path: &Path,
    args: &FitArgs,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let file = File::open(relations_path)
        .with_context(|| format!("opening {}", relations_path.display()))?;
    let relations: Vec<Relation> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("reading relations from {}", relations_path.display()))?;

    let config = args.config();
    let started = Instant::now();
    let schema = SchemaNetwork::fit(&relations, &config)?;
    let elapsed_ms = started.elapsed().as_millis();

    let output = FitOutput {
        model: model_path.display().to_string(),
        passes: schema.passes(),
        elapsed_ms,
        relations: schema
            .networks()
            .iter()
            .map(|(name, network)| RelationOutput {
                name: name.clone(),
                attributes: network.len(),
                root: network.root().map(str::to_string),
                extensions: schema.extensions(name).to_vec(),
            })
            .collect(),
    };

    ModelFile { config, schema }.save(model_path)?;

    match Format::from(format) {
        Format::Json => output::print_json(&output, quiet)?,
        Format::Table => {
            if !quiet {
                let mut table = output::create_table();
                output::add_header(&mut table, &["Relation", "Attributes", "Root", "Extensions"]);
                for relation in &output.relations {
                    table.add_row(vec![
                        Cell::new(&relation.name),
                        Cell::new(relation.attributes),
                        Cell::new(relation.root.as_deref().unwrap_or("-")),
                        Cell::new(relation.extensions.join(", ")),
                    ]);
                }
                println!("{table}");
            }
            output::success(
                &format!(
                    "Fitted {} relations in {} passes ({} ms), saved to {}",
                    output.relations.len(),
                    output.passes,
                    output.elapsed_ms,
                    output.model
                ),
                quiet,
            );
        }
    }

    Ok(())
}
