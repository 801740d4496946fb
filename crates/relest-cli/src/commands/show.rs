//! Model inspection command.

use std::path::Path;

use anyhow::{Result, anyhow};
use comfy_table::Cell;
use relest_engine::AttributeNetwork;
use serde::Serialize;

use super::ModelFile;
use crate::OutputFormat;
use crate::output::{self, Format};

/// One attribute of a fitted network.
#[derive(Serialize)]
struct AttributeOutput {
    name: String,
    parent: Option<String>,
    kind: Option<&'static str>,
    buckets: usize,
}

/// One fitted network.
#[derive(Serialize)]
struct NetworkOutput {
    relation: String,
    extensions: Vec<String>,
    attributes: Vec<AttributeOutput>,
}

fn describe(relation: &str, network: &AttributeNetwork, extensions: &[String]) -> NetworkOutput {
    NetworkOutput {
        relation: relation.to_string(),
        extensions: extensions.to_vec(),
        attributes: network
            .nodes()
            .iter()
            .map(|node| AttributeOutput {
                name: node.name().to_string(),
                parent: network.parent(node.name()).map(str::to_string),
                kind: node.distribution().map(|d| d.kind()),
                buckets: node.distribution().map_or(0, |d| d.len()),
            })
            .collect(),
    }
}

/// Run the show command.
pub fn run(
    model_path: &Path,
    relation: Option<&str>,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let model = ModelFile::load(model_path)?;
    let schema = &model.schema;

    let selected: Vec<(&String, &AttributeNetwork)> = match relation {
        Some(name) => {
            let (key, network) = schema
                .networks()
                .get_key_value(name)
                .ok_or_else(|| anyhow!("relation {name} is not in the model"))?;
            vec![(key, network)]
        }
        None => schema.networks().iter().collect(),
    };

    match Format::from(format) {
        Format::Json => {
            let output: Vec<NetworkOutput> = selected
                .iter()
                .map(|(name, network)| describe(name, network, schema.extensions(name)))
                .collect();
            output::print_json(&output, quiet)?;
        }
        Format::Table => {
            if quiet {
                return Ok(());
            }
            output::print_key_value_table(
                &[
                    ("Relations", schema.networks().len().to_string()),
                    ("Passes", schema.passes().to_string()),
                    (
                        "Buckets (m/n)",
                        format!("{}/{}", model.config.buckets.by_m, model.config.buckets.by_n),
                    ),
                    ("Max rows", model.config.structure.max_rows.to_string()),
                ],
                quiet,
            );
            for (name, network) in selected {
                println!();
                println!("{name}");
                print!("{network}");
                let described = describe(name, network, schema.extensions(name));
                if !described.extensions.is_empty() {
                    println!("extended by: {}", described.extensions.join(", "));
                }

                let mut table = output::create_table();
                output::add_header(&mut table, &["Attribute", "Parent", "Kind", "Buckets"]);
                for attribute in &described.attributes {
                    table.add_row(vec![
                        Cell::new(&attribute.name),
                        Cell::new(attribute.parent.as_deref().unwrap_or("-")),
                        Cell::new(attribute.kind.unwrap_or("unfitted")),
                        Cell::new(attribute.buckets),
                    ]);
                }
                println!("{table}");
            }
        }
    }

    Ok(())
}
