//! Selectivity estimation command.

use std::path::Path;

use anyhow::{Result, bail};
use relest_common::Value;
use relest_engine::Conditions;
use serde::Serialize;

use super::ModelFile;
use crate::OutputFormat;
use crate::output::{self, Format};

/// Estimation result.
#[derive(Serialize)]
struct EstimateOutput {
    relations: Vec<String>,
    conditions: Conditions,
    selectivity: f64,
}

/// Parses `attribute=value` pairs.
///
/// The value is read as JSON first so that `age=42` compares against an
/// integer; anything that is not a JSON scalar is taken as text.
fn parse_conditions(raw: &[String]) -> Result<Conditions> {
    let mut conditions = Conditions::new();
    for pair in raw {
        let Some((attribute, value)) = pair.split_once('=') else {
            bail!("condition {pair:?} is not of the form attribute=value");
        };
        let attribute = attribute.trim();
        if attribute.is_empty() {
            bail!("condition {pair:?} has no attribute");
        }
        let value = serde_json::from_str::<Value>(value.trim())
            .unwrap_or_else(|_| Value::from(value.trim()));
        conditions.insert(attribute.to_string(), value);
    }
    Ok(conditions)
}

/// Run the estimate command.
pub fn run(
    model_path: &Path,
    relations: &[String],
    raw_conditions: &[String],
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let conditions = parse_conditions(raw_conditions)?;
    let model = ModelFile::load(model_path)?;
    let selectivity = model.schema.query(relations, &conditions)?;

    let output = EstimateOutput {
        relations: relations.to_vec(),
        conditions,
        selectivity,
    };

    match Format::from(format) {
        Format::Json => output::print_json(&output, quiet)?,
        Format::Table => {
            let conditions = output
                .conditions
                .iter()
                .map(|(k, v)| format!("{k} = {v}"))
                .collect::<Vec<_>>()
                .join(", ");
            output::print_key_value_table(
                &[
                    ("Relations", output.relations.join(", ")),
                    ("Conditions", conditions),
                    ("Selectivity", format!("{:.6}", output.selectivity)),
                ],
                quiet,
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_parse_scalars() {
        let conditions =
            parse_conditions(&strings(&["age=42", "score=1.5", "vip=true", "note=null"])).unwrap();
        assert_eq!(conditions["age"], Value::from(42i64));
        assert_eq!(conditions["score"], Value::from(1.5));
        assert_eq!(conditions["vip"], Value::from(true));
        assert!(conditions["note"].is_null());
    }

    #[test]
    fn test_parse_text() {
        let conditions =
            parse_conditions(&strings(&["country=FR", "city=\"42\"", "tag=[1]"])).unwrap();
        assert_eq!(conditions["country"], Value::from("FR"));
        assert_eq!(conditions["city"], Value::from("42"));
        assert_eq!(conditions["tag"], Value::from("[1]"));
    }

    #[test]
    fn test_parse_keeps_order_and_splits_once() {
        let conditions = parse_conditions(&strings(&["b=x=y", "a=1"])).unwrap();
        let keys: Vec<&str> = conditions.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(conditions["b"], Value::from("x=y"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_conditions(&strings(&["country"])).is_err());
        assert!(parse_conditions(&strings(&["=FR"])).is_err());
    }
}
