//! Chow-Liu structure learning.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use relest_common::types::{Relation, Value};
use relest_core::algorithms::{WeightedEdge, maximum_spanning_tree, normalized_mutual_info, orient_from};

use crate::config::{NullPolicy, StructureConfig};

/// Stand-in for nulls in text columns under [`NullPolicy::Sentinel`].
pub const MISSING_TEXT: &str = "MISSING";

/// Stand-in for nulls in other columns under [`NullPolicy::Sentinel`].
pub const MISSING_NUMBER: i64 = -1;

/// Returns the columns worth modelling, in relation order.
///
/// Foreign key columns are left to the schema level. Columns with a
/// distinct value per row carry no distribution to speak of.
pub(crate) fn candidate_columns(relation: &Relation) -> Vec<&str> {
    let row_count = relation.row_count();
    relation
        .column_names()
        .filter(|name| {
            !relation
                .foreign_keys()
                .iter()
                .any(|fk| fk.from_column == *name)
        })
        .filter(|name| {
            let unique = relation.distinct_count(name) == row_count;
            if unique {
                tracing::warn!(
                    relation = relation.name(),
                    column = name,
                    "dropping column with unique values"
                );
            }
            !unique
        })
        .collect()
}

/// Picks up to `max_rows` row indices, reproducibly for a given seed.
pub(crate) fn sample_rows(row_count: usize, config: &StructureConfig) -> Option<Vec<usize>> {
    if row_count <= config.max_rows {
        return None;
    }
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut rows = sample(&mut rng, row_count, config.max_rows).into_vec();
    rows.sort_unstable();
    Some(rows)
}

/// Applies the null policy to one column.
pub(crate) fn substitute_nulls(values: &[Value], policy: NullPolicy) -> Vec<Value> {
    match policy {
        NullPolicy::Marker => values.to_vec(),
        NullPolicy::Sentinel => {
            let text = values.iter().any(|v| v.as_str().is_some());
            let stand_in = if text {
                Value::from(MISSING_TEXT)
            } else {
                Value::from(MISSING_NUMBER)
            };
            values
                .iter()
                .map(|v| if v.is_null() { stand_in.clone() } else { v.clone() })
                .collect()
        }
    }
}

/// Learns a Chow-Liu tree over the given columns.
///
/// Every unordered pair is scored by normalized mutual information, the
/// maximum spanning tree is kept and oriented away from the first column.
/// Returns `(parent, child)` index pairs in depth-first discovery order.
pub(crate) fn chow_liu(columns: &[Vec<Value>]) -> Vec<(usize, usize)> {
    let mut edges = Vec::new();
    for a in 0..columns.len() {
        for b in a + 1..columns.len() {
            let weight = normalized_mutual_info(&columns[a], &columns[b]);
            edges.push(WeightedEdge::new(a, b, weight));
        }
    }

    let tree: Vec<(usize, usize)> = maximum_spanning_tree(columns.len(), &edges)
        .into_iter()
        .map(|e| (e.a, e.b))
        .collect();
    orient_from(0, columns.len(), &tree)
}

/// Prepares a relation for structure learning: selects the candidate
/// columns, samples rows, and applies the null policy.
pub(crate) fn prepare(relation: &Relation, config: &StructureConfig) -> Vec<(String, Vec<Value>)> {
    let rows = sample_rows(relation.row_count(), config);
    candidate_columns(relation)
        .into_iter()
        .filter_map(|name| {
            let values = relation.column(name)?;
            let values = match &rows {
                Some(rows) => rows.iter().map(|&i| values[i].clone()).collect(),
                None => values.to_vec(),
            };
            Some((name.to_string(), substitute_nulls(&values, config.null_policy)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_columns() {
        let relation = Relation::new("orders")
            .with_column("id", [1i64, 2, 3])
            .unwrap()
            .with_column("customer_id", [1i64, 1, 2])
            .unwrap()
            .with_column("status", ["open", "open", "closed"])
            .unwrap()
            .with_foreign_key("customer_id", "customer", "id");
        assert_eq!(candidate_columns(&relation), vec!["status"]);
    }

    #[test]
    fn test_sample_rows_is_reproducible() {
        let config = StructureConfig {
            max_rows: 10,
            seed: 42,
            ..StructureConfig::default()
        };
        let first = sample_rows(100, &config).unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(Some(first), sample_rows(100, &config));
        assert!(sample_rows(10, &config).is_none());
    }

    #[test]
    fn test_substitute_nulls() {
        let text = vec![Value::from("a"), Value::Null];
        assert_eq!(
            substitute_nulls(&text, NullPolicy::Sentinel),
            vec![Value::from("a"), Value::from(MISSING_TEXT)]
        );
        let numbers = vec![Value::Null, Value::from(2.5)];
        assert_eq!(
            substitute_nulls(&numbers, NullPolicy::Sentinel),
            vec![Value::from(MISSING_NUMBER), Value::from(2.5)]
        );
        assert_eq!(substitute_nulls(&numbers, NullPolicy::Marker), numbers);
    }

    #[test]
    fn test_chow_liu_links_correlated_columns() {
        let col = |items: &[&str]| items.iter().map(|&s| Value::from(s)).collect::<Vec<_>>();
        // hair follows nationality exactly, eyes is noise
        let columns = vec![
            col(&["se", "se", "us", "us", "fr", "fr"]),
            col(&["blue", "green", "blue", "green", "blue", "green"]),
            col(&["blond", "blond", "brown", "brown", "red", "red"]),
        ];
        let edges = chow_liu(&columns);
        assert_eq!(edges.len(), 2);
        assert!(edges.contains(&(0, 2)));
    }

    #[test]
    fn test_chow_liu_single_column() {
        assert!(chow_liu(&[vec![Value::from(1i64)]]).is_empty());
        assert!(chow_liu(&[]).is_empty());
    }
}
