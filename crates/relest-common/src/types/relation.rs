//! In-memory relations.
//!
//! A [`Relation`] is the tabular input the models are fitted on: named,
//! equally long columns plus the foreign keys leaving the relation. Schema
//! introspection and row retrieval live outside Relest; whatever does them
//! hands the result over as a `Relation`.

use std::fmt;

use hashbrown::{HashMap, HashSet};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::Value;
use crate::utils::error::{Error, Result};

/// A foreign key `from_relation.from_column -> to_relation.to_column`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Relation holding the referencing column. Filled in from the owning
    /// relation when left empty.
    #[serde(default)]
    pub from_relation: String,
    /// Referencing column.
    pub from_column: String,
    /// Referenced relation.
    pub to_relation: String,
    /// Referenced column (usually the primary key).
    pub to_column: String,
}

impl ForeignKey {
    /// Creates a new foreign key.
    pub fn new(
        from_relation: impl Into<String>,
        from_column: impl Into<String>,
        to_relation: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        Self {
            from_relation: from_relation.into(),
            from_column: from_column.into(),
            to_relation: to_relation.into(),
            to_column: to_column.into(),
        }
    }
}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.from_relation, self.from_column, self.to_relation, self.to_column
        )
    }
}

/// Serialized shape of a relation, validated on the way in.
#[derive(Deserialize)]
struct RawRelation {
    name: String,
    columns: IndexMap<String, Vec<Value>>,
    #[serde(default)]
    foreign_keys: Vec<ForeignKey>,
}

/// A named table of equally long columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRelation")]
pub struct Relation {
    name: String,
    columns: IndexMap<String, Vec<Value>>,
    foreign_keys: Vec<ForeignKey>,
}

impl TryFrom<RawRelation> for Relation {
    type Error = Error;

    fn try_from(raw: RawRelation) -> Result<Self> {
        let mut relation = Relation::new(raw.name);
        for (name, values) in raw.columns {
            relation = relation.with_column(name, values)?;
        }
        for fk in raw.foreign_keys {
            if !relation.has_column(&fk.from_column) {
                return Err(Error::UnknownAttribute(fk.from_column));
            }
            relation = relation.with_foreign_key(fk.from_column, fk.to_relation, fk.to_column);
        }
        Ok(relation)
    }
}

impl Relation {
    /// Creates an empty relation.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Adds (or replaces) a column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] if the column length differs from
    /// the relation's row count.
    pub fn with_column<V: Into<Value>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self> {
        let name = name.into();
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        let others = self.columns.keys().any(|k| *k != name);
        if others && values.len() != self.row_count() {
            return Err(Error::LengthMismatch {
                expected: self.row_count(),
                found: values.len(),
            });
        }
        self.columns.insert(name, values);
        Ok(self)
    }

    /// Declares a foreign key leaving this relation.
    #[must_use]
    pub fn with_foreign_key(
        mut self,
        from_column: impl Into<String>,
        to_relation: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        let fk = ForeignKey::new(self.name.clone(), from_column, to_relation, to_column);
        self.foreign_keys.push(fk);
        self
    }

    /// Returns the relation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.columns.values().next().map_or(0, Vec::len)
    }

    /// Iterates over column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Returns a column's values.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Returns true if the column exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Returns the foreign keys leaving this relation.
    #[must_use]
    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    /// Returns the number of distinct non-null values in a column.
    #[must_use]
    pub fn distinct_count(&self, name: &str) -> usize {
        self.column(name).map_or(0, |values| {
            values
                .iter()
                .filter(|v| !v.is_null())
                .collect::<HashSet<_>>()
                .len()
        })
    }

    /// Returns a relation holding only the given rows, in the given order.
    ///
    /// Out-of-range indices are skipped.
    #[must_use]
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|(name, values)| {
                let taken = rows.iter().filter_map(|&i| values.get(i).cloned()).collect();
                (name.clone(), taken)
            })
            .collect();
        Self {
            name: self.name.clone(),
            columns,
            foreign_keys: self.foreign_keys.clone(),
        }
    }

    /// Left-joins one column of `other` onto this relation.
    ///
    /// Rows match when `self[on] == other[other_key]`; the joined values of
    /// `other[other_column]` land in a new column named `alias`. Unmatched
    /// rows get a null, and a key matching several rows repeats the row.
    /// Null keys never match.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownAttribute`] if any of the named columns is
    /// missing.
    pub fn left_join_column(
        &self,
        on: &str,
        other: &Relation,
        other_key: &str,
        other_column: &str,
        alias: &str,
    ) -> Result<Self> {
        let keys = self
            .column(on)
            .ok_or_else(|| Error::UnknownAttribute(on.to_string()))?;
        let other_keys = other
            .column(other_key)
            .ok_or_else(|| Error::UnknownAttribute(format!("{}.{other_key}", other.name)))?;
        let other_values = other
            .column(other_column)
            .ok_or_else(|| Error::UnknownAttribute(format!("{}.{other_column}", other.name)))?;

        let mut lookup: HashMap<&Value, Vec<usize>> = HashMap::new();
        for (i, key) in other_keys.iter().enumerate() {
            if !key.is_null() {
                lookup.entry(key).or_default().push(i);
            }
        }

        let mut rows = Vec::with_capacity(keys.len());
        let mut joined = Vec::with_capacity(keys.len());
        for (i, key) in keys.iter().enumerate() {
            match lookup.get(key).filter(|_| !key.is_null()) {
                Some(matches) => {
                    for &j in matches {
                        rows.push(i);
                        joined.push(other_values[j].clone());
                    }
                }
                None => {
                    rows.push(i);
                    joined.push(Value::Null);
                }
            }
        }

        let mut result = self.take_rows(&rows);
        result.columns.insert(alias.to_string(), joined);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customers() -> Relation {
        Relation::new("customer")
            .with_column("id", [1i64, 2, 3])
            .unwrap()
            .with_column("country", ["SE", "FR", "SE"])
            .unwrap()
    }

    #[test]
    fn test_with_column_rejects_ragged() {
        let err = Relation::new("t")
            .with_column("a", [1i64, 2])
            .unwrap()
            .with_column("b", [1i64])
            .unwrap_err();
        assert_eq!(
            err,
            Error::LengthMismatch {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_replacing_only_column_allows_new_length() {
        let rel = Relation::new("t")
            .with_column("a", [1i64, 2])
            .unwrap()
            .with_column("a", [1i64, 2, 3])
            .unwrap();
        assert_eq!(rel.row_count(), 3);
    }

    #[test]
    fn test_distinct_count_ignores_nulls() {
        let rel = Relation::new("t")
            .with_column("a", [Some(1i64), None, Some(1), None])
            .unwrap();
        assert_eq!(rel.distinct_count("a"), 1);
        assert_eq!(rel.distinct_count("missing"), 0);
    }

    #[test]
    fn test_take_rows() {
        let rel = customers().take_rows(&[2, 0, 9]);
        assert_eq!(rel.row_count(), 2);
        assert_eq!(rel.column("id").unwrap(), &[Value::from(3i64), Value::from(1i64)]);
    }

    #[test]
    fn test_left_join_column() {
        let orders = Relation::new("orders")
            .with_column("customer_id", [Some(1i64), Some(3), Some(7), None])
            .unwrap()
            .with_column("amount", [10i64, 20, 30, 40])
            .unwrap()
            .with_foreign_key("customer_id", "customer", "id");

        let joined = orders
            .left_join_column("customer_id", &customers(), "id", "country", "customer.country")
            .unwrap();

        assert_eq!(joined.row_count(), 4);
        assert_eq!(
            joined.column("customer.country").unwrap(),
            &[Value::from("SE"), Value::from("SE"), Value::Null, Value::Null]
        );
        assert_eq!(joined.foreign_keys().len(), 1);
        assert_eq!(joined.name(), "orders");
    }

    #[test]
    fn test_left_join_repeats_on_duplicate_keys() {
        let dims = Relation::new("dim")
            .with_column("k", [1i64, 1])
            .unwrap()
            .with_column("v", ["x", "y"])
            .unwrap();
        let facts = Relation::new("fact").with_column("k", [1i64]).unwrap();
        let joined = facts.left_join_column("k", &dims, "k", "v", "dim.v").unwrap();
        assert_eq!(joined.row_count(), 2);
    }

    #[test]
    fn test_deserialize_fills_from_relation() {
        let json = r#"{
            "name": "orders",
            "columns": {"customer_id": [1, 2], "amount": [5.0, null]},
            "foreign_keys": [{"from_column": "customer_id", "to_relation": "customer", "to_column": "id"}]
        }"#;
        let rel: Relation = serde_json::from_str(json).unwrap();
        assert_eq!(rel.foreign_keys()[0].from_relation, "orders");
        assert_eq!(
            rel.foreign_keys()[0].to_string(),
            "orders.customer_id -> customer.id"
        );
    }

    #[test]
    fn test_deserialize_rejects_ragged_columns() {
        let json = r#"{"name": "t", "columns": {"a": [1, 2], "b": [1]}}"#;
        assert!(serde_json::from_str::<Relation>(json).is_err());
    }
}
