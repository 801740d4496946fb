//! Histogram buckets.

use std::fmt;
use std::ops::Add;

use relest_common::types::Value;
use serde::{Deserialize, Serialize};

use super::Probability;

/// A closed value range `[left, right]` with its probability mass.
///
/// `cardinality` is the number of distinct values the bucket stands for:
/// `1` for a most-common-value bucket, more for an equi-height range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Lowest value covered (inclusive).
    pub left: Value,
    /// Highest value covered (inclusive).
    pub right: Value,
    /// Probability mass of the bucket.
    pub frequency: Probability,
    /// Number of distinct values represented.
    pub cardinality: u64,
}

impl Bucket {
    /// Creates a bucket.
    #[must_use]
    pub fn new(left: Value, right: Value, frequency: Probability, cardinality: u64) -> Self {
        Self {
            left,
            right,
            frequency,
            cardinality,
        }
    }

    /// Creates a bucket holding a single value.
    #[must_use]
    pub fn singleton(value: Value, frequency: Probability) -> Self {
        Self::new(value.clone(), value, frequency, 1)
    }

    /// Returns true for single-value (most common value) buckets.
    #[must_use]
    pub fn is_singleton(&self) -> bool {
        self.cardinality == 1
    }

    /// Returns true if `value` lies in `[left, right]`. Nulls never do.
    #[must_use]
    pub fn contains(&self, value: &Value) -> bool {
        !value.is_null() && self.left <= *value && *value <= self.right
    }

    /// Returns true if the bucket shares at least one value with `[left, right]`.
    #[must_use]
    pub fn intersects(&self, left: &Value, right: &Value) -> bool {
        self.right >= *left && self.left <= *right
    }

    /// Mass of one value under the uniform-within-bucket assumption.
    #[must_use]
    pub fn density(&self) -> Probability {
        &self.frequency / self.cardinality.max(1)
    }
}

/// Merges adjacent buckets: `[a, b] + [b, c] = [a, c]`.
impl Add for Bucket {
    type Output = Bucket;

    fn add(self, other: Bucket) -> Bucket {
        Bucket {
            left: self.left.min(other.left),
            right: self.right.max(other.right),
            frequency: self.frequency + other.frequency,
            cardinality: self.cardinality + other.cardinality,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_singleton() {
            write!(f, "{}: {:.5}", self.left, self.frequency)
        } else {
            write!(
                f,
                "[{}, {}]: {:.5} ({})",
                self.left, self.right, self.frequency, self.cardinality
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(s: &str) -> Probability {
        s.parse().unwrap()
    }

    #[test]
    fn test_add() {
        let b1 = Bucket::new("a".into(), "a".into(), p("0.1"), 1);
        let b2 = Bucket::new("b".into(), "c".into(), p("0.2"), 2);
        assert_eq!(b1 + b2, Bucket::new("a".into(), "c".into(), p("0.3"), 3));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Bucket::singleton("a".into(), p("0.42")).to_string(),
            "a: 0.42000"
        );
        assert_eq!(
            Bucket::new("a".into(), "c".into(), p("0.1"), 3).to_string(),
            "[a, c]: 0.10000 (3)"
        );
    }

    #[test]
    fn test_contains_excludes_null() {
        let bucket = Bucket::new(Value::from(1i64), Value::from(4i64), p("0.5"), 4);
        assert!(bucket.contains(&Value::from(1i64)));
        assert!(bucket.contains(&Value::from(2.5)));
        assert!(bucket.contains(&Value::from(4i64)));
        assert!(!bucket.contains(&Value::from(5i64)));
        assert!(!bucket.contains(&Value::Null));
    }

    #[test]
    fn test_density() {
        let bucket = Bucket::new(Value::from(3i64), Value::from(4i64), p("2/7"), 2);
        assert_eq!(bucket.density(), p("1/7"));
    }

    fn bucket_strategy() -> impl Strategy<Value = Bucket> {
        (0i64..100, 0i64..10, 0u64..1000, 1u64..20).prop_map(|(left, width, mass, card)| {
            Bucket::new(
                Value::from(left),
                Value::from(left + width),
                Probability::from_ratio(mass, 1000),
                card,
            )
        })
    }

    proptest! {
        #[test]
        fn prop_add_is_commutative(a in bucket_strategy(), b in bucket_strategy()) {
            prop_assert_eq!(a.clone() + b.clone(), b + a);
        }

        #[test]
        fn prop_add_is_associative(
            a in bucket_strategy(),
            b in bucket_strategy(),
            c in bucket_strategy(),
        ) {
            prop_assert_eq!(
                (a.clone() + b.clone()) + c.clone(),
                a + (b + c)
            );
        }
    }
}
