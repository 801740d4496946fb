//! Hybrid histograms: most common values plus equi-height ranges.

use std::fmt;
use std::ops::{Index, Mul};

use indexmap::IndexMap;
use relest_common::types::Value;
use relest_common::utils::error::{Error, Result};
use serde::{Deserialize, Serialize};

use super::{Bucket, Probability};

/// A histogram over one attribute.
///
/// The `m` most common values get a singleton bucket each; the remaining
/// values are packed into equi-height range buckets, nominally at most `n`.
/// Buckets are kept sorted by `left` and never overlap, so lookups are a
/// binary search. A range bucket is never stretched across a most common
/// value, so each most common value falling between the remaining values
/// can split off one extra bucket: `len()` is bounded by `2 * m + n`, not
/// `m + n`. Null observations are not bucketed: their share is `null_frac`.
///
/// Histograms are values: [`multiply`](Self::multiply) and friends return a
/// new histogram and never modify `self`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    m: usize,
    n: usize,
    buckets: Vec<Bucket>,
    null_frac: Probability,
}

impl Histogram {
    /// Creates an empty histogram that will use `m` most-common-value
    /// buckets and up to `n` range buckets once fitted.
    #[must_use]
    pub fn new(m: usize, n: usize) -> Self {
        Self {
            m,
            n,
            buckets: Vec::new(),
            null_frac: Probability::zero(),
        }
    }

    /// Creates a histogram from explicit buckets.
    ///
    /// `m` and `n` are inferred from the bucket cardinalities. Buckets are
    /// taken as given (no sorting or validation), which makes this suitable
    /// for tests and for reloading a stored model.
    #[must_use]
    pub fn from_buckets(buckets: Vec<Bucket>, null_frac: Probability) -> Self {
        let m = buckets.iter().filter(|b| b.is_singleton()).count();
        Self {
            m,
            n: buckets.len() - m,
            buckets,
            null_frac,
        }
    }

    /// Fits the histogram to a sequence of observations.
    ///
    /// Nulls are counted into `null_frac`. The `m` most frequent non-null
    /// values become singleton buckets; among values with equal counts the
    /// one seen first wins. The remaining values are swept in ascending
    /// order and merged into a running bucket until it holds at least
    /// `(total - mcv_count - null_count) / n` observations. A running bucket
    /// is also closed before it would span a most common value, so range
    /// buckets never overlap singleton buckets. With `n == 0` values outside
    /// the most common ones are not represented.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyInput`] if `values` is empty.
    pub fn fit(mut self, values: &[Value]) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::EmptyInput);
        }

        // Insertion order doubles as the tie-break for equal counts
        let mut counts: IndexMap<&Value, u64> = IndexMap::new();
        let mut null_count = 0u64;
        for value in values {
            if value.is_null() {
                null_count += 1;
            } else {
                *counts.entry(value).or_insert(0) += 1;
            }
        }

        let mut by_count: Vec<(&Value, u64)> = counts.into_iter().collect();
        by_count.sort_by(|a, b| b.1.cmp(&a.1));
        let split = self.m.min(by_count.len());
        let (mcvs, rest) = by_count.split_at(split);

        let mut buckets: Vec<Bucket> = mcvs
            .iter()
            .map(|&(value, count)| Bucket::singleton(value.clone(), Probability::from_count(count)))
            .collect();

        if self.n > 0 && !rest.is_empty() {
            let rest_count: u64 = rest.iter().map(|&(_, count)| count).sum();
            let height = Probability::from_count(rest_count) / self.n as u64;

            let mut fences: Vec<&Value> = mcvs.iter().map(|&(value, _)| value).collect();
            fences.sort();
            let mut rest = rest.to_vec();
            rest.sort_by(|a, b| a.0.cmp(b.0));

            let mut fence = 0;
            let mut running: Option<Bucket> = None;
            for (value, count) in rest {
                let mut crossed = false;
                while fence < fences.len() && fences[fence] < value {
                    fence += 1;
                    crossed = true;
                }
                if crossed {
                    buckets.extend(running.take());
                }

                let single = Bucket::singleton(value.clone(), Probability::from_count(count));
                let merged = match running.take() {
                    Some(bucket) => bucket + single,
                    None => single,
                };
                if merged.frequency >= height {
                    buckets.push(merged);
                } else {
                    running = Some(merged);
                }
            }
            buckets.extend(running);
        }

        // Convert counts to probabilities
        let total = values.len() as u64;
        for bucket in &mut buckets {
            bucket.frequency = &bucket.frequency / total;
        }
        self.null_frac = Probability::from_count(null_count) / total;

        buckets.sort_by(|a, b| a.left.cmp(&b.left));
        self.buckets = buckets;
        Ok(self)
    }

    /// Number of most-common-value buckets requested.
    #[must_use]
    pub fn m(&self) -> usize {
        self.m
    }

    /// Number of range buckets requested.
    #[must_use]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Returns the buckets, sorted by `left`.
    #[must_use]
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Share of null observations.
    #[must_use]
    pub fn null_frac(&self) -> &Probability {
        &self.null_frac
    }

    /// Number of buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Returns true if the histogram has no buckets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Sum of all bucket frequencies (excluding `null_frac`).
    #[must_use]
    pub fn bucket_mass(&self) -> Probability {
        self.buckets.iter().map(|b| &b.frequency).sum()
    }

    /// Finds the bucket containing `value` by binary search.
    ///
    /// Returns `None` for nulls, for values outside
    /// `[first.left, last.right]`, and for values falling in a gap between
    /// buckets. Not finding a value is a normal outcome, not an error.
    #[must_use]
    pub fn find_bucket(&self, value: &Value) -> Option<(usize, &Bucket)> {
        if value.is_null() {
            return None;
        }
        let i = self.buckets.partition_point(|b| b.right < *value);
        self.buckets
            .get(i)
            .filter(|b| b.left <= *value)
            .map(|b| (i, b))
    }

    /// Returns every bucket sharing at least one value with `[left, right]`.
    #[must_use]
    pub fn find_buckets(&self, left: &Value, right: &Value) -> Vec<(usize, &Bucket)> {
        self.buckets
            .iter()
            .enumerate()
            .filter(|(_, b)| b.intersects(left, right))
            .collect()
    }

    /// Returns the estimated probability of `value`.
    ///
    /// Nulls get `null_frac`; values outside every bucket get zero; anything
    /// else gets its bucket's mass spread uniformly over the bucket's
    /// distinct values.
    #[must_use]
    pub fn p(&self, value: &Value) -> Probability {
        if value.is_null() {
            return self.null_frac.clone();
        }
        self.find_bucket(value)
            .map_or_else(Probability::zero, |(_, bucket)| bucket.density())
    }

    /// Reweights this histogram's buckets by `other`.
    ///
    /// Bucket boundaries are kept. A singleton bucket is scaled by
    /// `other.p(value)`; a range bucket is scaled by the plain mean of the
    /// frequencies of `other`'s buckets overlapping it (not weighted by
    /// overlap width), or by zero when none overlap. This is an
    /// independence-style approximation rather than an exact joint product.
    ///
    /// `null_frac` is carried over unchanged.
    #[must_use]
    pub fn multiply(&self, other: &Histogram) -> Histogram {
        let mut hist = self.clone();
        for bucket in &mut hist.buckets {
            let weight = if bucket.is_singleton() {
                other.p(&bucket.left)
            } else {
                let overlapping = other.find_buckets(&bucket.left, &bucket.right);
                if overlapping.is_empty() {
                    Probability::zero()
                } else {
                    let total: Probability = overlapping.iter().map(|(_, b)| &b.frequency).sum();
                    total / overlapping.len() as u64
                }
            };
            bucket.frequency *= &weight;
        }
        hist
    }

    /// Returns a histogram with the same boundaries whose buckets carry the
    /// given frequencies as single points (cardinality 1).
    pub(crate) fn reshaped(
        &self,
        frequencies: impl IntoIterator<Item = Probability>,
        null_frac: Probability,
    ) -> Histogram {
        let buckets = self
            .buckets
            .iter()
            .zip(frequencies)
            .map(|(bucket, frequency)| {
                Bucket::new(bucket.left.clone(), bucket.right.clone(), frequency, 1)
            })
            .collect();
        Histogram {
            m: self.m,
            n: self.n,
            buckets,
            null_frac,
        }
    }
}

impl Index<usize> for Histogram {
    type Output = Bucket;

    fn index(&self, index: usize) -> &Bucket {
        &self.buckets[index]
    }
}

impl Mul<&Histogram> for &Histogram {
    type Output = Histogram;

    fn mul(self, rhs: &Histogram) -> Histogram {
        self.multiply(rhs)
    }
}

impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.buckets.iter().map(ToString::to_string).collect();
        write!(f, "{}", lines.join("\n"))?;
        if !self.null_frac.is_zero() {
            write!(f, "\nNone: {:.5}", self.null_frac)?;
        }
        Ok(())
    }
}
