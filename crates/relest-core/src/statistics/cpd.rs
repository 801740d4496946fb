//! Conditional distributions `P(on | by)`.

use std::fmt;
use std::ops::{Index, Mul};

use relest_common::types::Value;
use relest_common::utils::error::{Error, Result};
use serde::{Deserialize, Serialize};

use super::{Histogram, Probability};

/// A conditional distribution of a dependent attribute (`on`) given an
/// independent one (`by`).
///
/// The `by` attribute is summarised by a histogram; each of its buckets owns
/// a histogram of the `on` values observed alongside it. Rows where `by` is
/// null feed a separate `on_null_hist`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalDistribution {
    by_m: usize,
    by_n: usize,
    on_m: usize,
    on_n: usize,
    by_hist: Histogram,
    on_hists: Vec<Histogram>,
    on_null_hist: Histogram,
}

impl ConditionalDistribution {
    /// Creates an unfitted distribution with the bucket counts to use for
    /// the `by` and `on` histograms.
    #[must_use]
    pub fn new(by_m: usize, by_n: usize, on_m: usize, on_n: usize) -> Self {
        Self {
            by_m,
            by_n,
            on_m,
            on_n,
            by_hist: Histogram::new(by_m, by_n),
            on_hists: Vec::new(),
            on_null_hist: Histogram::new(on_m, on_n),
        }
    }

    /// Assembles a distribution from already built histograms.
    ///
    /// Bucket counts are inferred from the histograms themselves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] if there is not exactly one `on`
    /// histogram per bucket of `by_hist`.
    pub fn from_parts(
        by_hist: Histogram,
        on_hists: Vec<Histogram>,
        on_null_hist: Option<Histogram>,
    ) -> Result<Self> {
        if on_hists.len() != by_hist.len() {
            return Err(Error::LengthMismatch {
                expected: by_hist.len(),
                found: on_hists.len(),
            });
        }
        let (on_m, on_n) = on_hists.first().map_or((0, 0), |h| (h.m(), h.n()));
        Ok(Self {
            by_m: by_hist.m(),
            by_n: by_hist.n(),
            on_m,
            on_n,
            by_hist,
            on_hists,
            on_null_hist: on_null_hist.unwrap_or_else(|| Histogram::new(on_m, on_n)),
        })
    }

    /// Fits the distribution to aligned observations: `on[i]` was seen
    /// together with `by[i]`.
    ///
    /// Pairs are assigned to `by` buckets with one ascending sweep over the
    /// `by` values; null `by` values go to the null group wherever they
    /// fall. Each group then gets its own histogram over its `on` values.
    ///
    /// # Errors
    ///
    /// - [`Error::LengthMismatch`] if `by` and `on` differ in length
    /// - [`Error::EmptyInput`] if there are no observations
    /// - [`Error::InvalidHistogramParams`] if a `by` bucket receives no pairs
    pub fn fit(mut self, by: &[Value], on: &[Value]) -> Result<Self> {
        if by.len() != on.len() {
            return Err(Error::LengthMismatch {
                expected: by.len(),
                found: on.len(),
            });
        }

        let by_hist = Histogram::new(self.by_m, self.by_n).fit(by)?;
        let buckets = by_hist.buckets();

        let mut order: Vec<usize> = (0..by.len()).collect();
        order.sort_by(|&a, &b| by[a].cmp(&by[b]));

        let mut groups: Vec<Vec<Value>> = vec![Vec::new(); buckets.len()];
        let mut null_group = Vec::new();
        let mut cursor = 0;
        for i in order {
            let (by_value, on_value) = (&by[i], &on[i]);
            if by_value.is_null() {
                null_group.push(on_value.clone());
                continue;
            }
            while cursor < buckets.len() && buckets[cursor].right < *by_value {
                cursor += 1;
            }
            // Values outside every bucket only occur without range buckets
            if buckets.get(cursor).is_some_and(|b| b.left <= *by_value) {
                groups[cursor].push(on_value.clone());
            }
        }

        if let Some(bucket) = groups.iter().position(Vec::is_empty) {
            return Err(Error::InvalidHistogramParams { bucket });
        }

        self.on_hists = groups
            .iter()
            .map(|group| Histogram::new(self.on_m, self.on_n).fit(group))
            .collect::<Result<_>>()?;
        self.on_null_hist = if null_group.is_empty() {
            Histogram::new(self.on_m, self.on_n)
        } else {
            Histogram::new(self.on_m, self.on_n).fit(&null_group)?
        };
        self.by_hist = by_hist;
        Ok(self)
    }

    /// The histogram of the conditioning attribute.
    #[must_use]
    pub fn by_hist(&self) -> &Histogram {
        &self.by_hist
    }

    /// One histogram of the dependent attribute per `by` bucket.
    #[must_use]
    pub fn on_hists(&self) -> &[Histogram] {
        &self.on_hists
    }

    /// Histogram of the dependent attribute where `by` is null.
    #[must_use]
    pub fn on_null_hist(&self) -> &Histogram {
        &self.on_null_hist
    }

    /// Number of conditioning buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.on_hists.len()
    }

    /// Returns true if the distribution has no conditioning buckets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.on_hists.is_empty()
    }

    /// Returns `P(on | by)`.
    ///
    /// A null `by` reads from the null branch; a `by` outside the
    /// conditioning histogram yields zero.
    #[must_use]
    pub fn p(&self, by: &Value, on: &Value) -> Probability {
        if by.is_null() {
            return self.on_null_hist.p(on);
        }
        self.by_hist
            .find_bucket(by)
            .and_then(|(i, _)| self.on_hists.get(i))
            .map_or_else(Probability::zero, |hist| hist.p(on))
    }

    /// Fixes the dependent attribute to `on` and returns, over the `by`
    /// buckets, the probability of observing it.
    ///
    /// The result has `by_hist`'s boundaries with every bucket reduced to a
    /// point of mass `P(on | bucket)`. This is how evidence on a child is
    /// pushed up to its parent.
    #[must_use]
    pub fn p_by(&self, on: &Value) -> Histogram {
        self.by_hist.reshaped(
            self.on_hists.iter().map(|hist| hist.p(on)),
            self.on_null_hist.p(on),
        )
    }

    /// Sums the dependent attribute out: every `by` bucket becomes a point
    /// whose mass is the total bucket mass of its `on` histogram.
    #[must_use]
    pub fn marginalize(&self) -> Histogram {
        self.by_hist.reshaped(
            self.on_hists.iter().map(Histogram::bucket_mass),
            self.on_null_hist.bucket_mass(),
        )
    }

    /// Reweights every `on` histogram (including the null branch) by `hist`.
    ///
    /// `by_hist` is left untouched.
    #[must_use]
    pub fn multiply(&self, hist: &Histogram) -> ConditionalDistribution {
        ConditionalDistribution {
            on_hists: self.on_hists.iter().map(|h| h.multiply(hist)).collect(),
            on_null_hist: self.on_null_hist.multiply(hist),
            by_hist: self.by_hist.clone(),
            ..*self
        }
    }
}

impl Index<usize> for ConditionalDistribution {
    type Output = Histogram;

    fn index(&self, index: usize) -> &Histogram {
        &self.on_hists[index]
    }
}

impl Mul<&Histogram> for &ConditionalDistribution {
    type Output = ConditionalDistribution;

    fn mul(self, rhs: &Histogram) -> ConditionalDistribution {
        self.multiply(rhs)
    }
}

impl fmt::Display for ConditionalDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sections: Vec<String> = self
            .by_hist
            .buckets()
            .iter()
            .zip(&self.on_hists)
            .map(|(by, on)| format!("~~ {by} ~~\n{on}"))
            .collect();
        write!(f, "{}", sections.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::Bucket;

    fn p(s: &str) -> Probability {
        s.parse().unwrap()
    }

    fn values<T: Into<Value> + Clone>(items: &[T]) -> Vec<Value> {
        items.iter().cloned().map(Into::into).collect()
    }

    fn points(items: &[(&str, &str)]) -> Histogram {
        Histogram::from_buckets(
            items
                .iter()
                .map(|(value, frequency)| Bucket::singleton((*value).into(), p(frequency)))
                .collect(),
            Probability::zero(),
        )
    }

    #[test]
    fn test_fit() {
        let by = values(&["a", "a", "a", "b", "b", "b"]);
        let on = values(&[1i64, 2, 3, 4, 5, 5]);
        let cpd = ConditionalDistribution::new(2, 0, 3, 0).fit(&by, &on).unwrap();
        assert_eq!(cpd.len(), 2);
        assert_eq!(cpd[0].len(), 3);
        assert_eq!(cpd[1].len(), 2);
        assert!(cpd.on_null_hist().is_empty());
    }

    #[test]
    fn test_p() {
        let by = values(&["b", "b", "b", "c", "c", "c"]);
        let on = values(&[1i64, 2, 3, 4, 5, 5]);
        let cpd = ConditionalDistribution::new(2, 0, 3, 0).fit(&by, &on).unwrap();
        let zero = Probability::zero();
        assert_eq!(cpd.p(&"a".into(), &1i64.into()), zero);
        assert_eq!(cpd.p(&"d".into(), &1i64.into()), zero);
        assert_eq!(cpd.p(&"b".into(), &0i64.into()), zero);
        assert_eq!(cpd.p(&"b".into(), &1i64.into()), p("1/3"));
        assert_eq!(cpd.p(&"b".into(), &2i64.into()), p("1/3"));
        assert_eq!(cpd.p(&"b".into(), &3i64.into()), p("1/3"));
        assert_eq!(cpd.p(&"b".into(), &4i64.into()), zero);
        assert_eq!(cpd.p(&"c".into(), &4i64.into()), p("1/3"));
        assert_eq!(cpd.p(&"c".into(), &5i64.into()), p("2/3"));
    }

    #[test]
    fn test_fit_with_null_by() {
        let by = vec![
            Value::from("a"),
            Value::from("a"),
            Value::from("a"),
            Value::from("b"),
            Value::from("b"),
            Value::from("b"),
            Value::Null,
            Value::Null,
        ];
        let on = values(&[1i64, 2, 3, 4, 5, 5, 1, 2]);
        let cpd = ConditionalDistribution::new(2, 0, 3, 0).fit(&by, &on).unwrap();
        assert_eq!(cpd.len(), 2);
        assert_eq!(cpd[0].len(), 3);
        assert_eq!(cpd[1].len(), 2);
        assert_eq!(cpd.on_null_hist().len(), 2);
        assert_eq!(cpd.p(&Value::Null, &1i64.into()), p("1/2"));
    }

    #[test]
    fn test_fit_with_range_buckets() {
        // by: 1 is the only most common value, 2..=5 fill one range bucket
        let by = values(&[1i64, 1, 1, 2, 3, 4, 5]);
        let on = values(&["x", "x", "y", "z", "z", "z", "w"]);
        let cpd = ConditionalDistribution::new(1, 1, 5, 0).fit(&by, &on).unwrap();
        assert_eq!(cpd.len(), 2);
        assert_eq!(cpd.p(&1i64.into(), &"x".into()), p("2/3"));
        assert_eq!(cpd.p(&4i64.into(), &"z".into()), p("3/4"));
        assert_eq!(cpd.p(&5i64.into(), &"w".into()), p("1/4"));
    }

    #[test]
    fn test_observed_pairs_are_positive() {
        let by = values(&[1i64, 2, 2, 3, 3, 3, 4, 5, 6, 7]);
        let on = values(&["a", "b", "a", "c", "c", "a", "b", "b", "c", "a"]);
        let cpd = ConditionalDistribution::new(2, 2, 2, 2).fit(&by, &on).unwrap();
        for (b, o) in by.iter().zip(&on) {
            assert!(!cpd.p(b, o).is_zero(), "P({o} | {b}) should be positive");
        }
    }

    #[test]
    fn test_fit_length_mismatch() {
        let err = ConditionalDistribution::new(1, 1, 1, 1)
            .fit(&values(&[1i64, 2]), &values(&[1i64]))
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
    fn test_fit_empty() {
        let err = ConditionalDistribution::new(1, 1, 1, 1)
            .fit(&[], &[])
            .unwrap_err();
        assert_eq!(err, Error::EmptyInput);
    }

    #[test]
    fn test_p_by() {
        let by = values(&["a", "a", "b", "b"]);
        let on = values(&[1i64, 2, 2, 2]);
        let cpd = ConditionalDistribution::new(2, 0, 2, 0).fit(&by, &on).unwrap();
        let hist = cpd.p_by(&2i64.into());
        assert_eq!(hist.len(), 2);
        assert_eq!(hist[0], Bucket::singleton("a".into(), p("1/2")));
        assert_eq!(hist[1], Bucket::singleton("b".into(), p("1")));
    }

    #[test]
    fn test_marginalize() {
        let cpd = ConditionalDistribution::from_parts(
            points(&[("a1", "0.5"), ("a2", "0.5")]),
            vec![
                points(&[("b1", "0.1"), ("b2", "0.2")]),
                points(&[("b1", "0.3"), ("b2", "0.3")]),
            ],
            None,
        )
        .unwrap();
        let hist = cpd.marginalize();
        assert_eq!(hist[0].frequency, p("0.3"));
        assert_eq!(hist[1].frequency, p("0.6"));
        assert_eq!(hist[0].cardinality, 1);
    }

    #[test]
    fn test_multiply() {
        let cpd = ConditionalDistribution::from_parts(
            points(&[("a1", "0.1"), ("a2", "0.2"), ("a3", "0.7")]),
            vec![
                points(&[("b1", "0.1"), ("b2", "0.1"), ("b3", "0.8")]),
                points(&[("b1", "0.7"), ("b2", "0.3"), ("b3", "0.0")]),
                points(&[("b1", "0.6"), ("b2", "0.2"), ("b3", "0.2")]),
            ],
            None,
        )
        .unwrap();
        let hist = points(&[("b1", "0.4"), ("b2", "0.8"), ("b3", "0.1")]);

        let expected = ConditionalDistribution::from_parts(
            points(&[("a1", "0.1"), ("a2", "0.2"), ("a3", "0.7")]),
            vec![
                points(&[("b1", "0.04"), ("b2", "0.08"), ("b3", "0.08")]),
                points(&[("b1", "0.28"), ("b2", "0.24"), ("b3", "0.00")]),
                points(&[("b1", "0.24"), ("b2", "0.16"), ("b3", "0.02")]),
            ],
            None,
        )
        .unwrap();

        assert_eq!(&cpd * &hist, expected);
        // The source is a value: multiplying does not modify it
        assert_eq!(cpd[0][0].frequency, p("0.1"));
    }

    #[test]
    fn test_from_parts_rejects_misaligned() {
        let err = ConditionalDistribution::from_parts(
            points(&[("a1", "0.5"), ("a2", "0.5")]),
            vec![points(&[("b1", "1")])],
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            Error::LengthMismatch {
                expected: 2,
                found: 1
            }
        );
    }
}
