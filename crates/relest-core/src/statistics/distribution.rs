//! The distribution attached to a network node.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ConditionalDistribution, Histogram};

/// What a tree node knows about its attribute.
///
/// The root of an attribute network carries a plain histogram, every other
/// node a distribution conditioned on its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    /// Marginal distribution of the root attribute.
    Root(Histogram),
    /// Distribution conditioned on the parent attribute.
    Conditional(ConditionalDistribution),
}

impl Distribution {
    /// Returns `"root"` or `"conditional"`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Root(_) => "root",
            Self::Conditional(_) => "conditional",
        }
    }

    /// Returns the histogram of a root distribution.
    #[must_use]
    pub fn as_histogram(&self) -> Option<&Histogram> {
        match self {
            Self::Root(hist) => Some(hist),
            Self::Conditional(_) => None,
        }
    }

    /// Returns the conditional distribution of a non-root node.
    #[must_use]
    pub fn as_conditional(&self) -> Option<&ConditionalDistribution> {
        match self {
            Self::Root(_) => None,
            Self::Conditional(cpd) => Some(cpd),
        }
    }

    /// Number of top-level buckets (`by` buckets for conditionals).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Root(hist) => hist.len(),
            Self::Conditional(cpd) => cpd.len(),
        }
    }

    /// Returns true if the distribution holds no buckets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Folds a child's message into this distribution.
    ///
    /// Messages are always histograms, so there is no conditional-by-
    /// conditional product to reject.
    #[must_use]
    pub fn multiply(&self, hist: &Histogram) -> Distribution {
        match self {
            Self::Root(own) => Self::Root(own.multiply(hist)),
            Self::Conditional(cpd) => Self::Conditional(cpd.multiply(hist)),
        }
    }
}

impl From<Histogram> for Distribution {
    fn from(hist: Histogram) -> Self {
        Self::Root(hist)
    }
}

impl From<ConditionalDistribution> for Distribution {
    fn from(cpd: ConditionalDistribution) -> Self {
        Self::Conditional(cpd)
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root(hist) => fmt::Display::fmt(hist, f),
            Self::Conditional(cpd) => fmt::Display::fmt(cpd, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::{Bucket, Probability};

    fn points(items: &[(&str, &str)]) -> Histogram {
        Histogram::from_buckets(
            items
                .iter()
                .map(|(v, f)| Bucket::singleton((*v).into(), f.parse().unwrap()))
                .collect(),
            Probability::zero(),
        )
    }

    fn conditional() -> Distribution {
        ConditionalDistribution::from_parts(
            points(&[("a", "0.5"), ("b", "0.5")]),
            vec![points(&[("x", "1")]), points(&[("y", "1")])],
            None,
        )
        .unwrap()
        .into()
    }

    #[test]
    fn test_kind() {
        assert_eq!(Distribution::from(points(&[("a", "1")])).kind(), "root");
        assert_eq!(conditional().kind(), "conditional");
        assert!(conditional().as_histogram().is_none());
        assert_eq!(conditional().len(), 2);
    }

    #[test]
    fn test_multiply_root() {
        let root = Distribution::from(points(&[("x", "0.5"), ("y", "0.5")]));
        let product = root.multiply(&points(&[("x", "0.2")]));
        let hist = product.as_histogram().unwrap();
        assert_eq!(hist[0].frequency, "0.1".parse().unwrap());
        assert!(hist[1].frequency.is_zero());
    }

    #[test]
    fn test_multiply_conditional_keeps_kind() {
        let product = conditional().multiply(&points(&[("x", "0.5")]));
        let cpd = product.as_conditional().unwrap();
        assert_eq!(cpd[0][0].frequency, "0.5".parse().unwrap());
        assert!(cpd[1][0].frequency.is_zero());
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_string(&conditional()).unwrap();
        assert!(json.contains("\"kind\":\"conditional\""));
        let back: Distribution = serde_json::from_str(&json).unwrap();
        assert_eq!(back, conditional());
    }
}
