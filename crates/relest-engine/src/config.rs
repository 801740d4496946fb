//! Model configuration.

use serde::{Deserialize, Serialize};

/// How nulls are treated while scoring attribute correlations.
///
/// Parameter fitting always keeps nulls as [`Value::Null`] and accounts for
/// them in `null_frac`; this policy only affects structure learning.
///
/// [`Value::Null`]: relest_common::types::Value::Null
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullPolicy {
    /// Replace nulls with `"MISSING"` in text columns and `-1` elsewhere.
    #[default]
    Sentinel,
    /// Keep nulls as a category of their own.
    Marker,
}

/// Bucket counts for the histograms of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Most-common-value buckets for the conditioning (parent) attribute.
    pub by_m: usize,
    /// Range buckets for the conditioning (parent) attribute.
    pub by_n: usize,
    /// Most-common-value buckets for the dependent attribute and the root.
    pub on_m: usize,
    /// Range buckets for the dependent attribute and the root.
    pub on_n: usize,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            by_m: 30,
            by_n: 30,
            on_m: 30,
            on_n: 30,
        }
    }
}

impl BucketConfig {
    /// Uses the same `(m, n)` pair for every role.
    #[must_use]
    pub fn uniform(m: usize, n: usize) -> Self {
        Self {
            by_m: m,
            by_n: n,
            on_m: m,
            on_n: n,
        }
    }
}

/// Settings for learning the tree shape of an attribute network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureConfig {
    /// Relations with more rows are sampled down to this many before
    /// correlations are scored.
    pub max_rows: usize,
    /// Seed of the row sampler.
    pub seed: u64,
    /// Null treatment while scoring correlations.
    pub null_policy: NullPolicy,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            max_rows: 30_000,
            seed: 0,
            null_policy: NullPolicy::default(),
        }
    }
}

/// Configuration for fitting networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Histogram bucket counts.
    pub buckets: BucketConfig,
    /// Structure learning settings.
    pub structure: StructureConfig,
    /// Whether relations that become ready together are fitted on the
    /// rayon thread pool.
    pub parallel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buckets: BucketConfig::default(),
            structure: StructureConfig::default(),
            parallel: true,
        }
    }
}

impl Config {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the histogram bucket counts.
    #[must_use]
    pub fn with_buckets(mut self, buckets: BucketConfig) -> Self {
        self.buckets = buckets;
        self
    }

    /// Sets the sampling row cap for structure learning.
    #[must_use]
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.structure.max_rows = max_rows;
        self
    }

    /// Sets the sampling seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.structure.seed = seed;
        self
    }

    /// Sets the null treatment for structure learning.
    #[must_use]
    pub fn with_null_policy(mut self, policy: NullPolicy) -> Self {
        self.structure.null_policy = policy;
        self
    }

    /// Fits relations one at a time.
    #[must_use]
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}
