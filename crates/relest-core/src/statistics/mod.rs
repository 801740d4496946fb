//! Distribution statistics for selectivity estimation.
//!
//! This module provides:
//! - [`Probability`]: exact rational probability mass
//! - [`Bucket`]: a point (most common value) or range of values with its mass
//! - [`Histogram`]: most-common-value buckets plus equi-height range buckets
//! - [`ConditionalDistribution`]: one histogram per bucket of a conditioning
//!   histogram, used to capture pairwise correlation
//! - [`Distribution`]: the distribution a tree node owns

mod bucket;
mod cpd;
mod distribution;
mod histogram;
mod probability;

pub use bucket::Bucket;
pub use cpd::ConditionalDistribution;
pub use distribution::Distribution;
pub use histogram::Histogram;
pub use probability::Probability;
