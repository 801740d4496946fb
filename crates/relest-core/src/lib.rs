//! # relest-core
//!
//! Core layer for Relest: the statistical building blocks of the
//! selectivity models and the graph algorithms used to learn their shape.
//!
//! This crate depends only on `relest-common`.
//!
//! ## Modules
//!
//! - [`statistics`] - Buckets, histograms, and conditional distributions with
//!   exact probability arithmetic
//! - [`algorithms`] - Mutual information, maximum spanning trees, and tree
//!   orientation

pub mod algorithms;
pub mod statistics;

// Re-export commonly used types
pub use statistics::{Bucket, ConditionalDistribution, Distribution, Histogram, Probability};
