//! # relest-common
//!
//! Foundation layer for Relest: values, relations, and errors.
//!
//! This crate provides the building blocks shared by the statistics and
//! engine crates. It has no internal dependencies and should be kept minimal.
//!
//! ## Modules
//!
//! - [`types`] - Core type definitions ([`Value`], [`Relation`], [`ForeignKey`])
//! - [`utils`] - Utility functions and helpers (errors)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod types;
pub mod utils;

// Re-export commonly used types at crate root
pub use types::{ForeignKey, Relation, Value};
pub use utils::error::{Error, Result};
