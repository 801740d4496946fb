//! # relest-engine
//!
//! Selectivity models for Relest: per-relation attribute networks and their
//! composition across foreign keys.
//!
//! ## Modules
//!
//! - [`config`] - Bucket counts, sampling, and null handling
//! - [`network`] - Chow-Liu attribute networks with belief propagation
//! - [`schema`] - Schema networks spliced along foreign keys

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod network;
pub mod schema;

pub use config::{BucketConfig, Config, NullPolicy, StructureConfig};
pub use network::{AttributeNetwork, AttributeNode, Conditions};
pub use schema::SchemaNetwork;
