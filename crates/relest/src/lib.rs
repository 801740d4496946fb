//! # Relest
//!
//! Learned selectivity estimation for relational queries.
//!
//! Relest fits a small statistical model per relation and answers "what
//! fraction of rows match these conditions?" without touching the data
//! again. Start with [`SchemaNetwork`]: fit it on your relations, then ask
//! it for selectivities.
//!
//! ## Model
//!
//! | Layer | Type | Role |
//! | ----- | ---- | ---- |
//! | Value ranges | [`Histogram`] | Most common values plus equi-height ranges |
//! | Pairs | [`ConditionalDistribution`] | One histogram per bucket of the parent |
//! | Relation | [`AttributeNetwork`] | Chow-Liu tree queried by belief propagation |
//! | Schema | [`SchemaNetwork`] | Networks spliced along foreign keys |
//!
//! ## Quick Start
//!
//! ```rust
//! use relest::{Conditions, Config, Relation, SchemaNetwork, Value};
//!
//! let people = Relation::new("people")
//!     .with_column("hair", ["blond", "blond", "brown", "brown"])?
//!     .with_column("eyes", ["blue", "blue", "brown", "blue"])?;
//!
//! let schema = SchemaNetwork::fit(&[people], &Config::new())?;
//!
//! let mut conditions = Conditions::new();
//! conditions.insert("hair".to_string(), Value::from("brown"));
//! conditions.insert("eyes".to_string(), Value::from("blue"));
//! let selectivity = schema.query(&["people"], &conditions)?;
//! assert!((selectivity - 0.25).abs() < 1e-9);
//! # Ok::<(), relest::Error>(())
//! ```

// Re-export the model API
pub use relest_engine::{
    AttributeNetwork, AttributeNode, BucketConfig, Conditions, Config, NullPolicy, SchemaNetwork,
    StructureConfig,
};

// Re-export the statistics - useful for inspecting fitted models
pub use relest_core::{Bucket, ConditionalDistribution, Distribution, Histogram, Probability};

// Re-export the input types
pub use relest_common::{Error, ForeignKey, Relation, Result, Value};
