//! Core type definitions for Relest.
//!
//! - Cell values ([`Value`]), including the null marker used during fitting
//! - The in-memory table abstraction ([`Relation`]) and its [`ForeignKey`]s

mod relation;
mod value;

pub use relation::{ForeignKey, Relation};
pub use value::Value;
