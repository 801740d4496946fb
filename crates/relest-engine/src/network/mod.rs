//! Per-relation attribute networks.
//!
//! An [`AttributeNetwork`] approximates the joint distribution of a
//! relation's attributes with a tree: the root keeps a histogram, every
//! other attribute a distribution conditioned on its parent. The tree shape
//! comes from a Chow-Liu maximum mutual information spanning tree.

mod attribute;
mod structure;

pub use attribute::{AttributeNetwork, AttributeNode, Conditions};
pub use structure::{MISSING_NUMBER, MISSING_TEXT};
