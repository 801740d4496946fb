//! Graph and information-theory algorithms for learning tree structures.
//!
//! The graphs involved have one node per modelled attribute, so everything
//! here favours simple, deterministic implementations over asymptotics.
//!
//! - [`normalized_mutual_info`] scores how strongly two columns correlate
//! - [`maximum_spanning_tree`] keeps the strongest acyclic set of pairings
//! - [`orient_from`] turns the undirected tree into parent/child edges

mod mst;
mod mutual_info;
mod traversal;

pub use mst::{UnionFind, WeightedEdge, maximum_spanning_tree};
pub use mutual_info::normalized_mutual_info;
pub use traversal::orient_from;
