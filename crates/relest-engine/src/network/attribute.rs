//! Tree-shaped models of one relation's attributes.

use std::fmt;

use hashbrown::HashSet;
use indexmap::IndexMap;
use relest_common::types::{Relation, Value};
use relest_common::utils::error::{Error, Result};
use relest_core::statistics::{ConditionalDistribution, Distribution, Histogram, Probability};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::structure;
use crate::config::{BucketConfig, Config, StructureConfig};

/// Equality conditions of a query, keyed by attribute name.
pub type Conditions = IndexMap<String, Value>;

/// One attribute of an [`AttributeNetwork`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeNode {
    name: String,
    parent: Option<usize>,
    children: SmallVec<[usize; 4]>,
    dist: Option<Distribution>,
}

impl AttributeNode {
    fn new(name: String, parent: Option<usize>) -> Self {
        Self {
            name,
            parent,
            children: SmallVec::new(),
            dist: None,
        }
    }

    /// Attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fitted distribution, if parameters have been fitted.
    #[must_use]
    pub fn distribution(&self) -> Option<&Distribution> {
        self.dist.as_ref()
    }
}

/// A directed tree over the attributes of a relation.
///
/// The root carries a histogram of its attribute, every other node a
/// distribution conditioned on its parent. Nodes live in an arena and refer
/// to each other by index; the arena is kept in depth-first preorder, so the
/// root is always at index 0.
///
/// Networks are built once by [`fit`](Self::fit) and never mutated by
/// queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeNetwork {
    nodes: Vec<AttributeNode>,
    index: IndexMap<String, usize>,
}

impl AttributeNetwork {
    /// Creates an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an unfitted network from its root and `(parent, child)` edges.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownAttribute`] if an edge hangs off an attribute that
    ///   is not (yet) in the tree
    /// - [`Error::InvalidValue`] if an attribute is given a second parent
    pub fn from_edges<S: AsRef<str>>(root: &str, edges: &[(S, S)]) -> Result<Self> {
        let mut network = Self::new();
        network.push(root.to_string(), None)?;
        for (parent, child) in edges {
            let parent = network.position(parent.as_ref())?;
            network.push(child.as_ref().to_string(), Some(parent))?;
        }
        Ok(network.into_preorder())
    }

    /// Learns the tree shape of `relation` with the Chow-Liu algorithm.
    ///
    /// Unique-valued and foreign key columns are not modelled. The first
    /// remaining column becomes the root. Large relations are sampled down
    /// to `config.max_rows` rows and nulls are handled per
    /// `config.null_policy`. The result has no distributions yet.
    #[must_use]
    pub fn learn_structure(relation: &Relation, config: &StructureConfig) -> Self {
        let columns = structure::prepare(relation, config);
        let Some((root, _)) = columns.first() else {
            return Self::new();
        };

        let values: Vec<Vec<Value>> = columns.iter().map(|(_, v)| v.clone()).collect();
        let edges = structure::chow_liu(&values);

        let mut network = Self::new();
        network.nodes.push(AttributeNode::new(root.clone(), None));
        network.index.insert(root.clone(), 0);
        for (parent, child) in edges {
            let (parent, child) = (&columns[parent].0, &columns[child].0);
            tracing::debug!(relation = relation.name(), %parent, %child, "learned edge");
            // Discovery order is preorder, so the parent is already placed
            if let Some(&at) = network.index.get(parent.as_str()) {
                let idx = network.nodes.len();
                network.nodes.push(AttributeNode::new(child.clone(), Some(at)));
                network.nodes[at].children.push(idx);
                network.index.insert(child.clone(), idx);
            }
        }
        network
    }

    /// Fits one distribution per node, walking the tree from the root.
    ///
    /// The root gets a histogram over its column using `(on_m, on_n)`; every
    /// other node a conditional distribution of its column given its
    /// parent's. Nulls are kept as [`Value::Null`]. Fitting an empty network
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownAttribute`] if a node has no column in `relation`
    /// - any fitting error of the underlying histograms
    pub fn fit_parameters(mut self, relation: &Relation, buckets: &BucketConfig) -> Result<Self> {
        for idx in 0..self.nodes.len() {
            let own = column(relation, &self.nodes[idx].name)?;
            let dist = match self.nodes[idx].parent {
                None => Histogram::new(buckets.on_m, buckets.on_n).fit(own)?.into(),
                Some(parent) => {
                    let by = column(relation, &self.nodes[parent].name)?;
                    ConditionalDistribution::new(buckets.by_m, buckets.by_n, buckets.on_m, buckets.on_n)
                        .fit(by, own)?
                        .into()
                }
            };
            self.nodes[idx].dist = Some(dist);
        }
        Ok(self)
    }

    /// Learns the structure of `relation` and fits its parameters.
    ///
    /// # Errors
    ///
    /// See [`fit_parameters`](Self::fit_parameters).
    pub fn fit(relation: &Relation, config: &Config) -> Result<Self> {
        Self::learn_structure(relation, &config.structure).fit_parameters(relation, &config.buckets)
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the network models no attribute.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns true if `name` is one of the network's attributes.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Root attribute.
    #[must_use]
    pub fn root(&self) -> Option<&str> {
        self.nodes.first().map(AttributeNode::name)
    }

    /// Attribute names in depth-first preorder.
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(AttributeNode::name)
    }

    /// Nodes in depth-first preorder.
    #[must_use]
    pub fn nodes(&self) -> &[AttributeNode] {
        &self.nodes
    }

    /// Returns a node by attribute name.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&AttributeNode> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    /// Parent of `name`; `None` for the root and for unknown attributes.
    #[must_use]
    pub fn parent(&self, name: &str) -> Option<&str> {
        let node = self.node(name)?;
        node.parent.map(|p| self.nodes[p].name())
    }

    /// Children of `name`, in insertion order.
    pub fn children(&self, name: &str) -> impl Iterator<Item = &str> {
        self.node(name)
            .into_iter()
            .flat_map(|node| node.children.iter().map(|&c| self.nodes[c].name()))
    }

    /// `(parent, child)` edges in depth-first preorder of the child.
    #[must_use]
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.nodes
            .iter()
            .filter_map(|node| node.parent.map(|p| (self.nodes[p].name(), node.name())))
            .collect()
    }

    /// Distribution of `name`, if fitted.
    #[must_use]
    pub fn distribution(&self, name: &str) -> Option<&Distribution> {
        self.node(name).and_then(AttributeNode::distribution)
    }

    /// Returns the smallest sub-tree holding the root and every requested
    /// attribute: the union of the root-to-attribute paths.
    ///
    /// Attributes the network does not model are ignored, and requesting
    /// nothing yields an empty network. `self` is left untouched.
    #[must_use]
    pub fn steiner_subtree<S: AsRef<str>>(&self, attributes: &[S]) -> Self {
        let mut keep: HashSet<usize> = HashSet::new();
        for name in attributes {
            let mut cursor = self.index.get(name.as_ref()).copied();
            while let Some(idx) = cursor {
                if !keep.insert(idx) {
                    break;
                }
                cursor = self.nodes[idx].parent;
            }
        }

        let mut subtree = Self::new();
        let mut remap: Vec<Option<usize>> = vec![None; self.nodes.len()];
        // Preorder guarantees parents are placed before their children
        for (idx, node) in self.nodes.iter().enumerate() {
            if !keep.contains(&idx) {
                continue;
            }
            let parent = node.parent.and_then(|p| remap[p]);
            let at = subtree.nodes.len();
            let mut copy = AttributeNode::new(node.name.clone(), parent);
            copy.dist.clone_from(&node.dist);
            subtree.nodes.push(copy);
            subtree.index.insert(node.name.clone(), at);
            if let Some(p) = parent {
                subtree.nodes[p].children.push(at);
            }
            remap[idx] = Some(at);
        }
        subtree
    }

    /// Estimates the selectivity of a conjunction of equality conditions.
    ///
    /// The network is first pruned to the attributes the conditions touch,
    /// then evaluated with [`infer`](Self::infer). No conditions select
    /// everything.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownAttribute`] if a condition names an attribute the
    ///   network does not model
    /// - [`Error::NotFitted`] if a needed node has no distribution
    pub fn query(&self, conditions: &Conditions) -> Result<f64> {
        if let Some(unknown) = conditions.keys().find(|k| !self.contains(k)) {
            return Err(Error::UnknownAttribute(unknown.clone()));
        }
        let attributes: Vec<&str> = conditions.keys().map(String::as_str).collect();
        let subtree = self.steiner_subtree(&attributes);
        if subtree.is_empty() {
            return Ok(1.0);
        }
        let selectivity = subtree.infer(conditions)?.to_f64();
        Ok(selectivity.clamp(0.0, 1.0))
    }

    /// Runs belief propagation over the whole network.
    ///
    /// Every node folds its children's messages into its own distribution
    /// before applying its own condition. A conditioned non-root node sends
    /// up `P(condition | parent bucket)`; an unconditioned one sends its
    /// marginal mass per parent bucket. At the root the result is read off
    /// as `p(condition)`, or the total bucket mass without a condition.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyNetwork`] if the network has no attributes
    /// - [`Error::NotFitted`] if a node has no distribution
    /// - [`Error::TypeMismatch`] if the root is conditional or a non-root
    ///   node is not
    pub fn infer(&self, conditions: &Conditions) -> Result<Probability> {
        let root = self.nodes.first().ok_or(Error::EmptyNetwork)?;
        let hist = match &root.dist {
            Some(Distribution::Root(hist)) => hist,
            Some(Distribution::Conditional(_)) => return Err(mismatch("histogram", root)),
            None => return Err(Error::NotFitted(root.name.clone())),
        };

        let mut folded: Option<Histogram> = None;
        for &child in &root.children {
            let message = self.message(child, conditions)?;
            folded = Some(folded.as_ref().unwrap_or(hist).multiply(&message));
        }
        let hist = folded.as_ref().unwrap_or(hist);

        Ok(match conditions.get(&root.name) {
            Some(value) => hist.p(value),
            None => hist.bucket_mass(),
        })
    }

    /// The histogram a non-root node sends to its parent.
    fn message(&self, idx: usize, conditions: &Conditions) -> Result<Histogram> {
        let node = &self.nodes[idx];
        let cpd = match &node.dist {
            Some(Distribution::Conditional(cpd)) => cpd,
            Some(Distribution::Root(_)) => return Err(mismatch("conditional distribution", node)),
            None => return Err(Error::NotFitted(node.name.clone())),
        };

        let mut folded: Option<ConditionalDistribution> = None;
        for &child in &node.children {
            let message = self.message(child, conditions)?;
            folded = Some(folded.as_ref().unwrap_or(cpd).multiply(&message));
        }
        let cpd = folded.as_ref().unwrap_or(cpd);

        Ok(match conditions.get(&node.name) {
            Some(value) => cpd.p_by(value),
            None => cpd.marginalize(),
        })
    }

    /// Returns a copy with every attribute renamed by `rename`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if two attributes end up with the
    /// same name.
    pub fn rename<F: FnMut(&str) -> String>(&self, mut rename: F) -> Result<Self> {
        let mut renamed = self.clone();
        renamed.index.clear();
        for (idx, node) in renamed.nodes.iter_mut().enumerate() {
            node.name = rename(&node.name);
            if renamed.index.insert(node.name.clone(), idx).is_some() {
                return Err(duplicate(&node.name));
            }
        }
        Ok(renamed)
    }

    /// Returns a copy with `"{prefix}."` prepended to every attribute.
    #[must_use]
    pub fn with_prefix(&self, prefix: &str) -> Self {
        let mut renamed = self.clone();
        renamed.index.clear();
        for (idx, node) in renamed.nodes.iter_mut().enumerate() {
            node.name = format!("{prefix}.{}", node.name);
            renamed.index.insert(node.name.clone(), idx);
        }
        renamed
    }

    /// Hangs the root's children of `other` (with their sub-trees and
    /// distributions) under the node of `self` named like `other`'s root.
    ///
    /// Returns `Ok(false)` and leaves `self` unchanged if there is no such
    /// node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if a grafted attribute already exists
    /// in `self`.
    pub fn graft(&mut self, other: &AttributeNetwork) -> Result<bool> {
        let Some(other_root) = other.root() else {
            return Ok(false);
        };
        let Some(&anchor) = self.index.get(other_root) else {
            return Ok(false);
        };
        if let Some(clash) = other.attributes().skip(1).find(|name| self.contains(name)) {
            return Err(duplicate(clash));
        }

        let mut remap: Vec<usize> = vec![anchor; other.nodes.len()];
        for (idx, node) in other.nodes.iter().enumerate().skip(1) {
            let parent = node.parent.map_or(anchor, |p| remap[p]);
            let at = self.nodes.len();
            let mut copy = AttributeNode::new(node.name.clone(), Some(parent));
            copy.dist.clone_from(&node.dist);
            self.nodes.push(copy);
            self.nodes[parent].children.push(at);
            self.index.insert(node.name.clone(), at);
            remap[idx] = at;
        }
        *self = std::mem::take(self).into_preorder();
        Ok(true)
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownAttribute(name.to_string()))
    }

    fn push(&mut self, name: String, parent: Option<usize>) -> Result<usize> {
        if self.contains(&name) {
            return Err(duplicate(&name));
        }
        let at = self.nodes.len();
        if let Some(p) = parent {
            self.nodes[p].children.push(at);
        }
        self.index.insert(name.clone(), at);
        self.nodes.push(AttributeNode::new(name, parent));
        Ok(at)
    }

    /// Reorders the arena into depth-first preorder from index 0.
    fn into_preorder(self) -> Self {
        let Self { mut nodes, .. } = self;
        if nodes.is_empty() {
            return Self::new();
        }

        let mut order = Vec::with_capacity(nodes.len());
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            order.push(idx);
            stack.extend(nodes[idx].children.iter().rev().copied());
        }

        let mut remap = vec![0usize; nodes.len()];
        for (new, &old) in order.iter().enumerate() {
            remap[old] = new;
        }

        let mut slots: Vec<Option<AttributeNode>> = nodes.drain(..).map(Some).collect();
        let mut network = Self::new();
        for (new, &old) in order.iter().enumerate() {
            if let Some(mut node) = slots[old].take() {
                node.parent = node.parent.map(|p| remap[p]);
                for child in &mut node.children {
                    *child = remap[*child];
                }
                network.index.insert(node.name.clone(), new);
                network.nodes.push(node);
            }
        }
        network
    }
}

fn column<'a>(relation: &'a Relation, name: &str) -> Result<&'a [Value]> {
    relation
        .column(name)
        .ok_or_else(|| Error::UnknownAttribute(format!("{}.{name}", relation.name())))
}

fn mismatch(expected: &str, node: &AttributeNode) -> Error {
    Error::TypeMismatch {
        expected: expected.to_string(),
        found: node
            .dist
            .as_ref()
            .map_or("nothing", Distribution::kind)
            .to_string(),
    }
}

fn duplicate(name: &str) -> Error {
    Error::InvalidValue(format!("attribute '{name}' appears twice in the network"))
}

impl fmt::Display for AttributeNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn walk(
            network: &AttributeNetwork,
            idx: usize,
            prefix: &str,
            last: bool,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            let node = &network.nodes[idx];
            let (branch, indent) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
            writeln!(f, "{prefix}{branch}{}", node.name)?;
            let prefix = format!("{prefix}{indent}");
            for (i, &child) in node.children.iter().enumerate() {
                walk(network, child, &prefix, i + 1 == node.children.len(), f)?;
            }
            Ok(())
        }

        let Some(root) = self.nodes.first() else {
            return writeln!(f, "(empty)");
        };
        writeln!(f, "{}", root.name)?;
        for (i, &child) in root.children.iter().enumerate() {
            walk(self, child, "", i + 1 == root.children.len(), f)?;
        }
        Ok(())
    }
}
