// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ordered set of node names.
//!
//! [`NodeSet`] is the currency of every impact computation in the controller:
//! budgets resolve their workload to a `NodeSet`, disruptions resolve to a
//! `NodeSet`, and admission decisions reduce to intersections between the two.
//!
//! Node names are used verbatim. No trimming or case folding is performed, so
//! callers must supply the canonical `metadata.name` of the node.
//!
//! # Example
//!
//! ```rust
//! use ndc::node_set::NodeSet;
//!
//! let watched = NodeSet::from_string_list(&["node-a".to_string(), "node-b".to_string()]);
//! let drained: NodeSet = ["node-b".to_string()].into_iter().collect();
//!
//! assert!(watched.intersects(&drained));
//! assert_eq!(watched.union(&drained).len(), 2);
//! ```

use std::collections::BTreeSet;
use std::fmt;

/// A set of node names with deterministic (sorted) iteration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeSet {
    nodes: BTreeSet<String>,
}

impl NodeSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from a list of node names, collapsing duplicates.
    #[must_use]
    pub fn from_string_list(names: &[String]) -> Self {
        names.iter().cloned().collect()
    }

    /// Serialize the set to a sorted list of node names.
    ///
    /// The ordering is stable so that persisting the list into a status
    /// subresource never produces a spurious diff.
    #[must_use]
    pub fn to_string_list(&self) -> Vec<String> {
        self.nodes.iter().cloned().collect()
    }

    /// Insert a node name. Returns `true` if the name was not present.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.nodes.insert(name.into())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains(name)
    }

    /// Number of distinct node names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All names present in either set.
    #[must_use]
    pub fn union(&self, other: &NodeSet) -> NodeSet {
        NodeSet {
            nodes: self.nodes.union(&other.nodes).cloned().collect(),
        }
    }

    /// Names present in both sets.
    #[must_use]
    pub fn intersection(&self, other: &NodeSet) -> NodeSet {
        NodeSet {
            nodes: self.nodes.intersection(&other.nodes).cloned().collect(),
        }
    }

    /// `true` when the two sets share at least one node.
    #[must_use]
    pub fn intersects(&self, other: &NodeSet) -> bool {
        !self.nodes.is_disjoint(&other.nodes)
    }

    /// Iterate over node names in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }
}

impl FromIterator<String> for NodeSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        NodeSet {
            nodes: iter.into_iter().collect(),
        }
    }
}

impl Extend<String> for NodeSet {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.nodes.extend(iter);
    }
}

impl IntoIterator for NodeSet {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

impl<'a> IntoIterator for &'a NodeSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl fmt::Display for NodeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (index, name) in self.nodes.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
#[path = "node_set_tests.rs"]
mod node_set_tests;
