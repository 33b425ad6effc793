// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Node disruptions and how they count against budgets.
//!
//! A [`Disruption`] is the resolved form of a `NodeDisruption`: the set of nodes
//! it takes down. Resolving a `NodeDisruption` is delegated to a
//! [`DisruptionResolver`] so that the admission side and the budget side agree on
//! what a disruption impacts.
//!
//! [`DisruptionAggregator`] counts, for a given set of watched nodes, how many
//! granted disruptions currently overlap it.

use crate::crd::{NodeDisruption, NodeDisruptionState};
use crate::errors::Result;
use crate::node_set::NodeSet;
use crate::selector::{label_selector_as_selector, FieldSelector};
use crate::store::ClusterStore;
use async_trait::async_trait;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::debug;

/// A node disruption resolved to the nodes it impacts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Disruption {
    /// Name of the `NodeDisruption` this was resolved from
    pub name: String,
    /// Nodes taken down by the disruption
    pub impacted_nodes: NodeSet,
}

/// Resolves a `NodeDisruption` into the nodes it impacts.
#[async_trait]
pub trait DisruptionResolver: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the disruption's selector is invalid or the nodes
    /// cannot be listed.
    async fn get_disruption(&self, node_disruption: &NodeDisruption) -> Result<Disruption>;
}

/// Resolves disruptions by listing the nodes matching `spec.nodeSelector`.
///
/// An empty node selector impacts no node.
#[derive(Clone)]
pub struct NodeSelectorResolver {
    store: Arc<dyn ClusterStore>,
}

impl NodeSelectorResolver {
    #[must_use]
    pub fn new(store: Arc<dyn ClusterStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DisruptionResolver for NodeSelectorResolver {
    async fn get_disruption(&self, node_disruption: &NodeDisruption) -> Result<Disruption> {
        let name = node_disruption.name_any();
        let selector = label_selector_as_selector(&node_disruption.spec.node_selector)?;
        if selector.is_empty() {
            return Ok(Disruption {
                name,
                impacted_nodes: NodeSet::new(),
            });
        }

        let nodes = self
            .store
            .list_nodes(&selector, &FieldSelector::everything())
            .await?;

        Ok(Disruption {
            name,
            impacted_nodes: nodes
                .into_iter()
                .filter_map(|node| node.metadata.name)
                .filter(|node_name| !node_name.is_empty())
                .collect(),
        })
    }
}

/// Counts the granted disruptions overlapping a set of nodes.
pub struct DisruptionAggregator<'a> {
    store: &'a dyn ClusterStore,
    resolver: &'a dyn DisruptionResolver,
}

impl<'a> DisruptionAggregator<'a> {
    #[must_use]
    pub fn new(store: &'a dyn ClusterStore, resolver: &'a dyn DisruptionResolver) -> Self {
        Self { store, resolver }
    }

    /// Number of `granted` node disruptions whose impacted nodes intersect `nodes`.
    ///
    /// Pending and rejected disruptions are not counted. Each disruption counts
    /// once regardless of how many of the nodes it takes down.
    ///
    /// # Errors
    ///
    /// Returns the first listing or resolution error; no partial count is returned.
    pub async fn resolve_disruption(&self, nodes: &NodeSet) -> Result<i32> {
        let node_disruptions = self.store.list_node_disruptions().await?;
        let mut current = 0;

        for node_disruption in node_disruptions
            .iter()
            .filter(|nd| nd.state() == NodeDisruptionState::Granted)
        {
            let disruption = self.resolver.get_disruption(node_disruption).await?;
            if disruption.impacted_nodes.intersects(nodes) {
                debug!(
                    disruption = %disruption.name,
                    impacted_nodes = %disruption.impacted_nodes,
                    "Granted disruption overlaps watched nodes"
                );
                current += 1;
            }
        }

        Ok(current)
    }
}

#[cfg(test)]
#[path = "disruption_tests.rs"]
mod disruption_tests;
