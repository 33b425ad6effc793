// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resolution of the nodes an application depends on.
//!
//! A budget watches two kinds of nodes:
//!
//! - nodes its pods are scheduled on (`spec.podSelector`)
//! - nodes its persistent volumes are pinned to through node affinity
//!   (`spec.pvcSelector` -> bound PV -> `spec.nodeAffinity.required`)
//!
//! An empty pod selector resolves to no nodes. An empty PVC selector follows
//! the usual label selector semantics and selects every claim of the namespace.

use crate::affinity::node_selector_as_selector;
use crate::crd::{ApplicationDisruptionBudgetSpec, LabelSelector};
use crate::errors::Result;
use crate::node_set::NodeSet;
use crate::selector::label_selector_as_selector;
use crate::store::ClusterStore;
use k8s_openapi::api::core::v1::PersistentVolume;
use kube::ResourceExt;
use tracing::{debug, warn};

/// Computes the set of nodes impacting a budget.
pub struct NodeImpactResolver<'a> {
    store: &'a dyn ClusterStore,
}

impl<'a> NodeImpactResolver<'a> {
    #[must_use]
    pub fn new(store: &'a dyn ClusterStore) -> Self {
        Self { store }
    }

    /// Union of the nodes hosting the selected pods and the nodes backing the
    /// selected volumes.
    ///
    /// # Errors
    ///
    /// Returns the first selector or store error; partial sets are discarded.
    pub async fn resolve_nodes(
        &self,
        namespace: &str,
        spec: &ApplicationDisruptionBudgetSpec,
    ) -> Result<NodeSet> {
        let from_pods = self
            .resolve_from_pod_selector(namespace, &spec.pod_selector)
            .await?;
        let from_volumes = self
            .resolve_from_pvc_selector(namespace, &spec.pvc_selector)
            .await?;

        Ok(from_pods.union(&from_volumes))
    }

    /// Nodes on which the pods selected by `selector` in `namespace` are scheduled.
    ///
    /// Pods that are not scheduled yet (no `spec.nodeName`) are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the selector is invalid or the pods cannot be listed.
    pub async fn resolve_from_pod_selector(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<NodeSet> {
        let selector = label_selector_as_selector(selector)?;
        if selector.is_empty() {
            return Ok(NodeSet::new());
        }

        let pods = self.store.list_pods(namespace, &selector).await?;
        let nodes: NodeSet = pods
            .into_iter()
            .filter_map(|pod| pod.spec.and_then(|spec| spec.node_name))
            .filter(|node_name| !node_name.is_empty())
            .collect();

        debug!(
            namespace = %namespace,
            selector = %selector,
            nodes = %nodes,
            "Resolved nodes from pod selector"
        );
        Ok(nodes)
    }

    /// Nodes allowed by the node affinity of the volumes bound to the claims
    /// selected by `selector` in `namespace`.
    ///
    /// An empty selector selects every claim in `namespace`.
    ///
    /// # Errors
    ///
    /// Returns an error if a selector is invalid, if a claim, volume or node
    /// listing fails, or if a volume's node affinity cannot be translated.
    pub async fn resolve_from_pvc_selector(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<NodeSet> {
        let selector = label_selector_as_selector(selector)?;
        let claims = self.store.list_pvcs(namespace, &selector).await?;
        let mut nodes = NodeSet::new();

        for claim in claims {
            let Some(volume_name) = claim
                .spec
                .as_ref()
                .and_then(|spec| spec.volume_name.as_deref())
                .filter(|name| !name.is_empty())
            else {
                debug!(
                    namespace = %namespace,
                    claim = %claim.name_any(),
                    "Skipping PersistentVolumeClaim not bound to a volume"
                );
                continue;
            };

            let volume = self.store.get_persistent_volume(volume_name).await?;
            nodes.extend(self.resolve_volume_nodes(&volume).await?);
        }

        debug!(
            namespace = %namespace,
            selector = %selector,
            nodes = %nodes,
            "Resolved nodes from PVC selector"
        );
        Ok(nodes)
    }

    async fn resolve_volume_nodes(&self, volume: &PersistentVolume) -> Result<NodeSet> {
        let required = volume
            .spec
            .as_ref()
            .and_then(|spec| spec.node_affinity.as_ref())
            .and_then(|affinity| affinity.required.as_ref());

        if required.is_none() {
            debug!(volume = %volume.name_any(), "PersistentVolume has no required node affinity");
            return Ok(NodeSet::new());
        }

        let (labels, fields) = node_selector_as_selector(required)?;

        if labels.is_empty() && fields.is_empty() {
            warn!(
                volume = %volume.name_any(),
                "PersistentVolume node affinity selects every node, ignoring it"
            );
            return Ok(NodeSet::new());
        }
        if labels.is_nothing() || fields.is_nothing() {
            return Ok(NodeSet::new());
        }

        let nodes = self.store.list_nodes(&labels, &fields).await?;
        Ok(nodes
            .into_iter()
            .filter_map(|node| node.metadata.name)
            .filter(|name| !name.is_empty())
            .collect())
    }
}

#[cfg(test)]
#[path = "node_impact_tests.rs"]
mod node_impact_tests;
