// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Access to the cluster objects the resolvers read and write.
//!
//! Resolvers never talk to the Kubernetes API directly: they go through the
//! [`ClusterStore`] trait so that budget math can be unit tested against an
//! in-memory store. [`KubeStore`] is the implementation backed by a
//! [`kube::Client`].
//!
//! Every call reads the current state of the cluster; nothing is cached
//! between calls.

pub mod kube_store;
pub mod pagination;

pub use kube_store::KubeStore;

use crate::crd::{ApplicationDisruptionBudget, NodeDisruption};
use crate::errors::StoreError;
use crate::selector::{FieldSelector, Selector};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, PersistentVolume, PersistentVolumeClaim, Pod};

/// Read and write operations on the cluster state needed to resolve budgets.
///
/// Selectors in the `Nothing` state must yield an empty list without error.
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Fetch an `ApplicationDisruptionBudget` by namespace and name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the budget does not exist.
    async fn get_budget(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ApplicationDisruptionBudget, StoreError>;

    /// List pods in `namespace` matching `selector`.
    async fn list_pods(&self, namespace: &str, selector: &Selector)
        -> Result<Vec<Pod>, StoreError>;

    /// List persistent volume claims in `namespace` matching `selector`.
    async fn list_pvcs(
        &self,
        namespace: &str,
        selector: &Selector,
    ) -> Result<Vec<PersistentVolumeClaim>, StoreError>;

    /// Fetch a (cluster-scoped) persistent volume by name.
    async fn get_persistent_volume(&self, name: &str) -> Result<PersistentVolume, StoreError>;

    /// List nodes matching both the label selector and the field selector.
    async fn list_nodes(
        &self,
        labels: &Selector,
        fields: &FieldSelector,
    ) -> Result<Vec<Node>, StoreError>;

    /// List every `NodeDisruption` in the cluster.
    async fn list_node_disruptions(&self) -> Result<Vec<NodeDisruption>, StoreError>;

    /// Persist the status subresource of `budget`.
    ///
    /// The write carries the budget's `resourceVersion`; a stale version is rejected
    /// with [`StoreError::Conflict`]. Returns the budget as stored after the write.
    async fn update_budget_status(
        &self,
        budget: &ApplicationDisruptionBudget,
    ) -> Result<ApplicationDisruptionBudget, StoreError>;
}
