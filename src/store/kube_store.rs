// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! [`ClusterStore`] backed by the Kubernetes API.

use super::pagination::list_all_paginated;
use super::ClusterStore;
use crate::constants::{
    API_GROUP_VERSION, KIND_APPLICATION_DISRUPTION_BUDGET, KIND_NODE, KIND_NODE_DISRUPTION,
    KIND_PERSISTENT_VOLUME, KIND_PERSISTENT_VOLUME_CLAIM, KIND_POD,
};
use crate::crd::{ApplicationDisruptionBudget, NodeDisruption};
use crate::errors::StoreError;
use crate::selector::{FieldSelector, Selector};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, PersistentVolume, PersistentVolumeClaim, Pod};
use kube::api::{ListParams, Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use tracing::debug;

/// Reads and writes cluster state through a `kube::Client`.
///
/// Lists are paginated; selectors are passed to the API server so that only
/// matching objects are transferred.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Build list parameters from selectors, or `None` when either selects nothing.
fn list_params(labels: &Selector, fields: &FieldSelector) -> Option<ListParams> {
    let labels = labels.to_query()?;
    let fields = fields.to_query()?;

    let mut params = ListParams::default();
    if !labels.is_empty() {
        params = params.labels(&labels);
    }
    if !fields.is_empty() {
        params = params.fields(&fields);
    }
    Some(params)
}

#[async_trait]
impl ClusterStore for KubeStore {
    async fn get_budget(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ApplicationDisruptionBudget, StoreError> {
        let api: Api<ApplicationDisruptionBudget> =
            Api::namespaced(self.client.clone(), namespace);
        api.get(name).await.map_err(|e| {
            StoreError::from_kube(
                "get",
                KIND_APPLICATION_DISRUPTION_BUDGET,
                &format!("{namespace}/{name}"),
                e,
            )
        })
    }

    async fn list_pods(
        &self,
        namespace: &str,
        selector: &Selector,
    ) -> Result<Vec<Pod>, StoreError> {
        let Some(params) = list_params(selector, &FieldSelector::everything()) else {
            return Ok(Vec::new());
        };
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        list_all_paginated(&api, params)
            .await
            .map_err(|e| StoreError::from_kube("list", KIND_POD, namespace, e))
    }

    async fn list_pvcs(
        &self,
        namespace: &str,
        selector: &Selector,
    ) -> Result<Vec<PersistentVolumeClaim>, StoreError> {
        let Some(params) = list_params(selector, &FieldSelector::everything()) else {
            return Ok(Vec::new());
        };
        let api: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        list_all_paginated(&api, params)
            .await
            .map_err(|e| StoreError::from_kube("list", KIND_PERSISTENT_VOLUME_CLAIM, namespace, e))
    }

    async fn get_persistent_volume(&self, name: &str) -> Result<PersistentVolume, StoreError> {
        let api: Api<PersistentVolume> = Api::all(self.client.clone());
        api.get(name)
            .await
            .map_err(|e| StoreError::from_kube("get", KIND_PERSISTENT_VOLUME, name, e))
    }

    async fn list_nodes(
        &self,
        labels: &Selector,
        fields: &FieldSelector,
    ) -> Result<Vec<Node>, StoreError> {
        let Some(params) = list_params(labels, fields) else {
            return Ok(Vec::new());
        };
        let api: Api<Node> = Api::all(self.client.clone());
        list_all_paginated(&api, params)
            .await
            .map_err(|e| StoreError::from_kube("list", KIND_NODE, "", e))
    }

    async fn list_node_disruptions(&self) -> Result<Vec<NodeDisruption>, StoreError> {
        let api: Api<NodeDisruption> = Api::all(self.client.clone());
        list_all_paginated(&api, ListParams::default())
            .await
            .map_err(|e| StoreError::from_kube("list", KIND_NODE_DISRUPTION, "", e))
    }

    async fn update_budget_status(
        &self,
        budget: &ApplicationDisruptionBudget,
    ) -> Result<ApplicationDisruptionBudget, StoreError> {
        let name = budget.name_any();
        let Some(namespace) = budget.namespace() else {
            return Err(StoreError::Api {
                verb: "update status",
                kind: KIND_APPLICATION_DISRUPTION_BUDGET.to_string(),
                source: format!("budget {name:?} has no namespace").into(),
            });
        };

        debug!(
            namespace = %namespace,
            budget = %name,
            resource_version = ?budget.resource_version(),
            "Writing ApplicationDisruptionBudget status"
        );

        // resourceVersion in the patch turns the write into a compare-and-swap.
        let patch = json!({
            "apiVersion": API_GROUP_VERSION,
            "kind": KIND_APPLICATION_DISRUPTION_BUDGET,
            "metadata": { "resourceVersion": budget.resource_version() },
            "status": budget.status.clone().unwrap_or_default(),
        });

        let api: Api<ApplicationDisruptionBudget> =
            Api::namespaced(self.client.clone(), &namespace);
        api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| {
                StoreError::from_kube(
                    "update status",
                    KIND_APPLICATION_DISRUPTION_BUDGET,
                    &format!("{namespace}/{name}"),
                    e,
                )
            })
    }
}

#[cfg(test)]
#[path = "kube_store_tests.rs"]
mod kube_store_tests;
