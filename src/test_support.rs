// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory cluster store and object fixtures shared by unit tests.

use crate::config::Config;
use crate::constants::{
    KIND_APPLICATION_DISRUPTION_BUDGET, KIND_NODE, KIND_NODE_DISRUPTION, KIND_PERSISTENT_VOLUME,
    KIND_PERSISTENT_VOLUME_CLAIM, KIND_POD, NODE_NAME_FIELD,
};
use crate::context::Context;
use crate::crd::{
    ApplicationDisruptionBudget, ApplicationDisruptionBudgetSpec, LabelSelector, NodeDisruption,
    NodeDisruptionSpec, NodeDisruptionState, NodeDisruptionStatus,
};
use crate::errors::StoreError;
use crate::selector::{FieldSelector, Selector};
use crate::store::ClusterStore;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    Node, NodeSelector, NodeSelectorRequirement, NodeSelectorTerm, PersistentVolume,
    PersistentVolumeClaim, PersistentVolumeClaimSpec, PersistentVolumeSpec, Pod, PodSpec,
    VolumeNodeAffinity,
};
use kube::api::ObjectMeta;
use kube::ResourceExt;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Store operations that can be made to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Op {
    GetBudget,
    ListPods,
    ListPvcs,
    GetPersistentVolume,
    ListNodes,
    ListNodeDisruptions,
    UpdateBudgetStatus,
}

#[derive(Default)]
struct State {
    budgets: BTreeMap<(String, String), ApplicationDisruptionBudget>,
    pods: Vec<Pod>,
    pvcs: Vec<PersistentVolumeClaim>,
    volumes: BTreeMap<String, PersistentVolume>,
    nodes: Vec<Node>,
    node_disruptions: Vec<NodeDisruption>,
    failures: BTreeSet<Op>,
    status_conflict: bool,
    calls: BTreeMap<Op, usize>,
}

/// A [`ClusterStore`] holding objects in memory.
///
/// Status updates enforce `resourceVersion` compare-and-swap like the API server.
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<State>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn with_budget(self, budget: ApplicationDisruptionBudget) -> Self {
        self.put_budget(budget);
        self
    }

    pub fn with_pod(self, pod: Pod) -> Self {
        self.state().pods.push(pod);
        self
    }

    pub fn with_pvc(self, pvc: PersistentVolumeClaim) -> Self {
        self.state().pvcs.push(pvc);
        self
    }

    pub fn with_volume(self, volume: PersistentVolume) -> Self {
        self.state().volumes.insert(volume.name_any(), volume);
        self
    }

    pub fn with_node(self, node: Node) -> Self {
        self.state().nodes.push(node);
        self
    }

    pub fn with_node_disruption(self, node_disruption: NodeDisruption) -> Self {
        self.state().node_disruptions.push(node_disruption);
        self
    }

    /// Make every subsequent call of `op` fail with an API error.
    pub fn failing(self, op: Op) -> Self {
        self.state().failures.insert(op);
        self
    }

    /// Reject every status update as if the budget had changed concurrently.
    pub fn with_status_conflict(self) -> Self {
        self.state().status_conflict = true;
        self
    }

    pub fn put_budget(&self, budget: ApplicationDisruptionBudget) {
        let key = (budget.namespace().unwrap_or_default(), budget.name_any());
        self.state().budgets.insert(key, budget);
    }

    pub fn delete_budget(&self, namespace: &str, name: &str) {
        self.state()
            .budgets
            .remove(&(namespace.to_string(), name.to_string()));
    }

    pub fn stored_budget(&self, namespace: &str, name: &str) -> Option<ApplicationDisruptionBudget> {
        self.state()
            .budgets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn calls(&self, op: Op) -> usize {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    fn enter(&self, op: Op, kind: &str) -> Result<MutexGuard<'_, State>, StoreError> {
        let mut state = self.state();
        *state.calls.entry(op).or_default() += 1;
        if state.failures.contains(&op) {
            return Err(StoreError::Api {
                verb: "fake",
                kind: kind.to_string(),
                source: format!("injected {op:?} failure").into(),
            });
        }
        Ok(state)
    }
}

fn node_fields(node: &Node) -> BTreeMap<String, String> {
    BTreeMap::from([(NODE_NAME_FIELD.to_string(), node.name_any())])
}

#[async_trait]
impl ClusterStore for FakeStore {
    async fn get_budget(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ApplicationDisruptionBudget, StoreError> {
        let state = self.enter(Op::GetBudget, KIND_APPLICATION_DISRUPTION_BUDGET)?;
        state
            .budgets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: KIND_APPLICATION_DISRUPTION_BUDGET.to_string(),
                name: format!("{namespace}/{name}"),
            })
    }

    async fn list_pods(&self, namespace: &str, selector: &Selector) -> Result<Vec<Pod>, StoreError> {
        let state = self.enter(Op::ListPods, KIND_POD)?;
        Ok(state
            .pods
            .iter()
            .filter(|pod| pod.namespace().as_deref() == Some(namespace))
            .filter(|pod| selector.matches(pod.labels()))
            .cloned()
            .collect())
    }

    async fn list_pvcs(
        &self,
        namespace: &str,
        selector: &Selector,
    ) -> Result<Vec<PersistentVolumeClaim>, StoreError> {
        let state = self.enter(Op::ListPvcs, KIND_PERSISTENT_VOLUME_CLAIM)?;
        Ok(state
            .pvcs
            .iter()
            .filter(|pvc| pvc.namespace().as_deref() == Some(namespace))
            .filter(|pvc| selector.matches(pvc.labels()))
            .cloned()
            .collect())
    }

    async fn get_persistent_volume(&self, name: &str) -> Result<PersistentVolume, StoreError> {
        let state = self.enter(Op::GetPersistentVolume, KIND_PERSISTENT_VOLUME)?;
        state
            .volumes
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: KIND_PERSISTENT_VOLUME.to_string(),
                name: name.to_string(),
            })
    }

    async fn list_nodes(
        &self,
        labels: &Selector,
        fields: &FieldSelector,
    ) -> Result<Vec<Node>, StoreError> {
        let state = self.enter(Op::ListNodes, KIND_NODE)?;
        Ok(state
            .nodes
            .iter()
            .filter(|node| labels.matches(node.labels()) && fields.matches(&node_fields(node)))
            .cloned()
            .collect())
    }

    async fn list_node_disruptions(&self) -> Result<Vec<NodeDisruption>, StoreError> {
        let state = self.enter(Op::ListNodeDisruptions, KIND_NODE_DISRUPTION)?;
        Ok(state.node_disruptions.clone())
    }

    async fn update_budget_status(
        &self,
        budget: &ApplicationDisruptionBudget,
    ) -> Result<ApplicationDisruptionBudget, StoreError> {
        let mut state = self.enter(Op::UpdateBudgetStatus, KIND_APPLICATION_DISRUPTION_BUDGET)?;
        let status_conflict = state.status_conflict;
        let namespace = budget.namespace().unwrap_or_default();
        let name = budget.name_any();
        let id = format!("{namespace}/{name}");

        let Some(stored) = state.budgets.get_mut(&(namespace, name)) else {
            return Err(StoreError::NotFound {
                kind: KIND_APPLICATION_DISRUPTION_BUDGET.to_string(),
                name: id,
            });
        };

        if status_conflict || stored.resource_version() != budget.resource_version() {
            return Err(StoreError::Conflict {
                kind: KIND_APPLICATION_DISRUPTION_BUDGET.to_string(),
                name: id,
                message: "the object has been modified; please apply your changes to the latest version and try again".to_string(),
            });
        }

        let next_version = stored
            .resource_version()
            .and_then(|version| version.parse::<u64>().ok())
            .unwrap_or(0)
            + 1;
        stored.metadata.resource_version = Some(next_version.to_string());
        stored.status = budget.status.clone();
        Ok(stored.clone())
    }
}

/// Context over a [`FakeStore`] with default configuration.
pub fn test_context(store: Arc<FakeStore>) -> Context {
    Context::with_store(store, Config::default()).unwrap()
}

/// A kube client talking to a wiremock server.
pub fn mock_client(server: &wiremock::MockServer) -> kube::Client {
    let config = kube::Config::new(server.uri().parse().unwrap());
    kube::Client::try_from(config).unwrap()
}

pub fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn match_labels(pairs: &[(&str, &str)]) -> LabelSelector {
    if pairs.is_empty() {
        LabelSelector::default()
    } else {
        LabelSelector {
            match_labels: Some(labels(pairs)),
            match_expressions: None,
        }
    }
}

fn meta(namespace: Option<&str>, name: &str, label_pairs: &[(&str, &str)]) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        labels: (!label_pairs.is_empty()).then(|| labels(label_pairs)),
        ..ObjectMeta::default()
    }
}

pub fn pod(namespace: &str, name: &str, label_pairs: &[(&str, &str)], node: Option<&str>) -> Pod {
    Pod {
        metadata: meta(Some(namespace), name, label_pairs),
        spec: Some(PodSpec {
            node_name: node.map(str::to_string),
            ..PodSpec::default()
        }),
        ..Pod::default()
    }
}

pub fn node(name: &str, label_pairs: &[(&str, &str)]) -> Node {
    Node {
        metadata: meta(None, name, label_pairs),
        ..Node::default()
    }
}

pub fn pvc(
    namespace: &str,
    name: &str,
    label_pairs: &[(&str, &str)],
    volume: Option<&str>,
) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: meta(Some(namespace), name, label_pairs),
        spec: Some(PersistentVolumeClaimSpec {
            volume_name: volume.map(str::to_string),
            ..PersistentVolumeClaimSpec::default()
        }),
        ..PersistentVolumeClaim::default()
    }
}

pub fn volume(name: &str, required: Option<NodeSelector>) -> PersistentVolume {
    PersistentVolume {
        metadata: meta(None, name, &[]),
        spec: Some(PersistentVolumeSpec {
            node_affinity: Some(VolumeNodeAffinity { required }),
            ..PersistentVolumeSpec::default()
        }),
        ..PersistentVolume::default()
    }
}

/// Required node affinity with a single `key In (value)` term.
pub fn affinity(key: &str, value: &str) -> NodeSelector {
    NodeSelector {
        node_selector_terms: vec![NodeSelectorTerm {
            match_expressions: Some(vec![NodeSelectorRequirement {
                key: key.to_string(),
                operator: "In".to_string(),
                values: Some(vec![value.to_string()]),
            }]),
            match_fields: None,
        }],
    }
}

pub fn node_disruption(
    name: &str,
    node_label_pairs: &[(&str, &str)],
    state: NodeDisruptionState,
) -> NodeDisruption {
    let mut node_disruption = NodeDisruption::new(
        name,
        NodeDisruptionSpec {
            node_selector: match_labels(node_label_pairs),
        },
    );
    node_disruption.status = Some(NodeDisruptionStatus {
        state,
        disrupted_nodes: Vec::new(),
    });
    node_disruption
}

pub fn budget(
    namespace: &str,
    name: &str,
    pod_label_pairs: &[(&str, &str)],
    pvc_label_pairs: &[(&str, &str)],
    max_disruptions: i32,
    health_url: Option<&str>,
) -> ApplicationDisruptionBudget {
    let mut budget = ApplicationDisruptionBudget::new(
        name,
        ApplicationDisruptionBudgetSpec {
            pod_selector: match_labels(pod_label_pairs),
            pvc_selector: match_labels(pvc_label_pairs),
            max_disruptions,
            health_url: health_url.map(str::to_string),
        },
    );
    budget.metadata.namespace = Some(namespace.to_string());
    budget.metadata.resource_version = Some("1".to_string());
    budget
}
