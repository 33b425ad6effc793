// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for node disruption budgets.
//!
//! # Resource Types
//!
//! - [`ApplicationDisruptionBudget`] - Protects a workload (pods and/or PVCs) against
//!   too many concurrent node disruptions
//! - [`NodeDisruption`] - A request to disrupt (drain, reboot, replace) a set of nodes
//!
//! # Example: Protecting a StatefulSet
//!
//! ```rust,no_run
//! use ndc::crd::{ApplicationDisruptionBudgetSpec, LabelSelector};
//! use std::collections::BTreeMap;
//!
//! let spec = ApplicationDisruptionBudgetSpec {
//!     pod_selector: LabelSelector {
//!         match_labels: Some(BTreeMap::from([("app".to_string(), "cassandra".to_string())])),
//!         match_expressions: None,
//!     },
//!     pvc_selector: LabelSelector::default(),
//!     max_disruptions: 1,
//!     health_url: Some("http://cassandra.db.svc:8080/health".to_string()),
//! };
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Label selector to match Kubernetes resources.
///
/// A label selector is a label query over a set of resources. The result of matchLabels and
/// matchExpressions are `ANDed`. An empty label selector has no requirements. An empty pod
/// or node selector selects nothing; an empty PVC selector selects every claim.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    /// Map of {key,value} pairs. A single {key,value} in the matchLabels map is equivalent
    /// to an element of matchExpressions, whose key field is "key", the operator is "In",
    /// and the values array contains only "value". All requirements must be satisfied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_labels: Option<BTreeMap<String, String>>,

    /// List of label selector requirements. All requirements must be satisfied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_expressions: Option<Vec<LabelSelectorRequirement>>,
}

/// A label selector requirement is a selector that contains values, a key, and an operator
/// that relates the key and values.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct LabelSelectorRequirement {
    /// The label key that the selector applies to.
    pub key: String,

    /// Operator represents a key's relationship to a set of values.
    /// Valid operators are In, `NotIn`, Exists and `DoesNotExist`.
    pub operator: String,

    /// An array of string values. If the operator is In or `NotIn`,
    /// the values array must be non-empty. If the operator is Exists or `DoesNotExist`,
    /// the values array must be empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

impl LabelSelector {
    /// `true` when the selector carries no requirement at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.match_labels.as_ref().is_none_or(BTreeMap::is_empty)
            && self.match_expressions.as_ref().is_none_or(Vec::is_empty)
    }
}

/// `ApplicationDisruptionBudget` limits how many concurrent node disruptions may
/// touch the nodes hosting (or backing the storage of) an application.
///
/// # Example
///
/// ```yaml
/// apiVersion: nodedisruption.criteo.com/v1alpha1
/// kind: ApplicationDisruptionBudget
/// metadata:
///   name: cassandra
///   namespace: db
/// spec:
///   podSelector:
///     matchLabels:
///       app: cassandra
///   pvcSelector:
///     matchLabels:
///       app: cassandra
///   maxDisruptions: 1
///   healthURL: http://cassandra.db.svc:8080/health
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "nodedisruption.criteo.com",
    version = "v1alpha1",
    kind = "ApplicationDisruptionBudget",
    namespaced,
    shortname = "adb",
    doc = "ApplicationDisruptionBudget bounds the number of concurrent node disruptions that may impact the nodes hosting an application's pods or backing its persistent volumes.",
    printcolumn = r#"{"name":"Max","type":"integer","jsonPath":".spec.maxDisruptions"}"#,
    printcolumn = r#"{"name":"Current","type":"integer","jsonPath":".status.currentDisruptions"}"#,
    printcolumn = r#"{"name":"Allowed","type":"integer","jsonPath":".status.disruptionsAllowed"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[kube(status = "ApplicationDisruptionBudgetStatus")]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDisruptionBudgetSpec {
    /// Selects the pods of the application, in the budget's namespace.
    ///
    /// The nodes these pods are scheduled on are watched by the budget.
    #[serde(default)]
    pub pod_selector: LabelSelector,

    /// Selects the persistent volume claims of the application, in the budget's namespace.
    ///
    /// The nodes allowed by the bound volumes' node affinity are watched by the budget.
    /// Left empty, every claim of the namespace is selected.
    #[serde(default, rename = "pvcSelector")]
    pub pvc_selector: LabelSelector,

    /// Maximum number of concurrent disruptions impacting the watched nodes.
    #[schemars(range(min = 0))]
    pub max_disruptions: i32,

    /// Optional URL queried before granting a disruption. Any non-2xx answer blocks it.
    #[serde(default, rename = "healthURL", skip_serializing_if = "Option::is_none")]
    pub health_url: Option<String>,
}

/// Observed state of an `ApplicationDisruptionBudget`.
///
/// Owned by the controller and fully overwritten on every reconciliation.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDisruptionBudgetStatus {
    /// Sorted list of the nodes currently hosting or backing the application.
    #[serde(default)]
    pub watched_nodes: Vec<String>,

    /// Number of granted node disruptions overlapping the watched nodes.
    #[serde(default)]
    pub current_disruptions: i32,

    /// `maxDisruptions - currentDisruptions`. Negative when the budget is exceeded.
    #[serde(default)]
    pub disruptions_allowed: i32,
}

/// Lifecycle state of a `NodeDisruption`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NodeDisruptionState {
    /// Waiting for every impacted budget to agree
    #[default]
    Pending,
    /// Admitted; counts against every budget it impacts
    Granted,
    /// Refused by at least one budget
    Rejected,
    /// Any other state, such as the terminal states set by the disruption lifecycle.
    /// Never counted against a budget.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for NodeDisruptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeDisruptionState::Pending => write!(f, "pending"),
            NodeDisruptionState::Granted => write!(f, "granted"),
            NodeDisruptionState::Rejected => write!(f, "rejected"),
            NodeDisruptionState::Unknown => write!(f, "unknown"),
        }
    }
}

/// `NodeDisruption` requests permission to disrupt the nodes selected by `nodeSelector`.
///
/// # Example
///
/// ```yaml
/// apiVersion: nodedisruption.criteo.com/v1alpha1
/// kind: NodeDisruption
/// metadata:
///   name: rack-12-firmware
/// spec:
///   nodeSelector:
///     matchLabels:
///       topology.kubernetes.io/rack: "12"
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "nodedisruption.criteo.com",
    version = "v1alpha1",
    kind = "NodeDisruption",
    shortname = "nd",
    doc = "NodeDisruption is a request to voluntarily disrupt a set of nodes. It is granted only when every impacted ApplicationDisruptionBudget tolerates it.",
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[kube(status = "NodeDisruptionStatus")]
#[serde(rename_all = "camelCase")]
pub struct NodeDisruptionSpec {
    /// Selects the nodes that will be disrupted.
    #[serde(default)]
    pub node_selector: LabelSelector,
}

/// Observed state of a `NodeDisruption`.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeDisruptionStatus {
    #[serde(default)]
    pub state: NodeDisruptionState,

    /// Nodes resolved when the disruption was evaluated. Informational only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disrupted_nodes: Vec<String>,
}

impl NodeDisruption {
    /// Current state, treating a missing status as `Pending`.
    #[must_use]
    pub fn state(&self) -> NodeDisruptionState {
        self.status
            .as_ref()
            .map(|status| status.state)
            .unwrap_or_default()
    }
}

/// Identity of a budget, used when reporting which budget refused a disruption.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
    pub kind: String,
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
