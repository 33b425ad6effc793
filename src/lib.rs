// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Node Disruption Controller
//!
//! A Kubernetes controller that lets node maintenance proceed only when the
//! applications running on the affected nodes can tolerate it.
//!
//! ## Overview
//!
//! Applications declare an `ApplicationDisruptionBudget` selecting their pods and
//! persistent volume claims. Node maintenance is requested through `NodeDisruption`
//! resources selecting nodes. For every budget the controller keeps up to date:
//!
//! - the nodes the application depends on (pods' nodes and nodes reachable by its volumes)
//! - how many granted disruptions currently touch those nodes
//! - how many more disruptions it can tolerate
//!
//! ## Modules
//!
//! - [`crd`] - Custom Resource Definition types
//! - [`selector`] - Label and field selector model
//! - [`affinity`] - Translation of PV node affinity into selectors
//! - [`node_set`] - Set of node names
//! - [`node_impact`] - Nodes an application depends on
//! - [`disruption`] - Disruptions and their aggregation over a node set
//! - [`budget`] - Budget status computation and admission checks
//! - [`store`] - Cluster read/write abstraction
//! - [`reconcilers`] - Reconciliation logic
//! - [`budget_controller`] - Controller wiring
//! - [`metrics`] - Prometheus metrics and HTTP endpoint
//!
//! ## Example
//!
//! ```rust
//! use ndc::node_set::NodeSet;
//!
//! let watched: NodeSet = ["node-1", "node-2"].map(String::from).into_iter().collect();
//! let disrupted: NodeSet = ["node-2", "node-3"].map(String::from).into_iter().collect();
//!
//! assert!(watched.intersects(&disrupted));
//! ```

pub mod affinity;
pub mod budget;
pub mod budget_controller;
pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod disruption;
pub mod errors;
pub mod metrics;
pub mod node_impact;
pub mod node_set;
pub mod reconcilers;
pub mod selector;
pub mod store;

#[cfg(test)]
mod test_support;
