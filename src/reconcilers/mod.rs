// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation logic for disruption budgets.
//!
//! # Reconciliation Architecture
//!
//! The controller follows the standard Kubernetes controller pattern:
//!
//! 1. **Watch** - Monitor budgets, pods and node disruptions via the Kubernetes API
//! 2. **Resolve** - Compute the nodes a budget protects and the disruptions touching them
//! 3. **Status** - Report watched nodes and remaining disruptions back to Kubernetes
//!
//! # Available Reconcilers
//!
//! - [`reconcile_budget`] - Recomputes the status of an `ApplicationDisruptionBudget`
//!
//! # Trigger Mapping
//!
//! - [`all_budgets`] - Budgets requeued when a `NodeDisruption` changes
//! - [`budgets_for_pod`] - Budgets requeued when a `Pod` changes
//!
//! # Example: Using a Reconciler
//!
//! ```rust,no_run
//! use ndc::reconcilers::reconcile_budget;
//! use ndc::crd::ApplicationDisruptionBudget;
//! use ndc::context::Context;
//! use std::sync::Arc;
//!
//! async fn reconcile(ctx: Arc<Context>, budget: ApplicationDisruptionBudget) -> anyhow::Result<()> {
//!     reconcile_budget(ctx, &budget).await
//! }
//! ```

pub mod budget;

pub use budget::{all_budgets, budgets_for_pod, reconcile_budget};
