// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `ApplicationDisruptionBudget` reconciliation.
//!
//! Every pass recomputes the budget's status from scratch: a fresh copy of the
//! budget is read, its watched nodes and current disruptions are resolved, and
//! the whole status is written back with the `resourceVersion` it was read at.
//!
//! The functions mapping `Pod` and `NodeDisruption` events to budgets only use
//! the controller's reflector store to decide *which* budgets to requeue; the
//! budget math itself always reads the cluster.

use crate::budget::BudgetResolver;
use crate::context::Context;
use crate::crd::ApplicationDisruptionBudget;
use crate::errors::ResolveError;
use crate::metrics;
use crate::selector::label_selector_as_selector;
use anyhow::{anyhow, Context as _, Result};
use k8s_openapi::api::core::v1::Pod;
use kube::core::PartialObjectMeta;
use kube::runtime::reflector::{ObjectRef, Store};
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{debug, info};

/// Reconcile a single `ApplicationDisruptionBudget`.
///
/// # Arguments
///
/// * `ctx` - Shared controller context
/// * `budget` - The budget that triggered the reconciliation; only its identity is used
///
/// # Errors
///
/// Returns an error if the budget cannot be read, resolved or written back.
/// The underlying [`ResolveError`] can be recovered with `downcast_ref`.
/// A budget deleted since the trigger is not an error.
pub async fn reconcile_budget(ctx: Arc<Context>, budget: &ApplicationDisruptionBudget) -> Result<()> {
    let name = budget.name_any();
    let namespace = budget
        .namespace()
        .ok_or_else(|| anyhow!("ApplicationDisruptionBudget {name} has no namespace"))?;

    let fresh = match ctx.store.get_budget(&namespace, &name).await {
        Ok(fresh) => fresh,
        Err(err) => {
            let err = ResolveError::from(err);
            if err.is_not_found() {
                debug!(namespace = %namespace, budget = %name, "Budget deleted, nothing to reconcile");
                metrics::forget_budget(&namespace, &name);
                return Ok(());
            }
            return Err(err)
                .with_context(|| format!("failed to read ApplicationDisruptionBudget {namespace}/{name}"));
        }
    };

    let mut resolver = BudgetResolver::new(fresh, &ctx);

    resolver
        .sync()
        .await
        .with_context(|| format!("failed to sync ApplicationDisruptionBudget {namespace}/{name}"))?;

    resolver.update_status().await.with_context(|| {
        format!("failed to update status of ApplicationDisruptionBudget {namespace}/{name}")
    })?;

    let status = resolver.status();
    metrics::record_budget_status(&namespace, &name, &status);

    info!(
        namespace = %namespace,
        budget = %name,
        watched_nodes = status.watched_nodes.len(),
        current_disruptions = status.current_disruptions,
        disruptions_allowed = status.disruptions_allowed,
        "Reconciled ApplicationDisruptionBudget"
    );
    Ok(())
}

/// Every budget known to the controller.
///
/// A `NodeDisruption` changing state can affect any budget, so all of them are requeued.
#[must_use]
pub fn all_budgets(budgets: &Store<ApplicationDisruptionBudget>) -> Vec<ObjectRef<ApplicationDisruptionBudget>> {
    budgets
        .state()
        .iter()
        .map(|budget| ObjectRef::from_obj(budget.as_ref()))
        .collect()
}

/// Budgets in the pod's namespace whose pod selector matches the pod.
///
/// Budgets with an empty or invalid pod selector are skipped: an empty selector
/// watches no pod and an invalid one is reported by the budget's own reconciliation.
#[must_use]
pub fn budgets_for_pod(
    budgets: &Store<ApplicationDisruptionBudget>,
    pod: &PartialObjectMeta<Pod>,
) -> Vec<ObjectRef<ApplicationDisruptionBudget>> {
    let Some(namespace) = pod.namespace() else {
        return vec![];
    };

    budgets
        .state()
        .iter()
        .filter(|budget| budget.namespace().as_deref() == Some(namespace.as_str()))
        .filter(|budget| {
            label_selector_as_selector(&budget.spec.pod_selector)
                .is_ok_and(|selector| !selector.is_empty() && selector.matches(pod.labels()))
        })
        .map(|budget| ObjectRef::from_obj(budget.as_ref()))
        .collect()
}

#[cfg(test)]
#[path = "budget_tests.rs"]
mod budget_tests;
