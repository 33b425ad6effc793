// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `ApplicationDisruptionBudget` controller wiring.
//!
//! The controller owns budgets and also watches:
//!
//! - `NodeDisruption`s: any change (typically a transition to `granted`) requeues
//!   every budget, since any of them may be impacted
//! - `Pod`s: a pod change requeues the budgets of its namespace selecting it, so
//!   the watched node set follows scheduling. Only pod metadata is watched.
//!
//! Successful reconciliations are requeued after the configured interval so
//! that PV and node changes, which are not watched, are eventually picked up.

use crate::config::Config;
use crate::constants::{CONFLICT_REQUEUE_SECS, KIND_APPLICATION_DISRUPTION_BUDGET};
use crate::context::Context;
use crate::crd::{ApplicationDisruptionBudget, NodeDisruption};
use crate::errors::ResolveError;
use crate::metrics;
use crate::reconcilers::{all_budgets, budgets_for_pod, reconcile_budget};
use anyhow::Result;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::runtime::controller::Action;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::{metadata_watcher, Controller, WatchStreamExt};
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Reconciliation error wrapper
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ReconcileError(#[from] anyhow::Error);

/// Run the `ApplicationDisruptionBudget` controller until shutdown.
///
/// # Errors
///
/// Returns an error if the controller fails to start.
pub async fn run_budget_controller(client: Client, context: Arc<Context>) -> Result<()> {
    info!("Starting {} controller", KIND_APPLICATION_DISRUPTION_BUDGET);

    let budgets = Api::<ApplicationDisruptionBudget>::all(client.clone());
    let node_disruptions = Api::<NodeDisruption>::all(client.clone());
    let pods = Api::<Pod>::all(client);

    // Configure controller to watch for ALL changes including status updates
    let watcher_config = WatcherConfig::default().any_semantic();

    let controller = Controller::new(budgets, watcher_config.clone());
    let budget_store = controller.store();
    let pod_budget_store = budget_store.clone();

    controller
        .watches(node_disruptions, watcher_config, move |_node_disruption| {
            all_budgets(&budget_store)
        })
        .watches_stream(
            metadata_watcher(pods, WatcherConfig::default()).touched_objects(),
            move |pod| budgets_for_pod(&pod_budget_store, &pod),
        )
        .shutdown_on_signal()
        .run(reconcile_wrapper, error_policy, context)
        .for_each(|result| {
            if let Err(e) = result {
                debug!(error = %e, "Controller event not reconciled");
            }
            futures::future::ready(())
        })
        .await;

    info!("{} controller stopped", KIND_APPLICATION_DISRUPTION_BUDGET);
    Ok(())
}

/// Reconcile wrapper recording metrics and choosing the requeue interval.
async fn reconcile_wrapper(
    budget: Arc<ApplicationDisruptionBudget>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    debug!(
        budget = %budget.name_any(),
        namespace = ?budget.namespace(),
        "Reconcile wrapper called for ApplicationDisruptionBudget"
    );

    let start = Instant::now();
    let result = reconcile_budget(ctx.clone(), &budget).await;
    let duration = start.elapsed();

    match result {
        Ok(()) => {
            metrics::record_reconciliation_success(KIND_APPLICATION_DISRUPTION_BUDGET, duration);
            Ok(Action::requeue(ctx.config.requeue_interval()))
        }
        Err(e) => {
            metrics::record_reconciliation_error(KIND_APPLICATION_DISRUPTION_BUDGET, duration);
            metrics::record_error(KIND_APPLICATION_DISRUPTION_BUDGET, error_type(&e));
            Err(e.into())
        }
    }
}

/// Error policy for the budget controller.
///
/// Lost optimistic concurrency races are expected and retried almost immediately;
/// everything else waits for the error requeue interval.
#[allow(clippy::needless_pass_by_value)] // Signature required by kube::runtime::Controller
fn error_policy(
    budget: Arc<ApplicationDisruptionBudget>,
    err: &ReconcileError,
    ctx: Arc<Context>,
) -> Action {
    let delay = requeue_delay(&err.0, &ctx.config);

    if is_conflict(&err.0) {
        debug!(
            budget = %budget.name_any(),
            namespace = ?budget.namespace(),
            error = %err,
            "Status update conflicted, retrying in {}s",
            delay.as_secs()
        );
        metrics::record_reconciliation_requeue(KIND_APPLICATION_DISRUPTION_BUDGET, "conflict");
    } else {
        error!(
            budget = %budget.name_any(),
            namespace = ?budget.namespace(),
            error = format!("{:#}", err.0),
            "Reconciliation error - will retry in {}s",
            delay.as_secs()
        );
        metrics::record_reconciliation_requeue(KIND_APPLICATION_DISRUPTION_BUDGET, "error");
    }

    Action::requeue(delay)
}

fn is_conflict(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ResolveError>()
        .is_some_and(ResolveError::is_conflict)
}

/// Delay before retrying a failed reconciliation.
pub(crate) fn requeue_delay(err: &anyhow::Error, config: &Config) -> Duration {
    if is_conflict(err) {
        Duration::from_secs(CONFLICT_REQUEUE_SECS)
    } else {
        config.error_requeue_interval()
    }
}

/// Metrics category of a reconciliation error.
pub(crate) fn error_type(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<ResolveError>() {
        Some(ResolveError::Selector(_)) => "selector",
        Some(e) if e.is_conflict() => "conflict",
        Some(ResolveError::Store(_)) => "store",
        Some(ResolveError::Health(_)) => "health",
        None => "other",
    }
}

#[cfg(test)]
#[path = "budget_controller_tests.rs"]
mod budget_controller_tests;
