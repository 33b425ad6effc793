// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Budget resolution: the heart of disruption admission control.
//!
//! A [`BudgetResolver`] owns a fresh copy of one `ApplicationDisruptionBudget`
//! for the duration of a single reconciliation. It answers the questions asked
//! when a node disruption is evaluated:
//!
//! - which nodes does the application depend on? ([`BudgetResolver::resolve_nodes`])
//! - how many granted disruptions already touch them? ([`BudgetResolver::resolve_disruption`])
//! - is a given disruption relevant? ([`BudgetResolver::is_impacted`])
//! - can one more be tolerated? ([`BudgetResolver::tolerate_disruption`])
//! - is the application currently healthy? ([`BudgetResolver::check_health`])
//!
//! # Status lifecycle
//!
//! [`BudgetResolver::sync`] recomputes the status in memory and
//! [`BudgetResolver::update_status`] persists it. The write carries the
//! `resourceVersion` the budget was read at, so two reconciliations racing on the
//! same budget cannot silently overwrite each other: the loser gets a conflict and
//! is requeued.
//!
//! # Admission
//!
//! [`admit`] composes the per-budget checks: a disruption is granted only when
//! every budget it impacts tolerates one more disruption and reports healthy.

use crate::constants::{HEALTH_CHECK_MAX_BODY_BYTES, KIND_APPLICATION_DISRUPTION_BUDGET};
use crate::context::Context;
use crate::crd::{ApplicationDisruptionBudget, ApplicationDisruptionBudgetStatus, NamespacedName};
use crate::disruption::{Disruption, DisruptionAggregator};
use crate::errors::{AdmissionDenied, DenialReason, HealthCheckError, Result};
use crate::node_impact::NodeImpactResolver;
use crate::node_set::NodeSet;
use kube::ResourceExt;
use tracing::{debug, info};
use url::Url;

/// Resolves and maintains the status of one `ApplicationDisruptionBudget`.
pub struct BudgetResolver<'a> {
    budget: ApplicationDisruptionBudget,
    ctx: &'a Context,
}

impl<'a> BudgetResolver<'a> {
    #[must_use]
    pub fn new(budget: ApplicationDisruptionBudget, ctx: &'a Context) -> Self {
        Self { budget, ctx }
    }

    /// The local copy of the budget, including the last synced status.
    #[must_use]
    pub fn budget(&self) -> &ApplicationDisruptionBudget {
        &self.budget
    }

    /// The last synced (or last read) status, empty if none was ever written.
    #[must_use]
    pub fn status(&self) -> ApplicationDisruptionBudgetStatus {
        self.budget.status.clone().unwrap_or_default()
    }

    #[must_use]
    pub fn namespaced_name(&self) -> NamespacedName {
        NamespacedName {
            namespace: self.namespace(),
            name: self.budget.name_any(),
            kind: KIND_APPLICATION_DISRUPTION_BUDGET.to_string(),
        }
    }

    fn namespace(&self) -> String {
        self.budget.namespace().unwrap_or_default()
    }

    /// Nodes hosting the budget's pods or backing its volumes.
    ///
    /// # Errors
    ///
    /// Returns selector and store errors unmodified.
    pub async fn resolve_nodes(&self) -> Result<NodeSet> {
        NodeImpactResolver::new(self.ctx.store.as_ref())
            .resolve_nodes(&self.namespace(), &self.budget.spec)
            .await
    }

    /// Number of granted disruptions overlapping the budget's current nodes.
    ///
    /// The node set is recomputed first.
    ///
    /// # Errors
    ///
    /// Returns selector and store errors unmodified.
    pub async fn resolve_disruption(&self) -> Result<i32> {
        let nodes = self.resolve_nodes().await?;
        self.count_disruptions(&nodes).await
    }

    async fn count_disruptions(&self, nodes: &NodeSet) -> Result<i32> {
        DisruptionAggregator::new(
            self.ctx.store.as_ref(),
            self.ctx.disruption_resolver.as_ref(),
        )
        .resolve_disruption(nodes)
        .await
    }

    /// Recompute the status in memory. Nothing is persisted.
    ///
    /// On error the local status is left untouched.
    ///
    /// # Errors
    ///
    /// Returns selector and store errors unmodified.
    pub async fn sync(&mut self) -> Result<()> {
        let nodes = self.resolve_nodes().await?;
        let current_disruptions = self.count_disruptions(&nodes).await?;
        let disruptions_allowed = self
            .budget
            .spec
            .max_disruptions
            .saturating_sub(current_disruptions);

        debug!(
            budget = %self.namespaced_name(),
            watched_nodes = %nodes,
            current_disruptions,
            disruptions_allowed,
            "Synced budget status"
        );

        self.budget.status = Some(ApplicationDisruptionBudgetStatus {
            watched_nodes: nodes.to_string_list(),
            current_disruptions,
            disruptions_allowed,
        });
        Ok(())
    }

    /// Persist the local status through the status subresource.
    ///
    /// The whole status object replaces the stored one. The local copy is
    /// replaced by the stored result, carrying its new `resourceVersion`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the budget changed since it was read.
    pub async fn update_status(&mut self) -> Result<()> {
        self.budget = self.ctx.store.update_budget_status(&self.budget).await?;
        Ok(())
    }

    /// Whether `disruption` takes down at least one watched node.
    #[must_use]
    pub fn is_impacted(&self, disruption: &Disruption) -> bool {
        NodeSet::from_string_list(&self.status().watched_nodes)
            .intersects(&disruption.impacted_nodes)
    }

    /// Whether one more disruption fits in the budget, according to the last
    /// synced status.
    #[must_use]
    pub fn tolerate_disruption(&self, disruption: &Disruption) -> bool {
        let disruptions_allowed = self.status().disruptions_allowed;
        let tolerate = disruptions_allowed >= 1;

        debug!(
            budget = %self.namespaced_name(),
            disruption = %disruption.name,
            disruptions_allowed,
            tolerate,
            "Evaluated disruption against budget"
        );
        tolerate
    }

    /// Query the budget's `healthURL`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`HealthCheckError::InvalidUrl`] for a malformed URL,
    /// [`HealthCheckError::Transport`] if the request fails and
    /// [`HealthCheckError::Unhealthy`] for a non-2xx answer.
    pub async fn check_health(&self) -> std::result::Result<(), HealthCheckError> {
        let Some(raw_url) = self.budget.spec.health_url.as_deref() else {
            return Ok(());
        };

        let url = Url::parse(raw_url).map_err(|source| HealthCheckError::InvalidUrl {
            url: raw_url.to_string(),
            source,
        })?;

        let response = self
            .ctx
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| HealthCheckError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(budget = %self.namespaced_name(), url = %url, "Health check passed");
            return Ok(());
        }

        let body = response
            .text()
            .await
            .map_err(|source| HealthCheckError::Transport {
                url: url.to_string(),
                source,
            })?;

        Err(HealthCheckError::Unhealthy {
            url: url.to_string(),
            status: status.as_u16(),
            body: truncate_body(body),
        })
    }
}

fn truncate_body(mut body: String) -> String {
    if body.len() > HEALTH_CHECK_MAX_BODY_BYTES {
        let mut end = HEALTH_CHECK_MAX_BODY_BYTES;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}

/// Decide whether `disruption` may be granted against `budgets`.
///
/// Budgets not impacted by the disruption are ignored. Every impacted budget
/// must tolerate one more disruption and pass its health check; the first one
/// that does not is reported.
///
/// # Errors
///
/// Returns [`AdmissionDenied`] naming the first refusing budget.
pub async fn admit(
    budgets: &[BudgetResolver<'_>],
    disruption: &Disruption,
) -> std::result::Result<(), AdmissionDenied> {
    for budget in budgets.iter().filter(|budget| budget.is_impacted(disruption)) {
        if !budget.tolerate_disruption(disruption) {
            return Err(AdmissionDenied {
                budget: budget.namespaced_name(),
                reason: DenialReason::BudgetExhausted {
                    disruptions_allowed: budget.status().disruptions_allowed,
                },
            });
        }

        if let Err(err) = budget.check_health().await {
            return Err(AdmissionDenied {
                budget: budget.namespaced_name(),
                reason: DenialReason::Unhealthy(err),
            });
        }
    }

    info!(disruption = %disruption.name, "Disruption tolerated by every impacted budget");
    Ok(())
}

#[cfg(test)]
#[path = "budget_tests.rs"]
mod budget_tests;
