// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for node-impact resolution and admission control.
//!
//! This module provides specialized error types for:
//! - Label and field selector parsing (including node-affinity translation)
//! - Cluster state store access (get, list and status updates)
//! - Synchronous health checks against a budget's protected resource
//!
//! None of these errors is fatal to the process. They are returned to the
//! reconciliation driver, which requeues the budget and recomputes it from
//! scratch on the next pass.

use crate::crd::NamespacedName;
use thiserror::Error;

/// Boxed error carried by store failures so the original cause is surfaced unmodified.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while parsing or translating label and field selectors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// The operator of a requirement is not one of `In`, `NotIn`, `Exists`, `DoesNotExist`.
    #[error("{operator:?} is not a valid label selector operator")]
    InvalidOperator {
        /// The operator string as found in the resource
        operator: String,
    },

    /// A label requirement has an invalid key, value or value count.
    #[error("invalid label selector requirement for key {key:?}: {reason}")]
    InvalidLabelSelector {
        /// The requirement key
        key: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// A field selector expression cannot be parsed by the field selector grammar.
    #[error("invalid field selector {selector:?}: {reason}")]
    InvalidFieldSelector {
        /// The offending selector expression
        selector: String,
        /// Explanation of what is invalid
        reason: String,
    },
}

/// Errors returned by a [`ClusterStore`](crate::store::ClusterStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// The requested resource does not exist (HTTP 404).
    #[error("{kind} {name:?} not found")]
    NotFound {
        /// Kind of the missing resource
        kind: String,
        /// Name (or namespace/name) of the missing resource
        name: String,
    },

    /// The resource changed since it was read (HTTP 409).
    ///
    /// Retryable: the reconciliation must re-read the resource and recompute.
    #[error("conflict writing {kind} {name:?}: {message}")]
    Conflict {
        /// Kind of the conflicting resource
        kind: String,
        /// Name (or namespace/name) of the conflicting resource
        name: String,
        /// Message returned by the API server
        message: String,
    },

    /// Any other failure talking to the cluster store.
    #[error("{verb} {kind} failed: {source}")]
    Api {
        /// Operation that failed (`get`, `list`, `update status`)
        verb: &'static str,
        /// Kind of the resource involved
        kind: String,
        /// Underlying error, unmodified
        #[source]
        source: BoxError,
    },
}

impl StoreError {
    /// Classify a `kube::Error` into the store error taxonomy.
    #[must_use]
    pub fn from_kube(verb: &'static str, kind: &str, name: &str, err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ref response) if response.code == 404 => StoreError::NotFound {
                kind: kind.to_string(),
                name: name.to_string(),
            },
            kube::Error::Api(ref response) if response.code == 409 => StoreError::Conflict {
                kind: kind.to_string(),
                name: name.to_string(),
                message: response.message.clone(),
            },
            other => StoreError::Api {
                verb,
                kind: kind.to_string(),
                source: Box::new(other),
            },
        }
    }
}

/// Errors returned by a budget health check.
#[derive(Error, Debug)]
pub enum HealthCheckError {
    /// The configured `healthURL` is not a valid absolute URL.
    #[error("invalid health URL {url:?}: {source}")]
    InvalidUrl {
        /// The configured URL
        url: String,
        /// Parse failure
        #[source]
        source: url::ParseError,
    },

    /// The request could not be completed (connection refused, timeout, TLS...).
    #[error("health check request to {url} failed: {source}")]
    Transport {
        /// The health endpoint
        url: String,
        /// Transport failure
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with a non-2xx status code.
    #[error("http server responded with non 2XX status code {status}: {body}")]
    Unhealthy {
        /// The health endpoint
        url: String,
        /// HTTP status code returned
        status: u16,
        /// Response body, surfaced as diagnostic text
        body: String,
    },
}

/// Umbrella error for budget resolution (`sync`, `update_status`, `check_health`).
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Health(#[from] HealthCheckError),
}

impl ResolveError {
    /// The primary resource vanished between trigger and read.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::Store(StoreError::NotFound { .. }))
    }

    /// Optimistic-concurrency rejection on a status update.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, ResolveError::Store(StoreError::Conflict { .. }))
    }

    /// Whether re-running the reconciliation may succeed without user action.
    ///
    /// Selector errors need the user to fix the resource, everything else may
    /// be transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ResolveError::Selector(_))
    }
}

/// Why a budget refused a disruption.
#[derive(Error, Debug)]
pub enum DenialReason {
    /// Granting would exceed `maxDisruptions`.
    #[error("no more disruptions allowed ({disruptions_allowed} left)")]
    BudgetExhausted {
        /// `disruptionsAllowed` from the last synced status
        disruptions_allowed: i32,
    },

    /// The protected application reported itself unhealthy.
    #[error("health check failed: {0}")]
    Unhealthy(#[source] HealthCheckError),
}

/// A disruption refused by the first impacted budget that did not agree.
#[derive(Error, Debug)]
#[error("disruption refused by {budget}: {reason}")]
pub struct AdmissionDenied {
    /// The refusing budget
    pub budget: NamespacedName,
    /// Why it refused
    #[source]
    pub reason: DenialReason,
}

/// Result alias used by the resolvers.
pub type Result<T, E = ResolveError> = std::result::Result<T, E>;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
