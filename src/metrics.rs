// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the node disruption controller.
//!
//! This module provides metrics collection with the namespace prefix
//! `nodedisruption_criteo_com_` (prometheus-safe version of "nodedisruption.criteo.com").
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Track reconciliation operations and their outcomes
//! - **Error Metrics** - Track error conditions and types
//! - **Budget Metrics** - Mirror the status of every `ApplicationDisruptionBudget`
//!
//! The registry is served over HTTP by [`serve`], next to a `/healthz` liveness probe.
//!
//! # Example
//!
//! ```rust,no_run
//! use ndc::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("ApplicationDisruptionBudget", std::time::Duration::from_secs(1));
//! ```

use crate::constants::{HEALTHZ_PATH, METRICS_SERVER_PATH};
use crate::crd::ApplicationDisruptionBudgetStatus;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::net::SocketAddr;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all controller metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "nodedisruption_criteo_com";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by resource type and status
///
/// Labels:
/// - `resource_type`: Kind of resource (e.g., `ApplicationDisruptionBudget`)
/// - `status`: Outcome (`success`, `error`, `requeue`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by resource type and status",
    );
    let counter = CounterVec::new(opts, &["resource_type", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
///
/// Labels:
/// - `resource_type`: Kind of resource
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by resource type",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of requeue operations
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `reason`: Reason for requeue (`error`, `conflict`)
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_requeues_total"),
        "Total number of requeue operations by resource type and reason",
    );
    let counter = CounterVec::new(opts, &["resource_type", "reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by resource type and error category
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `error_type`: Category (`selector`, `store`, `conflict`, `health`)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by resource type and error category",
    );
    let counter = CounterVec::new(opts, &["resource_type", "error_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Budget Metrics
// ============================================================================

/// Number of nodes watched by a budget
///
/// Labels:
/// - `namespace`: Namespace of the budget
/// - `budget`: Name of the budget
pub static BUDGET_WATCHED_NODES: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_budget_watched_nodes"),
        "Number of nodes hosting or backing the application of a budget",
    );
    let gauge = GaugeVec::new(opts, &["namespace", "budget"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Granted disruptions currently impacting a budget
pub static BUDGET_CURRENT_DISRUPTIONS: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_budget_current_disruptions"),
        "Number of granted node disruptions impacting a budget",
    );
    let gauge = GaugeVec::new(opts, &["namespace", "budget"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Disruptions a budget can still tolerate. Negative when exceeded.
pub static BUDGET_DISRUPTIONS_ALLOWED: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_budget_disruptions_allowed"),
        "Number of additional node disruptions a budget can tolerate",
    );
    let gauge = GaugeVec::new(opts, &["namespace", "budget"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Recording Functions
// ============================================================================

/// Record a successful reconciliation
///
/// # Arguments
/// * `resource_type` - The kind of resource reconciled
/// * `duration` - Duration of the reconciliation
pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
///
/// # Arguments
/// * `resource_type` - The kind of resource reconciled
/// * `duration` - Duration of the reconciliation before failure
pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a reconciliation requeue
///
/// # Arguments
/// * `resource_type` - The kind of resource reconciled
/// * `reason` - Reason for requeue (e.g., `error`, `conflict`)
pub fn record_reconciliation_requeue(resource_type: &str, reason: &str) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "requeue"])
        .inc();
    REQUEUE_TOTAL
        .with_label_values(&[resource_type, reason])
        .inc();
}

/// Record an error
///
/// # Arguments
/// * `resource_type` - The kind of resource
/// * `error_type` - Category of error
pub fn record_error(resource_type: &str, error_type: &str) {
    ERRORS_TOTAL
        .with_label_values(&[resource_type, error_type])
        .inc();
}

/// Publish the persisted status of a budget.
pub fn record_budget_status(
    namespace: &str,
    budget: &str,
    status: &ApplicationDisruptionBudgetStatus,
) {
    let labels = [namespace, budget];
    #[allow(clippy::cast_precision_loss)]
    BUDGET_WATCHED_NODES
        .with_label_values(&labels)
        .set(status.watched_nodes.len() as f64);
    BUDGET_CURRENT_DISRUPTIONS
        .with_label_values(&labels)
        .set(f64::from(status.current_disruptions));
    BUDGET_DISRUPTIONS_ALLOWED
        .with_label_values(&labels)
        .set(f64::from(status.disruptions_allowed));
}

/// Drop the series of a deleted budget.
pub fn forget_budget(namespace: &str, budget: &str) {
    let labels = [namespace, budget];
    // Absent series are fine: the budget may never have been synced.
    let _ = BUDGET_WATCHED_NODES.remove_label_values(&labels);
    let _ = BUDGET_CURRENT_DISRUPTIONS.remove_label_values(&labels);
    let _ = BUDGET_DISRUPTIONS_ALLOWED.remove_label_values(&labels);
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Returns
/// Prometheus-formatted metrics as a String
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

// ============================================================================
// HTTP Endpoint
// ============================================================================

async fn metrics_handler() -> impl IntoResponse {
    match gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

fn router() -> Router {
    Router::new()
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .route(HEALTHZ_PATH, get(healthz))
}

/// Serve `/metrics` and `/healthz` on `address` until the process exits.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(address: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(address).await?;
    serve_on(listener).await
}

/// Serve `/metrics` and `/healthz` on an already bound listener.
///
/// # Errors
///
/// Returns an error if the server fails.
pub async fn serve_on(listener: TcpListener) -> anyhow::Result<()> {
    info!(
        address = %listener.local_addr()?,
        "Metrics server listening"
    );
    axum::serve(listener, router()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reconciliation_success() {
        let resource_type = "TestResource";
        let duration = Duration::from_millis(500);

        record_reconciliation_success(resource_type, duration);

        let counter = RECONCILIATION_TOTAL.with_label_values(&[resource_type, "success"]);
        assert!(counter.get() > 0.0);

        let histogram = RECONCILIATION_DURATION_SECONDS.with_label_values(&[resource_type]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_record_reconciliation_requeue() {
        record_reconciliation_requeue("TestRequeue", "conflict");

        assert!(
            REQUEUE_TOTAL
                .with_label_values(&["TestRequeue", "conflict"])
                .get()
                > 0.0
        );
    }

    #[test]
    fn test_record_budget_status_and_forget() {
        let status = ApplicationDisruptionBudgetStatus {
            watched_nodes: vec!["node-1".to_string(), "node-2".to_string()],
            current_disruptions: 3,
            disruptions_allowed: -2,
        };

        record_budget_status("metrics-test", "cassandra", &status);

        let labels = ["metrics-test", "cassandra"];
        assert!((BUDGET_WATCHED_NODES.with_label_values(&labels).get() - 2.0).abs() < f64::EPSILON);
        assert!(
            (BUDGET_DISRUPTIONS_ALLOWED.with_label_values(&labels).get() + 2.0).abs()
                < f64::EPSILON
        );

        forget_budget("metrics-test", "cassandra");
        let text = gather_metrics().unwrap();
        assert!(!text.contains("namespace=\"metrics-test\""));

        // Forgetting twice is harmless.
        forget_budget("metrics-test", "cassandra");
    }

    #[test]
    fn test_gather_metrics() {
        record_reconciliation_success("GatherTest", Duration::from_millis(100));

        let metrics_text = gather_metrics().unwrap();
        assert!(
            metrics_text.contains("nodedisruption_criteo_com"),
            "Metrics should contain namespace prefix"
        );
        assert!(
            metrics_text.contains("reconciliations_total"),
            "Metrics should contain reconciliation counter"
        );
    }

    #[tokio::test]
    async fn test_serve_metrics_and_healthz() {
        record_reconciliation_success("ServeTest", Duration::from_millis(10));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_on(listener));

        let client = reqwest::Client::new();
        let healthz = client
            .get(format!("http://{address}/healthz"))
            .send()
            .await
            .unwrap();
        assert_eq!(healthz.status(), reqwest::StatusCode::OK);

        let metrics = client
            .get(format!("http://{address}/metrics"))
            .send()
            .await
            .unwrap();
        assert_eq!(metrics.status(), reqwest::StatusCode::OK);
        assert!(metrics.text().await.unwrap().contains("ServeTest"));

        server.abort();
    }
}
