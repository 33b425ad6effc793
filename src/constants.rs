// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the node disruption controller.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the node disruption CRDs
pub const API_GROUP: &str = "nodedisruption.criteo.com";

/// API version for the node disruption CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "nodedisruption.criteo.com/v1alpha1";

/// Kind name for `ApplicationDisruptionBudget` resource
pub const KIND_APPLICATION_DISRUPTION_BUDGET: &str = "ApplicationDisruptionBudget";

/// Kind name for `NodeDisruption` resource
pub const KIND_NODE_DISRUPTION: &str = "NodeDisruption";

/// Kind names of the core resources read by the resolvers
pub const KIND_POD: &str = "Pod";
pub const KIND_PERSISTENT_VOLUME_CLAIM: &str = "PersistentVolumeClaim";
pub const KIND_PERSISTENT_VOLUME: &str = "PersistentVolume";
pub const KIND_NODE: &str = "Node";

/// Field path of a node's name, as used in node affinity `matchFields`
pub const NODE_NAME_FIELD: &str = "metadata.name";

// ============================================================================
// Kubernetes API Constants
// ============================================================================

/// Page size for Kubernetes API list operations
///
/// Large lists (pods of a big `StatefulSet`, nodes of a large cluster) are
/// fetched in pages of this size.
pub const KUBE_LIST_PAGE_SIZE: u32 = 100;

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// Requeue duration after a successful budget reconciliation (seconds)
pub const DEFAULT_REQUEUE_SECS: u64 = 60;

/// Requeue duration after a failed budget reconciliation (seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue duration after a status write lost an optimistic concurrency race (seconds)
pub const CONFLICT_REQUEUE_SECS: u64 = 1;

// ============================================================================
// Health Check Constants
// ============================================================================

/// Timeout for budget health check requests (seconds)
pub const DEFAULT_HEALTH_CHECK_TIMEOUT_SECS: u64 = 10;

/// Maximum number of response body bytes kept in an unhealthy diagnostic
pub const HEALTH_CHECK_MAX_BODY_BYTES: usize = 1024;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Port for Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the liveness endpoint served next to the metrics
pub const HEALTHZ_PATH: &str = "/healthz";
