// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context passed to every budget reconciliation.

use crate::config::Config;
use crate::disruption::{DisruptionResolver, NodeSelectorResolver};
use crate::store::{ClusterStore, KubeStore};
use kube::Client;
use std::sync::Arc;

/// Shared context passed to the budget controller.
///
/// This context provides access to:
/// - the cluster store used to read and write budgets and their dependencies
/// - the resolver turning `NodeDisruption`s into impacted nodes
/// - the HTTP client for budget health checks
/// - the controller configuration
#[derive(Clone)]
pub struct Context {
    pub store: Arc<dyn ClusterStore>,
    pub disruption_resolver: Arc<dyn DisruptionResolver>,
    pub http_client: reqwest::Client,
    pub config: Config,
}

impl Context {
    /// Build a context talking to the cluster through `client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the health check HTTP client cannot be built.
    pub fn new(client: Client, config: Config) -> Result<Self, reqwest::Error> {
        Self::with_store(Arc::new(KubeStore::new(client)), config)
    }

    /// Build a context over an arbitrary store, resolving disruptions through it.
    ///
    /// # Errors
    ///
    /// Returns an error if the health check HTTP client cannot be built.
    pub fn with_store(store: Arc<dyn ClusterStore>, config: Config) -> Result<Self, reqwest::Error> {
        Ok(Self {
            disruption_resolver: Arc::new(NodeSelectorResolver::new(store.clone())),
            http_client: config.http_client()?,
            store,
            config,
        })
    }
}
