// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command line and environment configuration of the controller.

use crate::constants::{
    DEFAULT_HEALTH_CHECK_TIMEOUT_SECS, DEFAULT_REQUEUE_SECS, ERROR_REQUEUE_DURATION_SECS,
    METRICS_SERVER_PORT,
};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;

/// Output format of the tracing subscriber.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact human readable lines with file and line numbers
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(
    version,
    about = "Enforce ApplicationDisruptionBudgets against NodeDisruptions",
    long_about = None
)]
pub struct Config {
    /// Address the Prometheus metrics and health endpoints listen on
    #[arg(
        long,
        env = "METRICS_BIND_ADDRESS",
        default_value_t = SocketAddr::from(([0, 0, 0, 0], METRICS_SERVER_PORT))
    )]
    pub metrics_bind_address: SocketAddr,

    /// Timeout of a budget health check request, in seconds
    #[arg(long, env = "HEALTH_CHECK_TIMEOUT_SECS", default_value_t = DEFAULT_HEALTH_CHECK_TIMEOUT_SECS)]
    pub health_check_timeout_secs: u64,

    /// Delay before a budget is reconciled again after success, in seconds
    #[arg(long, env = "REQUEUE_INTERVAL_SECS", default_value_t = DEFAULT_REQUEUE_SECS)]
    pub requeue_interval_secs: u64,

    /// Delay before a budget is reconciled again after a failure, in seconds
    #[arg(long, env = "ERROR_REQUEUE_INTERVAL_SECS", default_value_t = ERROR_REQUEUE_DURATION_SECS)]
    pub error_requeue_interval_secs: u64,

    /// Log output format
    #[arg(long, env = "RUST_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metrics_bind_address: SocketAddr::from(([0, 0, 0, 0], METRICS_SERVER_PORT)),
            health_check_timeout_secs: DEFAULT_HEALTH_CHECK_TIMEOUT_SECS,
            requeue_interval_secs: DEFAULT_REQUEUE_SECS,
            error_requeue_interval_secs: ERROR_REQUEUE_DURATION_SECS,
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    #[must_use]
    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_secs(self.health_check_timeout_secs)
    }

    #[must_use]
    pub fn requeue_interval(&self) -> Duration {
        Duration::from_secs(self.requeue_interval_secs)
    }

    #[must_use]
    pub fn error_requeue_interval(&self) -> Duration {
        Duration::from_secs(self.error_requeue_interval_secs)
    }

    /// Build the HTTP client used for budget health checks.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(self.health_check_timeout())
            .user_agent(concat!("node-disruption-controller/", env!("CARGO_PKG_VERSION")))
            .build()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
