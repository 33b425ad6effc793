// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `budget_controller.rs`

#[cfg(test)]
mod tests {
    use crate::budget_controller::{error_type, requeue_delay};
    use crate::config::Config;
    use crate::errors::{ResolveError, SelectorError, StoreError};
    use anyhow::{anyhow, Context as _};
    use std::time::Duration;

    fn wrapped(err: ResolveError) -> anyhow::Error {
        Err::<(), _>(err)
            .context("failed to update status of ApplicationDisruptionBudget db/cassandra")
            .unwrap_err()
    }

    fn conflict() -> ResolveError {
        ResolveError::Store(StoreError::Conflict {
            kind: "ApplicationDisruptionBudget".to_string(),
            name: "db/cassandra".to_string(),
            message: "the object has been modified".to_string(),
        })
    }

    #[test]
    fn test_conflict_is_requeued_quickly() {
        let config = Config::default();
        assert_eq!(requeue_delay(&wrapped(conflict()), &config), Duration::from_secs(1));
    }

    #[test]
    fn test_other_errors_use_error_interval() {
        let config = Config {
            error_requeue_interval_secs: 45,
            ..Config::default()
        };
        let selector = ResolveError::Selector(SelectorError::InvalidOperator {
            operator: "Gt".to_string(),
        });

        assert_eq!(requeue_delay(&wrapped(selector), &config), Duration::from_secs(45));
        assert_eq!(requeue_delay(&anyhow!("boom"), &config), Duration::from_secs(45));
    }

    #[test]
    fn test_error_type() {
        assert_eq!(error_type(&wrapped(conflict())), "conflict");
        assert_eq!(
            error_type(&wrapped(ResolveError::Store(StoreError::NotFound {
                kind: "PersistentVolume".to_string(),
                name: "pv-0".to_string(),
            }))),
            "store"
        );
        assert_eq!(
            error_type(&wrapped(ResolveError::Selector(SelectorError::InvalidOperator {
                operator: "Gt".to_string(),
            }))),
            "selector"
        );
        assert_eq!(error_type(&anyhow!("no namespace")), "other");
    }
}
