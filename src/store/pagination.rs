// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pagination helpers for Kubernetes API list operations.
//!
//! Pods of a large application and nodes of a large cluster are listed in pages
//! of [`KUBE_LIST_PAGE_SIZE`] to bound memory usage and API server load.

use crate::constants::KUBE_LIST_PAGE_SIZE;
use kube::{api::ListParams, Api, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

/// List all resources with automatic pagination.
///
/// Follows the `continue` token until the API server reports no more pages.
/// Any page failure aborts the whole listing: partial results are never returned.
///
/// # Example
///
/// ```no_run
/// use k8s_openapi::api::core::v1::Node;
/// use kube::{Api, Client, api::ListParams};
/// use ndc::store::pagination::list_all_paginated;
///
/// # async fn example() -> Result<(), kube::Error> {
/// let client = Client::try_default().await?;
/// let api: Api<Node> = Api::all(client);
///
/// let nodes = list_all_paginated(&api, ListParams::default().labels("zone=us-east")).await?;
/// println!("Found {} nodes", nodes.len());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns the underlying `kube::Error` if any page request fails.
pub async fn list_all_paginated<K>(
    api: &Api<K>,
    mut list_params: ListParams,
) -> Result<Vec<K>, kube::Error>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug,
{
    list_params.limit = Some(KUBE_LIST_PAGE_SIZE);

    let mut all_items = Vec::new();
    let mut page_count = 0;

    loop {
        page_count += 1;
        let result = api.list(&list_params).await?;

        let item_count = result.items.len();
        all_items.extend(result.items);

        debug!(
            kind = %K::kind(&()),
            page = page_count,
            items_in_page = item_count,
            total_items = all_items.len(),
            "Fetched page from Kubernetes API"
        );

        match result.metadata.continue_ {
            Some(continue_token) if !continue_token.is_empty() => {
                list_params.continue_token = Some(continue_token);
            }
            _ => break,
        }
    }

    Ok(all_items)
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod pagination_tests;
