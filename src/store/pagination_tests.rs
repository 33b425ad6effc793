// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `pagination.rs`

#[cfg(test)]
mod tests {
    use crate::constants::KUBE_LIST_PAGE_SIZE;
    use crate::store::pagination::list_all_paginated;
    use crate::test_support::mock_client;
    use k8s_openapi::api::core::v1::Node;
    use kube::{api::ListParams, Api};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn node_list(names: &[&str], continue_token: Option<&str>) -> serde_json::Value {
        let items: Vec<_> = names
            .iter()
            .map(|name| json!({"apiVersion": "v1", "kind": "Node", "metadata": {"name": name}}))
            .collect();
        let mut metadata = json!({"resourceVersion": "42"});
        if let Some(token) = continue_token {
            metadata["continue"] = json!(token);
        }
        json!({"apiVersion": "v1", "kind": "NodeList", "metadata": metadata, "items": items})
    }

    #[test]
    fn test_pagination_constant() {
        assert_eq!(
            KUBE_LIST_PAGE_SIZE, 100,
            "Page size should be 100 items per page"
        );
    }

    #[tokio::test]
    async fn test_follows_continue_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/nodes"))
            .and(query_param("limit", "100"))
            .and(query_param_is_missing("continue"))
            .respond_with(ResponseTemplate::new(200).set_body_json(node_list(&["n1", "n2"], Some("page-2"))))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v1/nodes"))
            .and(query_param("continue", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(node_list(&["n3"], None)))
            .expect(1)
            .mount(&server)
            .await;

        let api: Api<Node> = Api::all(mock_client(&server));
        let nodes = list_all_paginated(&api, ListParams::default()).await.unwrap();

        let names: Vec<_> = nodes
            .iter()
            .filter_map(|node| node.metadata.name.clone())
            .collect();
        assert_eq!(names, vec!["n1", "n2", "n3"]);
    }

    #[tokio::test]
    async fn test_page_failure_aborts_listing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/nodes"))
            .and(query_param_is_missing("continue"))
            .respond_with(ResponseTemplate::new(200).set_body_json(node_list(&["n1"], Some("page-2"))))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v1/nodes"))
            .and(query_param("continue", "page-2"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "apiVersion": "v1",
                "kind": "Status",
                "metadata": {},
                "status": "Failure",
                "message": "etcd unavailable",
                "reason": "InternalError",
                "code": 500
            })))
            .mount(&server)
            .await;

        let api: Api<Node> = Api::all(mock_client(&server));
        let result = list_all_paginated(&api, ListParams::default()).await;

        assert!(result.is_err(), "a failing page must not yield a partial list");
    }
}
