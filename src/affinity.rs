// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Translation of node affinity into label and field selectors.
//!
//! A persistent volume's `spec.nodeAffinity.required` is a [`NodeSelector`]: a list
//! of terms, each term a conjunction of `matchExpressions` (node labels) and
//! `matchFields` (node fields such as `metadata.name`).
//!
//! The translation produces one flat label selector and one flat field selector
//! that can be handed to a node `list` call.
//!
//! # Flattened terms
//!
//! Requirements of *all* terms are combined conjunctively, instead of evaluating
//! the terms as a disjunction. This is a simplification of Kubernetes node
//! affinity: a volume with two alternative terms resolves to the nodes matching
//! both. Budget math depends on the translation being deterministic, so the
//! behavior is kept as is.
//!
//! # Example
//!
//! ```rust
//! use k8s_openapi::api::core::v1::{NodeSelector, NodeSelectorRequirement, NodeSelectorTerm};
//! use ndc::affinity::node_selector_as_selector;
//!
//! let affinity = NodeSelector {
//!     node_selector_terms: vec![NodeSelectorTerm {
//!         match_expressions: Some(vec![NodeSelectorRequirement {
//!             key: "topology.kubernetes.io/zone".to_string(),
//!             operator: "In".to_string(),
//!             values: Some(vec!["us-east".to_string()]),
//!         }]),
//!         match_fields: None,
//!     }],
//! };
//!
//! let (labels, fields) = node_selector_as_selector(Some(&affinity)).unwrap();
//! assert_eq!(labels.to_query().as_deref(), Some("topology.kubernetes.io/zone in (us-east)"));
//! assert!(fields.is_empty());
//! ```

use crate::errors::SelectorError;
use crate::selector::{FieldSelector, Operator, Requirement, Selector};
use k8s_openapi::api::core::v1::{NodeSelector, NodeSelectorRequirement};

/// Convert a `NodeSelectorRequirement` into a label [`Requirement`].
///
/// # Errors
///
/// Returns [`SelectorError::InvalidOperator`] for operators other than `In`, `NotIn`,
/// `Exists` and `DoesNotExist` (node affinity also allows `Gt` and `Lt`, which label
/// selectors cannot express), or [`SelectorError::InvalidLabelSelector`] for a
/// malformed key or value set.
pub fn node_selector_requirement_as_requirement(
    expression: &NodeSelectorRequirement,
) -> Result<Requirement, SelectorError> {
    let operator = Operator::from_selector_operator(&expression.operator)?;
    Requirement::new(
        &expression.key,
        operator,
        expression.values.clone().unwrap_or_default(),
    )
}

/// Convert a node selector into a `(label selector, field selector)` pair.
///
/// - `None` selects nothing: both selectors are `Nothing`.
/// - A selector without terms selects everything.
/// - Otherwise every term's requirements are ANDed into one flat selector.
///
/// # Errors
///
/// Returns [`SelectorError::InvalidOperator`] for unsupported operators and
/// [`SelectorError::InvalidFieldSelector`] when a `matchFields` requirement cannot be
/// expressed in the field selector grammar (only single-value `In` and `NotIn` can).
pub fn node_selector_as_selector(
    node_selector: Option<&NodeSelector>,
) -> Result<(Selector, FieldSelector), SelectorError> {
    let Some(node_selector) = node_selector else {
        return Ok((Selector::nothing(), FieldSelector::nothing()));
    };

    if node_selector.node_selector_terms.is_empty() {
        return Ok((Selector::everything(), FieldSelector::everything()));
    }

    let mut label_requirements = Vec::new();
    let mut field_expressions = Vec::new();

    for term in &node_selector.node_selector_terms {
        for expression in term.match_expressions.iter().flatten() {
            label_requirements.push(node_selector_requirement_as_requirement(expression)?);
        }

        for expression in term.match_fields.iter().flatten() {
            let requirement = node_selector_requirement_as_requirement(expression)?;
            field_expressions.push(field_expression(&requirement));
        }
    }

    let labels = Selector::everything().add(label_requirements);
    let fields = FieldSelector::parse(&field_expressions.join(","))?;
    Ok((labels, fields))
}

/// Render a requirement in field selector syntax.
///
/// Single-value `In`/`NotIn` become `key=value`/`key!=value`; anything else keeps its
/// label selector form, which the field selector grammar rejects.
fn field_expression(requirement: &Requirement) -> String {
    match (requirement.operator(), requirement.values()) {
        (Operator::In | Operator::Equals, [value]) => format!("{}={value}", requirement.key()),
        (Operator::NotIn | Operator::NotEquals, [value]) => {
            format!("{}!={value}", requirement.key())
        }
        _ => requirement.to_string(),
    }
}

#[cfg(test)]
#[path = "affinity_tests.rs"]
mod affinity_tests;
