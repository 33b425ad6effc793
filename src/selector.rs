// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label and field selector model.
//!
//! Kubernetes selectors come in two flavours and three states that must never be
//! conflated:
//!
//! - **Nothing** - matches no object at all (e.g. a volume without node affinity)
//! - **Everything** - a selector with no requirement
//! - **Requirements** - a conjunction of requirements
//!
//! [`Selector`] models label selectors (`In`, `NotIn`, `Exists`, `DoesNotExist`, plus the
//! equality forms produced by `matchLabels`). [`FieldSelector`] models field selectors,
//! whose grammar only supports `=`, `==` and `!=`.
//!
//! Both render to the query-string syntax accepted by the API server (used by the
//! kube-backed store) and can be evaluated in memory (used by the watch mappers).
//!
//! # Example
//!
//! ```rust
//! use ndc::crd::LabelSelector;
//! use ndc::selector::label_selector_as_selector;
//! use std::collections::BTreeMap;
//!
//! let crd_selector = LabelSelector {
//!     match_labels: Some(BTreeMap::from([("app".to_string(), "web".to_string())])),
//!     match_expressions: None,
//! };
//! let selector = label_selector_as_selector(&crd_selector).unwrap();
//! assert_eq!(selector.to_query().as_deref(), Some("app=web"));
//! ```

use crate::crd::LabelSelector;
use crate::errors::SelectorError;
use std::collections::BTreeMap;
use std::fmt;

/// Maximum length of a label name or value.
const MAX_LABEL_NAME_LENGTH: usize = 63;

/// Maximum length of a label key prefix (DNS subdomain).
const MAX_LABEL_PREFIX_LENGTH: usize = 253;

/// Relationship between a label key and a set of values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

impl Operator {
    /// Parse the operator of a `matchExpressions` entry.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::InvalidOperator`] for anything other than
    /// `In`, `NotIn`, `Exists` and `DoesNotExist`.
    pub fn from_selector_operator(operator: &str) -> Result<Self, SelectorError> {
        match operator {
            "In" => Ok(Operator::In),
            "NotIn" => Ok(Operator::NotIn),
            "Exists" => Ok(Operator::Exists),
            "DoesNotExist" => Ok(Operator::DoesNotExist),
            other => Err(SelectorError::InvalidOperator {
                operator: other.to_string(),
            }),
        }
    }
}

/// A single validated label requirement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Requirement {
    key: String,
    operator: Operator,
    values: Vec<String>,
}

impl Requirement {
    /// Build a requirement, validating the key, the values and the value count.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::InvalidLabelSelector`] when:
    /// - the key is not a qualified name
    /// - `In`/`NotIn` have no value, equality operators do not have exactly one
    /// - `Exists`/`DoesNotExist` carry values
    /// - a value is not a valid label value
    pub fn new(key: &str, operator: Operator, values: Vec<String>) -> Result<Self, SelectorError> {
        validate_label_key(key)?;

        let count_error = match operator {
            Operator::In | Operator::NotIn if values.is_empty() => {
                Some("values must be non-empty for In and NotIn")
            }
            Operator::Equals | Operator::NotEquals if values.len() != 1 => {
                Some("exactly one value is required for equality")
            }
            Operator::Exists | Operator::DoesNotExist if !values.is_empty() => {
                Some("values must be empty for Exists and DoesNotExist")
            }
            _ => None,
        };
        if let Some(reason) = count_error {
            return Err(SelectorError::InvalidLabelSelector {
                key: key.to_string(),
                reason: reason.to_string(),
            });
        }

        for value in &values {
            validate_label_value(key, value)?;
        }

        let mut values = values;
        values.sort();
        values.dedup();

        Ok(Self {
            key: key.to_string(),
            operator,
            values,
        })
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Sorted, de-duplicated values.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    fn has_value(&self, value: &str) -> bool {
        self.values
            .binary_search_by(|candidate| candidate.as_str().cmp(value))
            .is_ok()
    }

    /// Evaluate the requirement against a label set.
    #[must_use]
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self.operator {
            Operator::Equals | Operator::In => labels
                .get(&self.key)
                .is_some_and(|value| self.has_value(value)),
            Operator::NotEquals | Operator::NotIn => labels
                .get(&self.key)
                .is_none_or(|value| !self.has_value(value)),
            Operator::Exists => labels.contains_key(&self.key),
            Operator::DoesNotExist => !labels.contains_key(&self.key),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            Operator::Exists => write!(f, "{}", self.key),
            Operator::DoesNotExist => write!(f, "!{}", self.key),
            Operator::Equals => write!(f, "{}={}", self.key, self.values.join(",")),
            Operator::NotEquals => write!(f, "{}!={}", self.key, self.values.join(",")),
            Operator::In => write!(f, "{} in ({})", self.key, self.values.join(",")),
            Operator::NotIn => write!(f, "{} notin ({})", self.key, self.values.join(",")),
        }
    }
}

/// A parsed label selector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    /// Matches no object.
    Nothing,
    /// Conjunction of requirements. An empty list matches every object.
    Requirements(Vec<Requirement>),
}

impl Selector {
    #[must_use]
    pub fn everything() -> Self {
        Selector::Requirements(Vec::new())
    }

    #[must_use]
    pub fn nothing() -> Self {
        Selector::Nothing
    }

    /// `true` when the selector has no requirement (selects everything).
    ///
    /// [`Selector::Nothing`] is *not* empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Selector::Requirements(requirements) if requirements.is_empty())
    }

    #[must_use]
    pub fn is_nothing(&self) -> bool {
        matches!(self, Selector::Nothing)
    }

    /// Add requirements, keeping them sorted by key. Adding to `Nothing` is a no-op.
    #[must_use]
    pub fn add(self, additional: impl IntoIterator<Item = Requirement>) -> Self {
        match self {
            Selector::Nothing => Selector::Nothing,
            Selector::Requirements(mut requirements) => {
                requirements.extend(additional);
                requirements.sort_by(|a, b| a.key.cmp(&b.key));
                Selector::Requirements(requirements)
            }
        }
    }

    #[must_use]
    pub fn requirements(&self) -> &[Requirement] {
        match self {
            Selector::Nothing => &[],
            Selector::Requirements(requirements) => requirements,
        }
    }

    /// Evaluate the selector against a label set.
    #[must_use]
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Selector::Nothing => false,
            Selector::Requirements(requirements) => {
                requirements.iter().all(|requirement| requirement.matches(labels))
            }
        }
    }

    /// Query-string form for `ListParams::labels`.
    ///
    /// Returns `None` for `Nothing`, which the API server cannot express; callers
    /// must short-circuit to an empty result instead of listing.
    #[must_use]
    pub fn to_query(&self) -> Option<String> {
        match self {
            Selector::Nothing => None,
            Selector::Requirements(_) => Some(self.to_string()),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Nothing => write!(f, "<nothing>"),
            Selector::Requirements(requirements) => write!(f, "{}", join(requirements)),
        }
    }
}

/// Convert a CRD label selector into a [`Selector`].
///
/// An empty CRD selector converts to [`Selector::everything`]; it is up to the
/// caller to decide whether "everything" is acceptable in its context.
///
/// # Errors
///
/// Returns a [`SelectorError`] if any requirement is malformed or uses an unknown operator.
pub fn label_selector_as_selector(selector: &LabelSelector) -> Result<Selector, SelectorError> {
    let mut requirements = Vec::new();

    if let Some(match_labels) = &selector.match_labels {
        for (key, value) in match_labels {
            requirements.push(Requirement::new(
                key,
                Operator::Equals,
                vec![value.clone()],
            )?);
        }
    }

    if let Some(match_expressions) = &selector.match_expressions {
        for expression in match_expressions {
            let operator = Operator::from_selector_operator(&expression.operator)?;
            requirements.push(Requirement::new(
                &expression.key,
                operator,
                expression.values.clone().unwrap_or_default(),
            )?);
        }
    }

    Ok(Selector::everything().add(requirements))
}

/// Operators supported by the field selector grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldOperator {
    Equals,
    NotEquals,
}

/// A single `field=value` or `field!=value` term.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldRequirement {
    field: String,
    operator: FieldOperator,
    value: String,
}

impl FieldRequirement {
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub fn operator(&self) -> FieldOperator {
        self.operator
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Missing fields compare as the empty string, as the API server does.
    #[must_use]
    pub fn matches(&self, fields: &BTreeMap<String, String>) -> bool {
        let actual = fields.get(&self.field).map_or("", String::as_str);
        match self.operator {
            FieldOperator::Equals => actual == self.value,
            FieldOperator::NotEquals => actual != self.value,
        }
    }
}

impl fmt::Display for FieldRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            FieldOperator::Equals => write!(f, "{}={}", self.field, self.value),
            FieldOperator::NotEquals => write!(f, "{}!={}", self.field, self.value),
        }
    }
}

/// A parsed field selector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldSelector {
    /// Matches no object.
    Nothing,
    /// Conjunction of terms. An empty list matches every object.
    Terms(Vec<FieldRequirement>),
}

impl FieldSelector {
    #[must_use]
    pub fn everything() -> Self {
        FieldSelector::Terms(Vec::new())
    }

    #[must_use]
    pub fn nothing() -> Self {
        FieldSelector::Nothing
    }

    /// Parse a comma-separated field selector expression.
    ///
    /// An empty expression selects everything.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::InvalidFieldSelector`] when a term has no
    /// supported operator or an invalid field name or value.
    pub fn parse(expression: &str) -> Result<Self, SelectorError> {
        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Ok(FieldSelector::everything());
        }

        let terms = trimmed
            .split(',')
            .map(|term| parse_field_term(term.trim(), expression))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FieldSelector::Terms(terms))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldSelector::Terms(terms) if terms.is_empty())
    }

    #[must_use]
    pub fn is_nothing(&self) -> bool {
        matches!(self, FieldSelector::Nothing)
    }

    #[must_use]
    pub fn requirements(&self) -> &[FieldRequirement] {
        match self {
            FieldSelector::Nothing => &[],
            FieldSelector::Terms(terms) => terms,
        }
    }

    #[must_use]
    pub fn matches(&self, fields: &BTreeMap<String, String>) -> bool {
        match self {
            FieldSelector::Nothing => false,
            FieldSelector::Terms(terms) => terms.iter().all(|term| term.matches(fields)),
        }
    }

    /// Query-string form for `ListParams::fields`. `None` for `Nothing`.
    #[must_use]
    pub fn to_query(&self) -> Option<String> {
        match self {
            FieldSelector::Nothing => None,
            FieldSelector::Terms(_) => Some(self.to_string()),
        }
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSelector::Nothing => write!(f, "<nothing>"),
            FieldSelector::Terms(terms) => write!(f, "{}", join(terms)),
        }
    }
}

fn parse_field_term(term: &str, expression: &str) -> Result<FieldRequirement, SelectorError> {
    let invalid = |reason: String| SelectorError::InvalidFieldSelector {
        selector: expression.to_string(),
        reason,
    };

    let (field, operator, value) = if let Some((field, value)) = term.split_once("!=") {
        (field, FieldOperator::NotEquals, value)
    } else if let Some((field, value)) = term.split_once("==") {
        (field, FieldOperator::Equals, value)
    } else if let Some((field, value)) = term.split_once('=') {
        (field, FieldOperator::Equals, value)
    } else {
        return Err(invalid(format!(
            "term {term:?} has no operator, only =, == and != are supported"
        )));
    };

    let field = field.trim();
    let value = value.trim();

    if field.is_empty() {
        return Err(invalid(format!("term {term:?} has an empty field name")));
    }
    if !field
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '/'))
    {
        return Err(invalid(format!("invalid field name {field:?}")));
    }
    if value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '=' | '!' | '(' | ')'))
    {
        return Err(invalid(format!("invalid value {value:?} for field {field:?}")));
    }

    Ok(FieldRequirement {
        field: field.to_string(),
        operator,
        value: value.to_string(),
    })
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Validate a label key: an optional DNS subdomain prefix and a name.
fn validate_label_key(key: &str) -> Result<(), SelectorError> {
    let invalid = |reason: &str| SelectorError::InvalidLabelSelector {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };

    if let Some(prefix) = prefix {
        if prefix.is_empty() || prefix.len() > MAX_LABEL_PREFIX_LENGTH {
            return Err(invalid("prefix must be a non-empty DNS subdomain"));
        }
        let valid_prefix = prefix.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
                && !segment.starts_with('-')
                && !segment.ends_with('-')
        });
        if !valid_prefix {
            return Err(invalid("prefix must be a lowercase DNS subdomain"));
        }
    }

    if name.is_empty() {
        return Err(invalid("name part must be non-empty"));
    }
    if !is_label_name(name) {
        return Err(invalid(
            "name part must be 63 characters or less, alphanumeric, '-', '_' or '.', \
             and start and end with an alphanumeric character",
        ));
    }
    Ok(())
}

/// Validate a label value. Empty values are allowed.
fn validate_label_value(key: &str, value: &str) -> Result<(), SelectorError> {
    if value.is_empty() || is_label_name(value) {
        return Ok(());
    }
    Err(SelectorError::InvalidLabelSelector {
        key: key.to_string(),
        reason: format!(
            "value {value:?} must be 63 characters or less, alphanumeric, '-', '_' or '.', \
             and start and end with an alphanumeric character"
        ),
    })
}

fn is_label_name(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    !bytes.is_empty()
        && bytes.len() <= MAX_LABEL_NAME_LENGTH
        && bytes[0].is_ascii_alphanumeric()
        && bytes[bytes.len() - 1].is_ascii_alphanumeric()
        && bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod selector_tests;
