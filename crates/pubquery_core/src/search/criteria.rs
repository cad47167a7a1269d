//! Search criteria model and "search all fields" construction.
//!
//! # Responsibility
//! - Describe a query as AND-ed groups of OR-ed field matches.
//! - Build the all-fields criteria for a raw term.
//!
//! # Invariants
//! - A compiled [`SearchCriteria`] is never mutated.
//! - Every group names at least one field.
//! - Zero groups means "match nothing".

use crate::search::{SearchError, SearchResult};
use std::sync::Arc;

/// Match strength of one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Examineness {
    /// Exact token (or phrase) match.
    Explicit,
    /// Value contains `*`/`?` wildcards.
    ComplexWildcard,
}

/// One value to match, with its strength and boost level.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchValue {
    pub examineness: Examineness,
    pub value: String,
    pub level: f32,
}

impl SearchValue {
    pub fn explicit(value: impl Into<String>) -> Self {
        Self {
            examineness: Examineness::Explicit,
            value: value.into(),
            level: 1.0,
        }
    }

    /// Trailing-wildcard match: `token` becomes `token*`.
    ///
    /// `*` and `?` already in `token` are dropped, so the appended `*` is the
    /// only wildcard.
    pub fn prefix(token: &str) -> Self {
        let mut value: String = token.chars().filter(|c| !matches!(c, '*' | '?')).collect();
        value.push('*');
        Self {
            examineness: Examineness::ComplexWildcard,
            value,
            level: 1.0,
        }
    }
}

/// A value that must match in at least one of `fields`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldGroup {
    fields: Arc<[String]>,
    value: SearchValue,
}

impl FieldGroup {
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn value(&self) -> &SearchValue {
        &self.value
    }
}

/// Compiled criteria: every group must match.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCriteria {
    groups: Arc<[FieldGroup]>,
}

impl SearchCriteria {
    pub fn groups(&self) -> &[FieldGroup] {
        &self.groups
    }

    /// True when the criteria has no groups and therefore matches nothing.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Union of fields referenced by any group, in first-use order.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        for group in self.groups.iter() {
            for field in group.fields.iter() {
                if !fields.contains(&field.as_str()) {
                    fields.push(field);
                }
            }
        }
        fields
    }
}

/// Write-once builder for [`SearchCriteria`].
#[derive(Debug, Default, Clone)]
pub struct SearchCriteriaBuilder {
    groups: Vec<(Vec<String>, SearchValue)>,
}

impl SearchCriteriaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one group per value; each value may match in any of `fields`.
    pub fn grouped_or<F, V>(mut self, fields: &[F], values: V) -> Self
    where
        F: AsRef<str>,
        V: IntoIterator<Item = SearchValue>,
    {
        let fields: Vec<String> = fields.iter().map(|field| field.as_ref().to_string()).collect();
        for value in values {
            self.groups.push((fields.clone(), value));
        }
        self
    }

    /// Adds one group per searchable token of `term`, each matching in any of
    /// `fields`.
    ///
    /// Tokens are split on whitespace; tokens without a letter or digit carry
    /// nothing an index can match and are skipped. With `use_wildcards`, each
    /// token becomes a trailing-wildcard match.
    pub fn all_fields<F: AsRef<str>>(
        self,
        fields: &[F],
        term: &str,
        use_wildcards: bool,
    ) -> Self {
        let tokens = term_tokens(term);
        let values: Vec<SearchValue> = if use_wildcards {
            tokens.map(SearchValue::prefix).collect()
        } else {
            tokens.map(SearchValue::explicit).collect()
        };
        self.grouped_or(fields, values)
    }

    /// Adds a group that must match in exactly one field.
    pub fn field(mut self, field: impl Into<String>, value: SearchValue) -> Self {
        self.groups.push((vec![field.into()], value));
        self
    }

    /// Validates and freezes the criteria.
    pub fn compile(self) -> SearchResult<SearchCriteria> {
        let mut groups = Vec::with_capacity(self.groups.len());
        for (fields, value) in self.groups {
            if value.value.trim().is_empty() {
                return Err(SearchError::InvalidCriteria(
                    "search value cannot be empty".to_string(),
                ));
            }
            if fields.is_empty() {
                return Err(SearchError::InvalidCriteria(format!(
                    "value `{}` targets no fields",
                    value.value
                )));
            }

            let mut unique: Vec<String> = Vec::with_capacity(fields.len());
            for field in fields {
                let field = field.trim().to_string();
                if field.is_empty() {
                    return Err(SearchError::InvalidCriteria(
                        "field name cannot be empty".to_string(),
                    ));
                }
                if !unique.contains(&field) {
                    unique.push(field);
                }
            }

            groups.push(FieldGroup {
                fields: unique.into(),
                value,
            });
        }

        Ok(SearchCriteria {
            groups: groups.into(),
        })
    }
}

/// Whitespace-separated tokens of `term` that contain a letter or digit.
pub fn term_tokens(term: &str) -> impl Iterator<Item = &str> {
    term.split_whitespace()
        .filter(|token| token.chars().any(char::is_alphanumeric))
}

/// Builds criteria requiring every searchable token of `term` to match in at
/// least one of `fields`.
///
/// A blank term, or one made only of punctuation, yields empty criteria,
/// which match nothing.
pub fn search_all_fields<F: AsRef<str>>(
    fields: &[F],
    term: &str,
    use_wildcards: bool,
) -> SearchResult<SearchCriteria> {
    SearchCriteriaBuilder::new()
        .all_fields(fields, term, use_wildcards)
        .compile()
}
