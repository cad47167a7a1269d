//! In-process scanning search provider.
//!
//! # Responsibility
//! - Evaluate criteria by scanning indexed documents.
//! - Rank hits by summed match levels.
//!
//! # Invariants
//! - Ordering is deterministic: `score DESC, id ASC`.
//! - `max_results` is honored only when built with bounded top-N support.

use crate::search::criteria::{Examineness, SearchCriteria, SearchValue};
use crate::search::document::IndexDocument;
use crate::search::provider::{SearchHit, SearchHits, SearchProvider};
use crate::search::{SearchError, SearchResult};
use log::debug;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// Scanning provider over documents held in memory.
pub struct MemoryIndex {
    name: String,
    fields: Vec<String>,
    bounded_top_n: bool,
    documents: RwLock<BTreeMap<i32, IndexDocument>>,
}

impl MemoryIndex {
    /// Creates an empty index that searches `fields` and supports top-N.
    pub fn new<F: AsRef<str>>(name: impl Into<String>, fields: &[F]) -> Self {
        Self {
            name: name.into(),
            fields: fields.iter().map(|field| field.as_ref().to_string()).collect(),
            bounded_top_n: true,
            documents: RwLock::new(BTreeMap::new()),
        }
    }

    /// Toggles bounded top-N support.
    pub fn with_bounded_top_n(mut self, enabled: bool) -> Self {
        self.bounded_top_n = enabled;
        self
    }

    /// Adds or replaces one document.
    pub fn index(&self, document: IndexDocument) {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(document.id, document);
    }

    pub fn index_all(&self, documents: impl IntoIterator<Item = IndexDocument>) {
        let mut guard = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for document in documents {
            guard.insert(document.id, document);
        }
    }

    /// Removes one document; returns whether it existed.
    pub fn remove(&self, id: i32) -> bool {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_known_fields(&self, criteria: &SearchCriteria) -> SearchResult<()> {
        for field in criteria.fields() {
            if !self.fields.iter().any(|known| known == field) {
                return Err(SearchError::InvalidQuery {
                    query: field.to_string(),
                    message: format!("field is not indexed by provider `{}`", self.name),
                });
            }
        }
        Ok(())
    }
}

impl SearchProvider for MemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn searchable_fields(&self) -> Vec<String> {
        self.fields.clone()
    }

    fn supports_bounded_top_n(&self) -> bool {
        self.bounded_top_n
    }

    fn search(
        &self,
        criteria: &SearchCriteria,
        max_results: Option<usize>,
    ) -> SearchResult<SearchHits> {
        if criteria.is_empty() {
            return Ok(SearchHits::empty());
        }
        self.ensure_known_fields(criteria)?;
        let matchers = criteria
            .groups()
            .iter()
            .map(|group| TokenMatcher::compile(group.value()))
            .collect::<SearchResult<Vec<_>>>()?;

        let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
        let mut hits: Vec<SearchHit> = documents
            .values()
            .filter_map(|document| {
                score_document(document, criteria, &matchers).map(|score| SearchHit {
                    id: document.id,
                    score,
                })
            })
            .collect();
        drop(documents);

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
        let total_item_count = hits.len();
        if let (true, Some(limit)) = (self.bounded_top_n, max_results) {
            hits.truncate(limit);
        }

        debug!(
            "event=index_search module=search status=ok provider={} groups={} total={} returned={}",
            self.name,
            criteria.groups().len(),
            total_item_count,
            hits.len()
        );
        Ok(SearchHits {
            hits,
            total_item_count,
        })
    }
}

/// Returns the document score, or `None` when any group fails to match.
fn score_document(
    document: &IndexDocument,
    criteria: &SearchCriteria,
    matchers: &[TokenMatcher],
) -> Option<f32> {
    let mut score = 0.0;
    for (group, matcher) in criteria.groups().iter().zip(matchers) {
        let mut group_score = 0.0;
        for field in group.fields() {
            let Some(text) = document.field(field) else {
                continue;
            };
            if matcher.matches(&tokenize(text)) {
                group_score += group.value().level;
            }
        }
        if group_score == 0.0 {
            return None;
        }
        score += group_score;
    }
    Some(score)
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Splits a wildcard value into token patterns; a pattern without a letter or
/// digit is dropped.
fn pattern_tokens(value: &str) -> Vec<String> {
    value
        .split(|c: char| !(c.is_alphanumeric() || c == '*' || c == '?'))
        .filter(|token| token.chars().any(char::is_alphanumeric))
        .map(str::to_lowercase)
        .collect()
}

/// One group value compiled for matching against consecutive field tokens.
enum TokenMatcher {
    Exact(Vec<String>),
    Wildcard(Vec<Regex>),
}

impl TokenMatcher {
    fn compile(value: &SearchValue) -> SearchResult<Self> {
        match value.examineness {
            Examineness::Explicit => Ok(Self::Exact(tokenize(&value.value))),
            Examineness::ComplexWildcard => pattern_tokens(&value.value)
                .iter()
                .map(|token| {
                    wildcard_regex(token).map_err(|err| SearchError::InvalidQuery {
                        query: value.value.clone(),
                        message: err.to_string(),
                    })
                })
                .collect::<SearchResult<Vec<_>>>()
                .map(Self::Wildcard),
        }
    }

    fn width(&self) -> usize {
        match self {
            Self::Exact(tokens) => tokens.len(),
            Self::Wildcard(patterns) => patterns.len(),
        }
    }

    fn matches(&self, field_tokens: &[String]) -> bool {
        let width = self.width();
        if width == 0 || width > field_tokens.len() {
            return false;
        }
        field_tokens.windows(width).any(|window| match self {
            Self::Exact(expected) => window == expected.as_slice(),
            Self::Wildcard(patterns) => window
                .iter()
                .zip(patterns)
                .all(|(token, pattern)| pattern.is_match(token)),
        })
    }
}

/// Anchored regex for a token pattern with `*` (any run) and `?` (one char).
fn wildcard_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut source = String::with_capacity(pattern.len() + 2);
    source.push('^');
    for c in pattern.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');
    Regex::new(&source)
}
