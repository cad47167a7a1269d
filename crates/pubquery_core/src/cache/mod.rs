//! Published cache contracts and the in-memory snapshot implementation.
//!
//! # Responsibility
//! - Define the read-only lookup surface a published snapshot exposes.
//! - Keep identifier-form resolution rules in one place.
//!
//! # Invariants
//! - Caches never mutate after construction; every read is repeatable.
//! - Missing items are `Ok(None)`, malformed path expressions are errors.

use crate::model::id::ItemId;
use crate::model::item::{ItemKind, PublishedItemRef};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod snapshot;
pub mod xpath;

pub use snapshot::{PublishedSnapshot, SnapshotCache, SnapshotError, SnapshotResult};
pub use xpath::{XPathExpression, XPathNavigator};

/// Result type for cache reads.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache read errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Path expression cannot be parsed.
    InvalidXPath { expression: String, message: String },
    /// Path expression references a variable the caller did not bind.
    UndefinedVariable { expression: String, name: String },
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidXPath {
                expression,
                message,
            } => write!(f, "invalid path expression `{expression}`: {message}"),
            Self::UndefinedVariable { expression, name } => {
                write!(f, "path expression `{expression}` uses undefined variable `${name}`")
            }
        }
    }
}

impl Error for CacheError {}

/// Named value bound to `$name` inside a path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPathVariable {
    pub name: String,
    pub value: String,
}

impl XPathVariable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Textual or precompiled path expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum XPathQuery<'a> {
    Text(&'a str),
    Compiled(&'a XPathExpression),
}

impl XPathQuery<'_> {
    /// Source text, used for logging and error messages.
    pub fn source(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Compiled(expr) => expr.source(),
        }
    }
}

impl<'a> From<&'a str> for XPathQuery<'a> {
    fn from(value: &'a str) -> Self {
        Self::Text(value)
    }
}

impl<'a> From<&'a String> for XPathQuery<'a> {
    fn from(value: &'a String) -> Self {
        Self::Text(value.as_str())
    }
}

impl<'a> From<&'a XPathExpression> for XPathQuery<'a> {
    fn from(value: &'a XPathExpression) -> Self {
        Self::Compiled(value)
    }
}

/// Read-only, point-in-time view of one published tree.
pub trait PublishedCache: Send + Sync {
    /// Tree this cache serves.
    fn kind(&self) -> ItemKind;
    /// Loads one item by integer id.
    fn get_by_id(&self, id: i32) -> CacheResult<Option<PublishedItemRef>>;
    /// Loads one item by GUID key.
    fn get_by_key(&self, key: Uuid) -> CacheResult<Option<PublishedItemRef>>;
    /// Lists top-level items in sibling order.
    fn get_at_root(&self) -> CacheResult<Vec<PublishedItemRef>>;
    /// Returns the first match of a path expression in document order.
    fn get_single_by_xpath(
        &self,
        xpath: XPathQuery<'_>,
        vars: &[XPathVariable],
    ) -> CacheResult<Option<PublishedItemRef>>;
    /// Returns every match of a path expression in document order.
    fn get_by_xpath(
        &self,
        xpath: XPathQuery<'_>,
        vars: &[XPathVariable],
    ) -> CacheResult<Vec<PublishedItemRef>>;

    /// Resolves any identifier form.
    ///
    /// A universal id that is not GUID-based is a miss, not an error.
    fn resolve(&self, id: &ItemId) -> CacheResult<Option<PublishedItemRef>> {
        match id {
            ItemId::Int(id) => self.get_by_id(*id),
            ItemId::Guid(key) => self.get_by_key(*key),
            ItemId::Udi(udi) => match udi.as_guid() {
                Some(key) => self.get_by_key(key),
                None => Ok(None),
            },
        }
    }
}
