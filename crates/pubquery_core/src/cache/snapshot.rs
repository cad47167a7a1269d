//! Immutable in-memory published snapshot.
//!
//! # Responsibility
//! - Validate a flat item list into a navigable tree once, at build time.
//! - Serve id/key/root/path lookups without further allocation of items.
//!
//! # Invariants
//! - Items are stored in document (pre-order) order; sibling order is
//!   `sort_order ASC, id ASC`.
//! - `level` and `path` of stored items are derived from the tree.
//! - A built snapshot never changes; a new publish builds a new snapshot.

use crate::cache::xpath::{XPathExpression, XPathNavigator};
use crate::cache::{CacheResult, PublishedCache, XPathQuery, XPathVariable};
use crate::model::item::{ItemKind, PublishedItem, PublishedItemRef};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

static ELEMENT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new("^[A-Za-z_][A-Za-z0-9_-]*$").expect("element name pattern is valid")
});

/// Snapshot build/load errors.
#[derive(Debug)]
pub enum SnapshotError {
    DuplicateId(i32),
    DuplicateKey(Uuid),
    KindMismatch { id: i32, expected: ItemKind },
    MissingParent { id: i32, parent_id: i32 },
    ParentCycle(i32),
    InvalidContentType { id: i32, content_type: String },
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateId(id) => write!(f, "duplicate item id {id} in snapshot"),
            Self::DuplicateKey(key) => write!(f, "duplicate item key {key} in snapshot"),
            Self::KindMismatch { id, expected } => {
                write!(f, "item {id} does not belong to the {} cache", expected.as_str())
            }
            Self::MissingParent { id, parent_id } => {
                write!(f, "item {id} references missing parent {parent_id}")
            }
            Self::ParentCycle(id) => write!(f, "item {id} is part of a parent cycle"),
            Self::InvalidContentType { id, content_type } => write!(
                f,
                "item {id} has content type `{content_type}` which is not a valid element name"
            ),
            Self::Io(err) => write!(f, "failed to read snapshot: {err}"),
            Self::Json(err) => write!(f, "failed to parse snapshot: {err}"),
        }
    }
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SnapshotError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// In-memory cache over one published tree.
#[derive(Debug)]
pub struct SnapshotCache {
    kind: ItemKind,
    items: Vec<PublishedItemRef>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    top: Vec<usize>,
    by_id: HashMap<i32, usize>,
    by_key: HashMap<Uuid, usize>,
}

impl SnapshotCache {
    /// Builds a snapshot from a flat item list in any order.
    pub fn build(kind: ItemKind, items: Vec<PublishedItem>) -> SnapshotResult<Self> {
        let mut position_by_id = HashMap::with_capacity(items.len());
        let mut seen_keys = HashMap::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            if item.kind != kind {
                return Err(SnapshotError::KindMismatch {
                    id: item.id,
                    expected: kind,
                });
            }
            if !ELEMENT_NAME.is_match(&item.content_type) {
                return Err(SnapshotError::InvalidContentType {
                    id: item.id,
                    content_type: item.content_type.clone(),
                });
            }
            if position_by_id.insert(item.id, position).is_some() {
                return Err(SnapshotError::DuplicateId(item.id));
            }
            if seen_keys.insert(item.key, item.id).is_some() {
                return Err(SnapshotError::DuplicateKey(item.key));
            }
        }

        let mut roots = Vec::new();
        let mut child_positions: HashMap<i32, Vec<usize>> = HashMap::new();
        for (position, item) in items.iter().enumerate() {
            match item.parent_id {
                None => roots.push(position),
                Some(parent_id) if parent_id == item.id => {
                    return Err(SnapshotError::ParentCycle(item.id))
                }
                Some(parent_id) if !position_by_id.contains_key(&parent_id) => {
                    return Err(SnapshotError::MissingParent {
                        id: item.id,
                        parent_id,
                    })
                }
                Some(parent_id) => child_positions.entry(parent_id).or_default().push(position),
            }
        }

        let sibling_order = |position: &usize| (items[*position].sort_order, items[*position].id);
        roots.sort_by_key(sibling_order);
        for siblings in child_positions.values_mut() {
            siblings.sort_by_key(sibling_order);
        }

        let mut ordered: Vec<PublishedItemRef> = Vec::with_capacity(items.len());
        let mut parents = Vec::with_capacity(items.len());
        let mut children: Vec<Vec<usize>> = Vec::with_capacity(items.len());
        let mut top = Vec::with_capacity(roots.len());

        // (source position, parent index in `ordered`)
        let mut stack: Vec<(usize, Option<usize>)> =
            roots.iter().rev().map(|position| (*position, None)).collect();
        while let Some((position, parent_index)) = stack.pop() {
            let index = ordered.len();
            let mut item = items[position].clone();
            match parent_index {
                Some(parent_index) => {
                    let parent: &PublishedItem = &ordered[parent_index];
                    item.level = parent.level + 1;
                    item.path = format!("{},{}", parent.path, item.id);
                    children[parent_index].push(index);
                }
                None => {
                    item.level = 1;
                    item.path = format!("-1,{}", item.id);
                    top.push(index);
                }
            }

            if let Some(child_list) = child_positions.get(&item.id) {
                stack.extend(child_list.iter().rev().map(|child| (*child, Some(index))));
            }
            ordered.push(Arc::new(item));
            parents.push(parent_index);
            children.push(Vec::new());
        }

        if ordered.len() != items.len() {
            let reached: std::collections::HashSet<i32> =
                ordered.iter().map(|item| item.id).collect();
            let orphan = items
                .iter()
                .find(|item| !reached.contains(&item.id))
                .map_or(0, |item| item.id);
            return Err(SnapshotError::ParentCycle(orphan));
        }

        let by_id = ordered
            .iter()
            .enumerate()
            .map(|(index, item)| (item.id, index))
            .collect();
        let by_key = ordered
            .iter()
            .enumerate()
            .map(|(index, item)| (item.key, index))
            .collect();

        debug!(
            "event=snapshot_build module=cache status=ok kind={} items={} roots={}",
            kind.as_str(),
            ordered.len(),
            top.len()
        );

        Ok(Self {
            kind,
            items: ordered,
            parents,
            children,
            top,
            by_id,
            by_key,
        })
    }

    /// Number of items in this snapshot.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates items in document order.
    pub fn iter(&self) -> impl Iterator<Item = &PublishedItemRef> {
        self.items.iter()
    }

    fn select(
        &self,
        xpath: XPathQuery<'_>,
        vars: &[XPathVariable],
    ) -> CacheResult<Vec<usize>> {
        let compiled;
        let expr = match xpath {
            XPathQuery::Compiled(expr) => expr,
            XPathQuery::Text(text) => {
                compiled = XPathExpression::compile(text)?;
                &compiled
            }
        };
        let selected = expr.evaluate(self, vars)?;
        debug!(
            "event=xpath_select module=cache status=ok kind={} matches={}",
            self.kind.as_str(),
            selected.len()
        );
        Ok(selected)
    }
}

impl XPathNavigator for SnapshotCache {
    fn top_level(&self) -> &[usize] {
        &self.top
    }

    fn children(&self, index: usize) -> &[usize] {
        &self.children[index]
    }

    fn parent(&self, index: usize) -> Option<usize> {
        self.parents[index]
    }

    fn item(&self, index: usize) -> &PublishedItem {
        &self.items[index]
    }
}

impl PublishedCache for SnapshotCache {
    fn kind(&self) -> ItemKind {
        self.kind
    }

    fn get_by_id(&self, id: i32) -> CacheResult<Option<PublishedItemRef>> {
        Ok(self.by_id.get(&id).map(|index| self.items[*index].clone()))
    }

    fn get_by_key(&self, key: Uuid) -> CacheResult<Option<PublishedItemRef>> {
        Ok(self.by_key.get(&key).map(|index| self.items[*index].clone()))
    }

    fn get_at_root(&self) -> CacheResult<Vec<PublishedItemRef>> {
        Ok(self
            .top
            .iter()
            .map(|index| self.items[*index].clone())
            .collect())
    }

    fn get_single_by_xpath(
        &self,
        xpath: XPathQuery<'_>,
        vars: &[XPathVariable],
    ) -> CacheResult<Option<PublishedItemRef>> {
        Ok(self
            .select(xpath, vars)?
            .first()
            .map(|index| self.items[*index].clone()))
    }

    fn get_by_xpath(
        &self,
        xpath: XPathQuery<'_>,
        vars: &[XPathVariable],
    ) -> CacheResult<Vec<PublishedItemRef>> {
        Ok(self
            .select(xpath, vars)?
            .into_iter()
            .map(|index| self.items[index].clone())
            .collect())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SnapshotFile {
    #[serde(default)]
    content: Vec<PublishedItem>,
    #[serde(default)]
    media: Vec<PublishedItem>,
}

/// Content and media caches published together.
#[derive(Debug, Clone)]
pub struct PublishedSnapshot {
    pub content: Arc<SnapshotCache>,
    pub media: Arc<SnapshotCache>,
}

impl PublishedSnapshot {
    /// Builds both caches from item lists.
    pub fn build(
        content: Vec<PublishedItem>,
        media: Vec<PublishedItem>,
    ) -> SnapshotResult<Self> {
        Ok(Self {
            content: Arc::new(SnapshotCache::build(ItemKind::Content, content)?),
            media: Arc::new(SnapshotCache::build(ItemKind::Media, media)?),
        })
    }

    /// Parses `{ "content": [...], "media": [...] }`.
    pub fn from_json_str(json: &str) -> SnapshotResult<Self> {
        let file: SnapshotFile = serde_json::from_str(json)?;
        Self::build(file.content, file.media)
    }

    /// Reads and parses a snapshot file.
    pub fn load(path: impl AsRef<Path>) -> SnapshotResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
