//! Published item read model.
//!
//! # Responsibility
//! - Describe one published content or media node as seen by readers.
//! - Expose index-friendly accessors used by search projections.
//!
//! # Invariants
//! - `id` is assigned at publish time and is never reused.
//! - `key` is stable across republishes of the same entity.
//! - `level` and `path` are derived by snapshot construction, never by callers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Shared handle to an item owned by a snapshot.
pub type PublishedItemRef = Arc<PublishedItem>;

/// Which published tree an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Document from the content tree.
    Content,
    /// Media item from the media tree.
    Media,
}

impl ItemKind {
    /// Stable string used in logs and snapshot files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Media => "media",
        }
    }
}

/// One published node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedItem {
    /// Integer id assigned at publish time.
    pub id: i32,
    /// Stable GUID identity.
    pub key: Uuid,
    pub kind: ItemKind,
    /// Parent item id. `None` means top-level item.
    #[serde(default)]
    pub parent_id: Option<i32>,
    /// Display name (`nodeName`).
    pub name: String,
    /// URL segment (`urlName`).
    #[serde(default)]
    pub url_name: String,
    /// Content type alias, also the element name in path expressions.
    pub content_type: String,
    /// Order among siblings.
    #[serde(default)]
    pub sort_order: i64,
    /// Depth below the virtual root, starting at 1 for top-level items.
    #[serde(default)]
    pub level: u32,
    /// Comma-joined ancestor-or-self ids, starting with `-1`.
    #[serde(default)]
    pub path: String,
    /// Published property values keyed by property alias.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl PublishedItem {
    /// Creates a top-level item with no properties.
    pub fn new(
        id: i32,
        key: Uuid,
        kind: ItemKind,
        content_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            id,
            key,
            kind,
            parent_id: None,
            url_name: url_segment(&name),
            name,
            content_type: content_type.into(),
            sort_order: 0,
            level: 0,
            path: String::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Sets the parent id.
    pub fn with_parent(mut self, parent_id: i32) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Sets the sibling sort order.
    pub fn with_sort_order(mut self, sort_order: i64) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// Adds or replaces one property value.
    pub fn with_property(mut self, alias: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(alias.into(), value.into());
        self
    }

    /// Returns one property value by alias.
    pub fn property(&self, alias: &str) -> Option<&str> {
        self.properties.get(alias).map(String::as_str)
    }
}

fn url_segment(name: &str) -> String {
    name.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::{ItemKind, PublishedItem};
    use uuid::Uuid;

    #[test]
    fn new_item_derives_url_name_from_name() {
        let item = PublishedItem::new(1, Uuid::new_v4(), ItemKind::Content, "page", "About  Us");
        assert_eq!(item.url_name, "about-us");
        assert!(item.parent_id.is_none());
    }

    #[test]
    fn deserializes_minimal_item_with_defaults() {
        let item: PublishedItem = serde_json::from_str(
            r#"{
                "id": 1050,
                "key": "6a1f2c3d-0000-4000-8000-000000000001",
                "kind": "media",
                "name": "Logo",
                "content_type": "image"
            }"#,
        )
        .expect("minimal item should deserialize");
        assert_eq!(item.kind, ItemKind::Media);
        assert_eq!(item.sort_order, 0);
        assert!(item.properties.is_empty());
    }
}
