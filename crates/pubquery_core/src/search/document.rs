//! Index document projection of published items.

use crate::model::item::PublishedItem;
use std::collections::BTreeMap;

/// Index field holding the item name.
pub const NODE_NAME_FIELD: &str = "nodeName";

/// Field values indexed for one published item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDocument {
    pub id: i32,
    pub fields: BTreeMap<String, String>,
}

impl IndexDocument {
    pub fn new(id: i32) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Projects `nodeName` plus every property of `item`.
    pub fn from_item(item: &PublishedItem) -> Self {
        let mut document = Self::new(item.id).with_field(NODE_NAME_FIELD, item.name.clone());
        for (alias, value) in &item.properties {
            document.fields.insert(alias.clone(), value.clone());
        }
        document
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::IndexDocument;
    use crate::model::item::{ItemKind, PublishedItem};
    use uuid::Uuid;

    #[test]
    fn from_item_projects_name_and_properties() {
        let item = PublishedItem::new(7, Uuid::new_v4(), ItemKind::Content, "page", "Hello")
            .with_property("bodyText", "world");
        let document = IndexDocument::from_item(&item);
        assert_eq!(document.id, 7);
        assert_eq!(document.field("nodeName"), Some("Hello"));
        assert_eq!(document.field("bodyText"), Some("world"));
    }
}
