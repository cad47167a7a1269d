//! Identifier forms accepted by item lookups.

use crate::model::udi::Udi;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Closed set of ways to name one published item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemId {
    /// Integer id assigned at publish time.
    Int(i32),
    /// Stable GUID key.
    Guid(Uuid),
    /// Universal id; only GUID-based universal ids can resolve.
    Udi(Udi),
}

impl From<i32> for ItemId {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<Uuid> for ItemId {
    fn from(value: Uuid) -> Self {
        Self::Guid(value)
    }
}

impl From<Udi> for ItemId {
    fn from(value: Udi) -> Self {
        Self::Udi(value)
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Guid(key) => write!(f, "{key}"),
            Self::Udi(udi) => write!(f, "{udi}"),
        }
    }
}
