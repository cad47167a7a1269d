//! Universal identifiers (`umb://<entity-type>/<value>`).
//!
//! # Responsibility
//! - Parse and format universal ids.
//! - Keep the entity-type to identifier-kind table in one place.
//!
//! # Invariants
//! - GUID-based entity types always carry a `Uuid`.
//! - String-based entity types always carry a non-empty string value.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

const UDI_SCHEME: &str = "umb://";

/// How an entity type identifies its entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UdiKind {
    /// Identified by a GUID.
    Guid,
    /// Identified by an opaque string, usually a file path.
    String,
}

const ENTITY_TYPES: &[(&str, UdiKind)] = &[
    ("document", UdiKind::Guid),
    ("document-type", UdiKind::Guid),
    ("document-blueprint", UdiKind::Guid),
    ("media", UdiKind::Guid),
    ("media-type", UdiKind::Guid),
    ("member", UdiKind::Guid),
    ("member-type", UdiKind::Guid),
    ("member-group", UdiKind::Guid),
    ("data-type", UdiKind::Guid),
    ("dictionary-item", UdiKind::Guid),
    ("relation-type", UdiKind::Guid),
    ("template", UdiKind::Guid),
    ("element", UdiKind::Guid),
    ("media-file", UdiKind::String),
    ("stylesheet", UdiKind::String),
    ("script", UdiKind::String),
    ("partial-view", UdiKind::String),
    ("partial-view-macro", UdiKind::String),
    ("macro-script", UdiKind::String),
];

/// Returns the identifier kind for a known entity type.
pub fn entity_type_kind(entity_type: &str) -> Option<UdiKind> {
    ENTITY_TYPES
        .iter()
        .find(|(name, _)| *name == entity_type)
        .map(|(_, kind)| *kind)
}

/// Universal id: an entity type discriminator plus a GUID or string value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Udi {
    Guid { entity_type: String, guid: Uuid },
    String { entity_type: String, value: String },
}

impl Udi {
    /// Creates a GUID-based universal id.
    pub fn guid(entity_type: &str, guid: Uuid) -> UdiResult<Self> {
        match entity_type_kind(entity_type) {
            Some(UdiKind::Guid) => Ok(Self::Guid {
                entity_type: entity_type.to_string(),
                guid,
            }),
            Some(UdiKind::String) => Err(UdiParseError::KindMismatch {
                entity_type: entity_type.to_string(),
                expected: UdiKind::String,
            }),
            None => Err(UdiParseError::UnknownEntityType(entity_type.to_string())),
        }
    }

    /// Creates a string-based universal id.
    pub fn string(entity_type: &str, value: impl Into<String>) -> UdiResult<Self> {
        let value = value.into();
        match entity_type_kind(entity_type) {
            Some(UdiKind::String) if value.trim().is_empty() => {
                Err(UdiParseError::MissingValue(entity_type.to_string()))
            }
            Some(UdiKind::String) => Ok(Self::String {
                entity_type: entity_type.to_string(),
                value,
            }),
            Some(UdiKind::Guid) => Err(UdiParseError::KindMismatch {
                entity_type: entity_type.to_string(),
                expected: UdiKind::Guid,
            }),
            None => Err(UdiParseError::UnknownEntityType(entity_type.to_string())),
        }
    }

    /// Parses `umb://<entity-type>/<value>`.
    pub fn parse(text: &str) -> UdiResult<Self> {
        let trimmed = text.trim();
        let rest = trimmed
            .strip_prefix(UDI_SCHEME)
            .ok_or_else(|| UdiParseError::InvalidScheme(trimmed.to_string()))?;
        let (entity_type, value) = rest.split_once('/').unwrap_or((rest, ""));
        if value.is_empty() {
            return Err(UdiParseError::MissingValue(entity_type.to_string()));
        }

        match entity_type_kind(entity_type) {
            Some(UdiKind::Guid) => {
                let guid = Uuid::try_parse(value).map_err(|_| UdiParseError::InvalidGuid {
                    entity_type: entity_type.to_string(),
                    value: value.to_string(),
                })?;
                Self::guid(entity_type, guid)
            }
            Some(UdiKind::String) => Self::string(entity_type, value),
            None => Err(UdiParseError::UnknownEntityType(entity_type.to_string())),
        }
    }

    pub fn entity_type(&self) -> &str {
        match self {
            Self::Guid { entity_type, .. } | Self::String { entity_type, .. } => entity_type,
        }
    }

    pub fn kind(&self) -> UdiKind {
        match self {
            Self::Guid { .. } => UdiKind::Guid,
            Self::String { .. } => UdiKind::String,
        }
    }

    /// Returns the GUID for GUID-based ids, `None` otherwise.
    pub fn as_guid(&self) -> Option<Uuid> {
        match self {
            Self::Guid { guid, .. } => Some(*guid),
            Self::String { .. } => None,
        }
    }
}

impl Display for Udi {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Guid { entity_type, guid } => {
                write!(f, "{UDI_SCHEME}{entity_type}/{}", guid.simple())
            }
            Self::String { entity_type, value } => write!(f, "{UDI_SCHEME}{entity_type}/{value}"),
        }
    }
}

impl FromStr for Udi {
    type Err = UdiParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Universal id parse/construction errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UdiParseError {
    InvalidScheme(String),
    UnknownEntityType(String),
    MissingValue(String),
    InvalidGuid { entity_type: String, value: String },
    KindMismatch { entity_type: String, expected: UdiKind },
}

impl Display for UdiParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidScheme(value) => write!(f, "universal id must start with `{UDI_SCHEME}`: {value}"),
            Self::UnknownEntityType(value) => write!(f, "unknown universal id entity type: {value}"),
            Self::MissingValue(entity_type) => {
                write!(f, "universal id for `{entity_type}` has no value")
            }
            Self::InvalidGuid { entity_type, value } => {
                write!(f, "universal id for `{entity_type}` has invalid guid `{value}`")
            }
            Self::KindMismatch {
                entity_type,
                expected,
            } => write!(
                f,
                "entity type `{entity_type}` is identified by {}",
                match expected {
                    UdiKind::Guid => "guid",
                    UdiKind::String => "string",
                }
            ),
        }
    }
}

impl Error for UdiParseError {}

pub type UdiResult<T> = Result<T, UdiParseError>;
