//! SQLite connection bootstrap for index storage.
//!
//! # Responsibility
//! - Open and configure SQLite connections used by the FTS provider.
//! - Describe storage-level failures with one error type.
//!
//! # Invariants
//! - Index code must not read or write through a connection that was not
//!   opened by this module.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;

pub use open::{open_index_db, open_index_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// An existing table does not have the layout this binary expects.
    SchemaMismatch {
        table: String,
        message: String,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::SchemaMismatch { table, message } => {
                write!(f, "table `{table}` has unexpected layout: {message}")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::SchemaMismatch { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
