//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by index behavior.
//!
//! # Invariants
//! - Returned connections have a busy timeout set.

use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Opens a SQLite index database file.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_index_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with("file", || Connection::open(path))
}

/// Opens an in-memory SQLite index database.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_index_db_in_memory() -> DbResult<Connection> {
    open_with("memory", Connection::open_in_memory)
}

fn open_with(
    mode: &str,
    open: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let conn = match open() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&conn) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err.into())
        }
    }
}

fn bootstrap_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{open_index_db, open_index_db_in_memory};

    #[test]
    fn in_memory_connection_supports_fts5() {
        let conn = open_index_db_in_memory().expect("in-memory db should open");
        conn.execute_batch("CREATE VIRTUAL TABLE docs USING fts5(body);")
            .expect("bundled sqlite should ship fts5");
    }

    #[test]
    fn file_connection_creates_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("index.sqlite3");
        let conn = open_index_db(&path).expect("file db should open");
        conn.execute_batch("CREATE TABLE docs (id INTEGER);")
            .expect("file db should be writable");
        assert!(path.exists());
    }
}
