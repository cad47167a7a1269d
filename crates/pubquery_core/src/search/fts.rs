//! SQLite FTS5-backed search provider.
//!
//! # Responsibility
//! - Keep one FTS5 column per searchable field.
//! - Render criteria into FTS5 MATCH expressions.
//! - Return ranked hits with the global match count.
//!
//! # Invariants
//! - Result ordering is deterministic by `bm25` then `node_id`.
//! - Only trailing wildcards are expressible; other wildcard shapes are
//!   rejected as invalid queries.

use crate::db::{open_index_db, open_index_db_in_memory, DbError};
use crate::search::criteria::{Examineness, FieldGroup, SearchCriteria, SearchValue};
use crate::search::document::IndexDocument;
use crate::search::provider::{SearchHit, SearchHits, SearchProvider};
use crate::search::{SearchError, SearchResult};
use log::{debug, error};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

const FTS_TABLE: &str = "published_fts";
const ID_COLUMN: &str = "node_id";
const RESERVED_FIELDS: &[&str] = &[ID_COLUMN, FTS_TABLE, "rank", "and", "or", "not", "near"];

static FIELD_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").expect("field name pattern is valid"));

/// Full-text provider over a SQLite FTS5 table.
pub struct FtsIndex {
    name: String,
    fields: Vec<String>,
    conn: Mutex<Connection>,
}

impl FtsIndex {
    /// Opens an in-memory index with one column per field.
    pub fn open_in_memory<F: AsRef<str>>(name: impl Into<String>, fields: &[F]) -> SearchResult<Self> {
        let conn = open_index_db_in_memory()?;
        Self::with_connection(conn, name, fields)
    }

    /// Opens (or creates) a file-backed index.
    ///
    /// An existing table must have exactly the requested field columns.
    pub fn open<F: AsRef<str>>(
        path: impl AsRef<Path>,
        name: impl Into<String>,
        fields: &[F],
    ) -> SearchResult<Self> {
        let conn = open_index_db(path)?;
        Self::with_connection(conn, name, fields)
    }

    fn with_connection<F: AsRef<str>>(
        conn: Connection,
        name: impl Into<String>,
        fields: &[F],
    ) -> SearchResult<Self> {
        let fields = validate_fields(fields)?;
        ensure_fts_table(&conn, &fields)?;
        Ok(Self {
            name: name.into(),
            fields,
            conn: Mutex::new(conn),
        })
    }

    /// Adds or replaces one document.
    pub fn index(&self, document: &IndexDocument) -> SearchResult<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        write_document(&conn, &self.fields, document)
    }

    /// Adds or replaces many documents in one transaction.
    pub fn index_all<'a>(
        &self,
        documents: impl IntoIterator<Item = &'a IndexDocument>,
    ) -> SearchResult<()> {
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = conn.transaction()?;
        for document in documents {
            write_document(&tx, &self.fields, document)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Removes one document; returns whether it existed.
    pub fn remove(&self, id: i32) -> SearchResult<bool> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let changed = conn.execute(
            &format!("DELETE FROM {FTS_TABLE} WHERE {ID_COLUMN} = ?1;"),
            params![i64::from(id)],
        )?;
        Ok(changed > 0)
    }

    fn render_match(&self, criteria: &SearchCriteria) -> SearchResult<String> {
        let mut clauses = Vec::with_capacity(criteria.groups().len());
        for group in criteria.groups() {
            clauses.push(self.render_group(group)?);
        }
        Ok(clauses.join(" AND "))
    }

    fn render_group(&self, group: &FieldGroup) -> SearchResult<String> {
        for field in group.fields() {
            if !self.fields.iter().any(|known| known == field) {
                return Err(SearchError::InvalidQuery {
                    query: field.clone(),
                    message: format!("field is not indexed by provider `{}`", self.name),
                });
            }
        }
        let columns = group.fields().join(" ");
        Ok(format!("({{{columns}}} : {})", render_value(group.value())?))
    }
}

impl SearchProvider for FtsIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn searchable_fields(&self) -> Vec<String> {
        self.fields.clone()
    }

    fn supports_bounded_top_n(&self) -> bool {
        true
    }

    fn search(
        &self,
        criteria: &SearchCriteria,
        max_results: Option<usize>,
    ) -> SearchResult<SearchHits> {
        if criteria.is_empty() {
            return Ok(SearchHits::empty());
        }

        let started_at = Instant::now();
        let match_expr = self.render_match(criteria)?;
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);

        let total: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {FTS_TABLE} WHERE {FTS_TABLE} MATCH ?1;"),
                [&match_expr],
                |row| row.get(0),
            )
            .map_err(|err| map_query_error(err, &match_expr))?;

        let limit = max_results.map_or(-1, |limit| i64::try_from(limit).unwrap_or(i64::MAX));
        let mut stmt = conn.prepare(&format!(
            "SELECT {ID_COLUMN} AS node_id, bm25({FTS_TABLE}) AS score
             FROM {FTS_TABLE}
             WHERE {FTS_TABLE} MATCH ?1
             ORDER BY score ASC, node_id ASC
             LIMIT ?2;"
        ))?;
        let mut rows = stmt
            .query(params_from_iter([
                Value::Text(match_expr.clone()),
                Value::Integer(limit),
            ]))
            .map_err(|err| map_query_error(err, &match_expr))?;

        let mut hits = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|err| map_query_error(err, &match_expr))?
        {
            let raw_id: i64 = row.get("node_id")?;
            let id = i32::try_from(raw_id)
                .map_err(|_| SearchError::InvalidData(format!("invalid node id `{raw_id}`")))?;
            let bm25: f64 = row.get("score")?;
            hits.push(SearchHit {
                id,
                score: -bm25 as f32,
            });
        }

        let total_item_count = usize::try_from(total)
            .map_err(|_| SearchError::InvalidData(format!("invalid match count `{total}`")))?;
        debug!(
            "event=index_search module=search status=ok provider={} groups={} total={} returned={} duration_ms={}",
            self.name,
            criteria.groups().len(),
            total_item_count,
            hits.len(),
            started_at.elapsed().as_millis()
        );
        Ok(SearchHits {
            hits,
            total_item_count,
        })
    }
}

fn validate_fields<F: AsRef<str>>(fields: &[F]) -> SearchResult<Vec<String>> {
    let mut validated: Vec<String> = Vec::with_capacity(fields.len());
    for field in fields {
        let field = field.as_ref().trim();
        let lowered = field.to_ascii_lowercase();
        if !FIELD_NAME.is_match(field) || RESERVED_FIELDS.contains(&lowered.as_str()) {
            return Err(SearchError::InvalidField(field.to_string()));
        }
        if validated
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(field))
        {
            return Err(SearchError::InvalidField(field.to_string()));
        }
        validated.push(field.to_string());
    }
    if validated.is_empty() {
        return Err(SearchError::InvalidField(
            "an FTS index needs at least one field".to_string(),
        ));
    }
    Ok(validated)
}

fn ensure_fts_table(conn: &Connection, fields: &[String]) -> SearchResult<()> {
    if table_exists(conn, FTS_TABLE)? {
        let mut expected = vec![ID_COLUMN.to_string()];
        expected.extend(fields.iter().cloned());
        let actual = table_columns(conn, FTS_TABLE)?;
        if actual != expected {
            return Err(DbError::SchemaMismatch {
                table: FTS_TABLE.to_string(),
                message: format!("expected columns {expected:?}, found {actual:?}"),
            }
            .into());
        }
        return Ok(());
    }

    let columns = fields.join(", ");
    conn.execute_batch(&format!(
        "CREATE VIRTUAL TABLE {FTS_TABLE} USING fts5({ID_COLUMN} UNINDEXED, {columns}, tokenize = 'unicode61');"
    ))
    .map_err(|err| {
        error!(
            "event=fts_create module=search status=error error_code=fts_create_failed error={}",
            err
        );
        SearchError::from(err)
    })?;
    Ok(())
}

fn write_document(conn: &Connection, fields: &[String], document: &IndexDocument) -> SearchResult<()> {
    conn.execute(
        &format!("DELETE FROM {FTS_TABLE} WHERE {ID_COLUMN} = ?1;"),
        params![i64::from(document.id)],
    )?;

    let placeholders = (1..=fields.len() + 1)
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {FTS_TABLE} ({ID_COLUMN}, {}) VALUES ({placeholders});",
        fields.join(", ")
    );
    let mut values = vec![Value::Integer(i64::from(document.id))];
    values.extend(
        fields
            .iter()
            .map(|field| Value::Text(document.field(field).unwrap_or_default().to_string())),
    );
    conn.execute(&sql, params_from_iter(values))?;
    Ok(())
}

fn render_value(value: &SearchValue) -> SearchResult<String> {
    match value.examineness {
        Examineness::Explicit => Ok(escape_fts_term(&value.value)),
        Examineness::ComplexWildcard => {
            let stem = value.value.trim_end_matches('*');
            if stem.contains(['*', '?']) {
                return Err(SearchError::InvalidQuery {
                    query: value.value.clone(),
                    message: "only trailing `*` wildcards are supported".to_string(),
                });
            }
            if stem.trim().is_empty() {
                return Err(SearchError::InvalidQuery {
                    query: value.value.clone(),
                    message: "wildcard needs at least one leading character".to_string(),
                });
            }
            if stem.len() == value.value.len() {
                return Ok(escape_fts_term(stem));
            }
            Ok(format!("{} *", escape_fts_term(stem)))
        }
    }
}

fn escape_fts_term(raw: &str) -> String {
    let escaped = raw.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

fn map_query_error(err: rusqlite::Error, query: &str) -> SearchError {
    if is_match_syntax_error(&err) {
        return SearchError::InvalidQuery {
            query: query.to_string(),
            message: err.to_string(),
        };
    }

    SearchError::Db(DbError::Sqlite(err))
}

fn is_match_syntax_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
                || msg.contains("no such column")
        }
        _ => false,
    }
}

fn table_exists(conn: &Connection, table: &str) -> SearchResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> SearchResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::{render_value, FtsIndex};
    use crate::search::criteria::SearchValue;
    use crate::search::SearchError;

    #[test]
    fn renders_prefix_and_explicit_values() {
        assert_eq!(render_value(&SearchValue::explicit("a\"b")).unwrap(), "\"a\"\"b\"");
        assert_eq!(render_value(&SearchValue::prefix("foo")).unwrap(), "\"foo\" *");
    }

    #[test]
    fn rejects_leading_or_inner_wildcards() {
        let mut value = SearchValue::prefix("foo");
        value.value = "*foo".to_string();
        assert!(matches!(
            render_value(&value),
            Err(SearchError::InvalidQuery { .. })
        ));
        value.value = "f?o*".to_string();
        assert!(matches!(
            render_value(&value),
            Err(SearchError::InvalidQuery { .. })
        ));
    }

    #[test]
    fn rejects_reserved_or_malformed_field_names() {
        for fields in [vec!["rank"], vec!["node_id"], vec!["body text"], vec!["a", "A"]] {
            let result = FtsIndex::open_in_memory("internal", &fields);
            assert!(
                matches!(result, Err(SearchError::InvalidField(_))),
                "{fields:?} should be rejected"
            );
        }
    }
}
