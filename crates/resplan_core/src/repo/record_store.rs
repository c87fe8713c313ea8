//! Flat record table contract and SQLite implementation.
//!
//! # Responsibility
//! - Load fixed-schema tables even when the backing table is missing,
//!   empty, or lacks columns.
//! - Save whole tables as one atomic overwrite guarded by a revision counter.
//!
//! # Invariants
//! - `load(schema)` returns exactly `schema` columns, in order.
//! - A missing backing table loads as empty; corrupt values are errors.
//! - Every successful save bumps the table revision by one.
//! - A save with a stale expected revision writes nothing.

use crate::db::DbError;
use crate::model::entry::EntryValidationError;
use log::{info, warn};
use rusqlite::types::ValueRef;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Transaction, TransactionBehavior,
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Instant;

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors raised by record stores and table conversions.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// File-backed store could not be read or written.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Stored data exists but cannot be interpreted.
    InvalidData(String),
    /// Entry rejected before persistence.
    Validation(EntryValidationError),
    /// Another writer saved since the caller's snapshot was loaded.
    StaleRevision { expected: u64, actual: u64 },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Io { path, source } => {
                write!(f, "record store io error at `{}`: {source}", path.display())
            }
            Self::InvalidData(message) => write!(f, "invalid stored record data: {message}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::StaleRevision { expected, actual } => write!(
                f,
                "record store revision changed: expected {expected}, found {actual}"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Validation(err) => Some(err),
            Self::InvalidData(_) | Self::StaleRevision { .. } => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<EntryValidationError> for RepoError {
    fn from(value: EntryValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Ordered columns plus rows of optional text cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RecordTable {
    /// Creates a zero-row table with exactly `schema` columns.
    pub fn empty(schema: &[&str]) -> Self {
        Self {
            columns: schema.iter().map(|column| column.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Builds a table from raw parts, rejecting ragged rows.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> RepoResult<Self> {
        if let Some(position) = rows.iter().position(|row| row.len() != columns.len()) {
            return Err(RepoError::InvalidData(format!(
                "row {position} has {} cells, expected {}",
                rows[position].len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|candidate| candidate.eq_ignore_ascii_case(column))
    }

    /// Returns the cell text at `(row, column)`, `None` for nulls and
    /// unknown columns.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows
            .get(row)
            .and_then(|cells| cells.get(index))
            .and_then(|cell| cell.as_deref())
    }

    /// Appends one row whose cells follow `columns()` order.
    pub fn push_row(&mut self, row: Vec<Option<String>>) -> RepoResult<()> {
        if row.len() != self.columns.len() {
            return Err(RepoError::InvalidData(format!(
                "row has {} cells, expected {}",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Projects this table onto `schema`.
    ///
    /// Missing columns are synthesized as nulls; extra columns are dropped.
    pub fn conform(&self, schema: &[&str]) -> Self {
        let indexes: Vec<Option<usize>> = schema
            .iter()
            .map(|column| self.column_index(column))
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                indexes
                    .iter()
                    .map(|index| index.and_then(|value| row[value].clone()))
                    .collect()
            })
            .collect();
        Self {
            columns: schema.iter().map(|column| column.to_string()).collect(),
            rows,
        }
    }
}

/// Whole-table load/save contract shared by every backend.
pub trait RecordStore {
    /// Loads the table projected onto `schema`.
    fn load(&self, schema: &[&str]) -> RepoResult<RecordTable>;
    /// Returns the current revision; `0` before the first save.
    fn revision(&self) -> RepoResult<u64>;
    /// Overwrites the table unconditionally and returns the new revision.
    fn save(&self, table: &RecordTable) -> RepoResult<u64>;
    /// Overwrites the table only when the stored revision equals `expected`.
    fn save_if_revision(&self, table: &RecordTable, expected: u64) -> RepoResult<u64>;
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    fn load(&self, schema: &[&str]) -> RepoResult<RecordTable> {
        (**self).load(schema)
    }

    fn revision(&self) -> RepoResult<u64> {
        (**self).revision()
    }

    fn save(&self, table: &RecordTable) -> RepoResult<u64> {
        (**self).save(table)
    }

    fn save_if_revision(&self, table: &RecordTable, expected: u64) -> RepoResult<u64> {
        (**self).save_if_revision(table, expected)
    }
}

/// Known SQLite record tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreTable {
    Entries,
    Employees,
    Skills,
}

impl StoreTable {
    pub fn name(self) -> &'static str {
        match self {
            Self::Entries => "entries",
            Self::Employees => "employees",
            Self::Skills => "skills",
        }
    }
}

/// SQLite-backed record store for one table.
pub struct SqliteRecordStore<'conn> {
    conn: &'conn Connection,
    table: StoreTable,
}

impl<'conn> SqliteRecordStore<'conn> {
    /// Creates a store over `table`. The table itself may not exist yet.
    pub fn new(conn: &'conn Connection, table: StoreTable) -> Self {
        Self { conn, table }
    }

    pub fn table(&self) -> StoreTable {
        self.table
    }

    fn write_table(&self, table: &RecordTable, expected: Option<u64>) -> RepoResult<u64> {
        let started_at = Instant::now();
        let name = self.table.name();
        for column in table.columns() {
            ensure_identifier(column)?;
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_table_schema(&tx, name, table.columns())?;

        let actual = read_revision(&tx, name)?;
        if let Some(expected) = expected {
            if expected != actual {
                warn!(
                    "event=store_save module=repo status=error backend=sqlite table={} error_code=stale_revision expected={} actual={}",
                    name, expected, actual
                );
                return Err(RepoError::StaleRevision { expected, actual });
            }
        }

        tx.execute(&format!("DELETE FROM {name};"), [])?;
        if !table.columns().is_empty() {
            let column_list = table
                .columns()
                .iter()
                .map(|column| format!("\"{column}\""))
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = (1..=table.columns().len())
                .map(|index| format!("?{index}"))
                .collect::<Vec<_>>()
                .join(", ");
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {name} ({column_list}) VALUES ({placeholders});"
            ))?;
            for row in table.rows() {
                stmt.execute(params_from_iter(row.iter().map(|cell| cell.as_deref())))?;
            }
        }

        let next = actual + 1;
        tx.execute(
            "INSERT INTO store_revisions (table_name, revision) VALUES (?1, ?2)
             ON CONFLICT(table_name) DO UPDATE SET revision = excluded.revision;",
            params![name, to_sql_revision(next)?],
        )?;
        tx.commit()?;

        info!(
            "event=store_save module=repo status=ok backend=sqlite table={} rows={} revision={} duration_ms={}",
            name,
            table.len(),
            next,
            started_at.elapsed().as_millis()
        );
        Ok(next)
    }
}

impl RecordStore for SqliteRecordStore<'_> {
    fn load(&self, schema: &[&str]) -> RepoResult<RecordTable> {
        let name = self.table.name();
        if !table_exists(self.conn, name)? {
            info!(
                "event=store_load module=repo status=ok backend=sqlite table={} rows=0 missing=true",
                name
            );
            return Ok(RecordTable::empty(schema));
        }

        let stored_columns = table_columns(self.conn, name)?;
        let mut selected: Vec<&str> = Vec::new();
        for &column in schema {
            ensure_identifier(column)?;
            if stored_columns
                .iter()
                .any(|stored| stored.eq_ignore_ascii_case(column))
            {
                selected.push(column);
            }
        }

        let mut loaded = RecordTable::empty(&selected);
        if !selected.is_empty() {
            let column_list = selected
                .iter()
                .map(|column| format!("\"{column}\""))
                .collect::<Vec<_>>()
                .join(", ");
            let mut stmt = self
                .conn
                .prepare(&format!("SELECT {column_list} FROM {name} ORDER BY rowid ASC;"))?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let mut cells = Vec::with_capacity(selected.len());
                for (index, column) in selected.iter().enumerate() {
                    cells.push(value_to_cell(row.get_ref(index)?, name, column)?);
                }
                loaded.push_row(cells)?;
            }
        } else {
            let count: i64 =
                self.conn
                    .query_row(&format!("SELECT COUNT(*) FROM {name};"), [], |row| row.get(0))?;
            for _ in 0..count {
                loaded.push_row(Vec::new())?;
            }
        }

        let conformed = loaded.conform(schema);
        info!(
            "event=store_load module=repo status=ok backend=sqlite table={} rows={} synthesized_columns={}",
            name,
            conformed.len(),
            schema.len() - selected.len()
        );
        Ok(conformed)
    }

    fn revision(&self) -> RepoResult<u64> {
        read_revision(self.conn, self.table.name())
    }

    fn save(&self, table: &RecordTable) -> RepoResult<u64> {
        self.write_table(table, None)
    }

    fn save_if_revision(&self, table: &RecordTable, expected: u64) -> RepoResult<u64> {
        self.write_table(table, Some(expected))
    }
}

fn value_to_cell(value: ValueRef<'_>, table: &str, column: &str) -> RepoResult<Option<String>> {
    match value {
        ValueRef::Null => Ok(None),
        ValueRef::Integer(number) => Ok(Some(number.to_string())),
        ValueRef::Real(number) => Ok(Some(number.to_string())),
        ValueRef::Text(bytes) => String::from_utf8(bytes.to_vec()).map(Some).map_err(|_| {
            RepoError::InvalidData(format!("non UTF-8 text in {table}.{column}"))
        }),
        ValueRef::Blob(_) => Err(RepoError::InvalidData(format!(
            "unexpected blob value in {table}.{column}"
        ))),
    }
}

fn ensure_identifier(column: &str) -> RepoResult<()> {
    let valid = !column.is_empty()
        && column
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(RepoError::InvalidData(format!(
            "invalid record column name `{column}`"
        )))
    }
}

fn column_affinity(column: &str) -> &'static str {
    if column.eq_ignore_ascii_case("Hours") {
        "REAL"
    } else {
        "TEXT"
    }
}

fn ensure_table_schema(conn: &Connection, table: &str, columns: &[String]) -> RepoResult<()> {
    if !table_exists(conn, table)? {
        let definition = columns
            .iter()
            .map(|column| format!("\"{column}\" {}", column_affinity(column)))
            .collect::<Vec<_>>()
            .join(", ");
        conn.execute_batch(&format!("CREATE TABLE {table} ({definition});"))?;
    } else {
        let stored = table_columns(conn, table)?;
        for column in columns {
            if !stored.iter().any(|existing| existing.eq_ignore_ascii_case(column)) {
                conn.execute_batch(&format!(
                    "ALTER TABLE {table} ADD COLUMN \"{column}\" {};",
                    column_affinity(column)
                ))?;
            }
        }
    }

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS store_revisions (
            table_name TEXT PRIMARY KEY NOT NULL,
            revision INTEGER NOT NULL DEFAULT 0
        );",
    )?;
    Ok(())
}

fn read_revision(conn: &Connection, table: &str) -> RepoResult<u64> {
    if !table_exists(conn, "store_revisions")? {
        return Ok(0);
    }
    let revision: Option<i64> = conn
        .query_row(
            "SELECT revision FROM store_revisions WHERE table_name = ?1;",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    match revision {
        None => Ok(0),
        Some(value) => u64::try_from(value).map_err(|_| {
            RepoError::InvalidData(format!(
                "negative revision `{value}` in store_revisions for `{table}`"
            ))
        }),
    }
}

fn to_sql_revision(revision: u64) -> RepoResult<i64> {
    i64::try_from(revision)
        .map_err(|_| RepoError::InvalidData(format!("revision `{revision}` overflows")))
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
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

fn table_columns(conn: &Connection, table: &str) -> RepoResult<Vec<String>> {
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
    use super::{ensure_identifier, RecordTable};

    fn cell(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn conform_synthesizes_and_drops_columns() {
        let table = RecordTable::from_rows(
            vec!["Week".to_string(), "Extra".to_string(), "Employee".to_string()],
            vec![vec![cell("01-Jan"), cell("x"), cell("E1")]],
        )
        .unwrap();

        let conformed = table.conform(&["Employee", "Week", "Status"]);
        assert_eq!(conformed.columns(), ["Employee", "Week", "Status"]);
        assert_eq!(conformed.get(0, "Employee"), Some("E1"));
        assert_eq!(conformed.get(0, "Week"), Some("01-Jan"));
        assert_eq!(conformed.get(0, "Status"), None);
        assert_eq!(conformed.column_index("Extra"), None);
    }

    #[test]
    fn from_rows_rejects_ragged_rows() {
        let err = RecordTable::from_rows(vec!["A".to_string()], vec![vec![None, None]])
            .unwrap_err();
        assert!(err.to_string().contains("expected 1"));
    }

    #[test]
    fn identifiers_are_restricted() {
        assert!(ensure_identifier("Hours").is_ok());
        assert!(ensure_identifier("Hours; DROP TABLE entries").is_err());
        assert!(ensure_identifier("").is_err());
    }
}
