//! Database connections.

use std::ffi::CString;
use std::ops::ControlFlow;
use std::path::Path;

use stmtwrap_core::{ConnectionConfig, SqlBuilder};
use tracing::debug;

use crate::error::{EngineError, Result, SqliteError};
use crate::exec::ExecRow;
use crate::raw::{self, PrepareFailure, RawConnection};
use crate::statement::Statement;

/// Path that opens a private, temporary in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// An open database.
///
/// Statements prepared from a connection borrow it, so the compiler
/// rejects closing or dropping a connection while any of its statements
/// are alive.
///
/// # Examples
///
/// ```
/// use stmtwrap_sqlite::{Connection, params};
///
/// let conn = Connection::open_in_memory().unwrap();
/// conn.execute("CREATE TABLE T(a INTEGER, b TEXT);").unwrap();
///
/// let mut insert = conn.make_insert("T", "a,b", "?,?").unwrap();
/// insert.execute(params![1, "one"]).unwrap();
///
/// let mut select = conn.prepare("SELECT b FROM T WHERE a=?").unwrap();
/// let mut rows = select.query(params![1]).unwrap();
/// let row = rows.next_row().unwrap().unwrap();
/// assert_eq!(row.read_text(0), "one");
/// ```
///
/// A statement cannot be used after its connection is gone:
///
/// ```compile_fail
/// use stmtwrap_sqlite::{Connection, params};
///
/// let conn = Connection::open_in_memory().unwrap();
/// let mut stmt = conn.prepare("SELECT 1").unwrap();
/// drop(conn);
/// stmt.execute(params![]).unwrap();
/// ```
pub struct Connection {
    raw: Option<RawConnection>,
    path: String,
    config: ConnectionConfig,
    builder: SqlBuilder,
}

impl Connection {
    /// Opens (creating if needed) the database at `path` with default settings.
    ///
    /// # Errors
    ///
    /// [`SqliteError::Connection`] if the engine cannot open the file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, ConnectionConfig::default())
    }

    /// Opens a fresh in-memory database.
    ///
    /// # Errors
    ///
    /// [`SqliteError::Connection`] if the engine cannot allocate it.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(IN_MEMORY)
    }

    /// Opens the database at `path` with explicit settings.
    ///
    /// # Errors
    ///
    /// [`SqliteError::Core`] if `config` is invalid,
    /// [`SqliteError::InvalidArgument`] if the path cannot be passed to the
    /// engine, or [`SqliteError::Connection`] if opening fails.
    pub fn open_with_config(path: impl AsRef<Path>, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;

        let path = path.as_ref();
        let path = path.to_str().ok_or_else(|| {
            SqliteError::InvalidArgument(format!(
                "database path is not valid UTF-8: {}",
                path.display()
            ))
        })?;
        let c_path = CString::new(path).map_err(|_| {
            SqliteError::InvalidArgument(format!("database path contains a NUL byte: {path:?}"))
        })?;

        let flags = raw::open_flags(config.read_only, config.create);
        let raw = RawConnection::open(&c_path, flags).map_err(|source| SqliteError::Connection {
            path: path.to_string(),
            source,
        })?;
        debug!(path, read_only = config.read_only, "opened database");

        Ok(Self {
            raw: Some(raw),
            path: path.to_string(),
            builder: config.sql_builder(),
            config,
        })
    }

    /// Closes the connection. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.raw.take().is_some() {
            debug!(path = %self.path, "closed database");
        }
    }

    /// Whether the connection is still open.
    pub fn is_open(&self) -> bool {
        self.raw.is_some()
    }

    /// The path the connection was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The settings the connection was opened with.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The builder used by the `make_*` methods.
    pub fn sql_builder(&self) -> &SqlBuilder {
        &self.builder
    }

    /// The most recent engine error on this connection, or `None` once closed.
    pub fn last_error(&self) -> Option<EngineError> {
        self.raw.as_ref().map(RawConnection::last_error)
    }

    fn raw(&self) -> Result<&RawConnection> {
        self.raw.as_ref().ok_or(SqliteError::Closed)
    }

    /// Runs one or more `;`-separated statements, discarding any rows.
    ///
    /// # Errors
    ///
    /// [`SqliteError::Execution`] with the engine's message if any statement
    /// fails. Statements before the failing one stay applied.
    pub fn execute(&self, sql: &str) -> Result<()> {
        let raw = self.raw()?;
        let sql_c = sql_text(sql)?;
        debug!(sql, "executing");
        raw.exec(&sql_c).map_err(SqliteError::Execution)
    }

    /// Runs one or more statements, passing every result row to `callback`.
    ///
    /// Returning [`ControlFlow::Break`] stops execution; the call then fails
    /// with an [`SqliteError::Execution`] carrying the engine's abort code.
    /// A panic inside `callback` also stops execution and is re-raised
    /// after the engine has returned.
    ///
    /// # Errors
    ///
    /// [`SqliteError::Execution`] if a statement fails or the callback breaks.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::ops::ControlFlow;
    /// use stmtwrap_sqlite::Connection;
    ///
    /// let conn = Connection::open_in_memory().unwrap();
    /// let mut seen = Vec::new();
    /// conn.execute_with("SELECT 1 AS one, NULL AS nothing;", |row| {
    ///     seen.push((row.value(0).map(str::to_owned), row.value(1).map(str::to_owned)));
    ///     ControlFlow::Continue(())
    /// })
    /// .unwrap();
    /// assert_eq!(seen, vec![(Some("1".to_string()), None)]);
    /// ```
    pub fn execute_with<F>(&self, sql: &str, mut callback: F) -> Result<()>
    where
        F: FnMut(&ExecRow<'_>) -> ControlFlow<()>,
    {
        let raw = self.raw()?;
        let sql_c = sql_text(sql)?;
        debug!(sql, "executing with row callback");
        raw.exec_rows(&sql_c, &mut callback)
            .map_err(SqliteError::Execution)
    }

    /// Compiles the first statement in `sql`.
    ///
    /// Text after the first complete statement is ignored.
    ///
    /// # Errors
    ///
    /// [`SqliteError::Prepare`] with the engine's message and, when known,
    /// the byte offset of the offending token. SQL containing no statement
    /// at all is also rejected.
    pub fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
        let raw = self.raw()?;
        match raw.prepare(sql) {
            Ok(Some(stmt)) => {
                debug!(sql, "prepared statement");
                Ok(Statement::new(stmt, self, self.config.busy_retry))
            }
            Ok(None) => Err(SqliteError::Prepare {
                sql: sql.to_string(),
                offset: None,
                source: EngineError::new(raw::SQLITE_MISUSE, "SQL text contains no statement"),
            }),
            Err(PrepareFailure { error, offset }) => Err(SqliteError::Prepare {
                sql: sql.to_string(),
                offset,
                source: error,
            }),
        }
    }

    /// Prepares `INSERT INTO {table}({names}) VALUES ({values});`.
    ///
    /// # Errors
    ///
    /// [`SqliteError::Core`] if the text exceeds the builder capacity,
    /// otherwise as [`prepare`](Self::prepare).
    pub fn make_insert(&self, table: &str, names: &str, values: &str) -> Result<Statement<'_>> {
        let sql = self.builder.insert(table, names, values)?;
        self.prepare(&sql)
    }

    /// Prepares `INSERT INTO {table} VALUES ({values});`.
    ///
    /// # Errors
    ///
    /// As [`make_insert`](Self::make_insert).
    pub fn make_insert_positional(&self, table: &str, values: &str) -> Result<Statement<'_>> {
        let sql = self.builder.insert_positional(table, values)?;
        self.prepare(&sql)
    }

    /// Prepares `SELECT {names|*} FROM {table}[ WHERE {filter}];`.
    ///
    /// # Errors
    ///
    /// As [`make_insert`](Self::make_insert).
    pub fn make_select(
        &self,
        table: &str,
        names: Option<&str>,
        filter: Option<&str>,
    ) -> Result<Statement<'_>> {
        let sql = self.builder.select(table, names, filter)?;
        self.prepare(&sql)
    }

    /// Prepares `UPDATE {table} SET n1=v1, n2=v2 WHERE {filter};`.
    ///
    /// # Errors
    ///
    /// As [`make_insert`](Self::make_insert), plus [`SqliteError::Core`]
    /// when `assignments` is empty.
    pub fn make_update(
        &self,
        table: &str,
        assignments: &[(&str, &str)],
        filter: &str,
    ) -> Result<Statement<'_>> {
        let sql = self.builder.update(table, assignments, filter)?;
        self.prepare(&sql)
    }

    /// Prepares `DELETE FROM {table} WHERE {filter};`.
    ///
    /// # Errors
    ///
    /// As [`make_insert`](Self::make_insert).
    pub fn make_delete(&self, table: &str, filter: &str) -> Result<Statement<'_>> {
        let sql = self.builder.delete(table, filter)?;
        self.prepare(&sql)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .finish()
    }
}

fn sql_text(sql: &str) -> Result<CString> {
    CString::new(sql)
        .map_err(|_| SqliteError::InvalidArgument("SQL text contains a NUL byte".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stmtwrap_core::CoreError;

    #[test]
    fn test_open_in_memory_is_open() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(conn.is_open());
        assert_eq!(conn.path(), IN_MEMORY);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.close();
        conn.close();
        assert!(!conn.is_open());
        assert!(conn.last_error().is_none());
    }

    #[test]
    fn test_closed_connection_rejects_work() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.close();
        assert!(matches!(conn.execute("SELECT 1;"), Err(SqliteError::Closed)));
        assert!(matches!(conn.prepare("SELECT 1;"), Err(SqliteError::Closed)));
    }

    #[test]
    fn test_open_missing_file_without_create_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        let config = ConnectionConfig {
            create: false,
            ..ConnectionConfig::default()
        };
        let err = Connection::open_with_config(&path, config).unwrap_err();
        assert!(matches!(err, SqliteError::Connection { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let config = ConnectionConfig::default().with_builder_capacity(0);
        let err = Connection::open_with_config(IN_MEMORY, config).unwrap_err();
        assert!(matches!(err, SqliteError::Core(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_execute_reports_engine_message() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn.execute("INSERT INTO nowhere VALUES (1);").unwrap_err();
        match err {
            SqliteError::Execution(source) => {
                assert!(source.message().contains("no such table"), "{source}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_execute_rejects_nul() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            conn.execute("SELECT 1;\0"),
            Err(SqliteError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_prepare_reports_offset() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn.prepare("SELEC 1").unwrap_err();
        match err {
            SqliteError::Prepare { sql, offset, source } => {
                assert_eq!(sql, "SELEC 1");
                assert!(source.message().contains("syntax error"), "{source}");
                assert_eq!(offset, Some(0));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_prepare_empty_text_is_an_error() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn.prepare("   -- nothing here\n").unwrap_err();
        assert_eq!(err.code(), Some(raw::SQLITE_MISUSE));
    }

    #[test]
    fn test_make_select_overflow_is_builder_error() {
        let config = ConnectionConfig::default().with_builder_capacity(16);
        let conn = Connection::open_with_config(IN_MEMORY, config).unwrap();
        let err = conn.make_select("Arith_LUT", None, None).unwrap_err();
        assert!(matches!(
            err,
            SqliteError::Core(CoreError::BuilderOverflow { .. })
        ));
    }

    #[test]
    fn test_execute_with_break_aborts() {
        let conn = Connection::open_in_memory().unwrap();
        let mut calls = 0;
        let err = conn
            .execute_with("SELECT 1 UNION ALL SELECT 2;", |_| {
                calls += 1;
                ControlFlow::Break(())
            })
            .unwrap_err();
        assert_eq!(calls, 1);
        assert_eq!(err.code(), Some(rusqlite::ffi::SQLITE_ABORT));
    }

    #[test]
    fn test_drop_with_leaked_statement_does_not_panic() {
        let conn = Connection::open_in_memory().unwrap();
        let stmt = conn.prepare("SELECT 1").unwrap();
        std::mem::forget(stmt);
        // The close fails with SQLITE_BUSY and is only logged.
        drop(conn);
    }
}
