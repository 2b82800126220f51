//! Error types for connection, statement, and cursor operations.
//!
//! [`EngineError`] is the value captured at the moment the engine reports a
//! failure: its numeric result code plus an owned copy of the diagnostic
//! text. [`SqliteError`] says which operation failed and carries the
//! `EngineError` as its source.

use thiserror::Error;

use crate::connection::Connection;
use crate::raw;

/// An engine result code with an owned diagnostic message.
///
/// Independent of the connection it came from: it can be cloned, moved
/// across threads, and kept after the connection is closed.
///
/// # Examples
///
/// ```
/// use stmtwrap_sqlite::EngineError;
///
/// let busy = EngineError::from_code(5, None);
/// assert_eq!(busy.code(), 5);
/// assert_eq!(busy.message(), "database is locked");
///
/// let custom = EngineError::from_code(1, Some("no such table: T"));
/// assert_eq!(custom.to_string(), "no such table: T (code 1)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {code})")]
pub struct EngineError {
    code: i32,
    message: String,
}

impl EngineError {
    /// Creates an error from an explicit code and message.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Creates an error from a result code.
    ///
    /// When `message` is `None` the engine's canonical text for `code` is
    /// used.
    pub fn from_code(code: i32, message: Option<&str>) -> Self {
        match message {
            Some(message) => Self::new(code, message),
            None => Self::new(code, raw::error_string(code)),
        }
    }

    /// Snapshot of the connection's most recent error, or `None` once the
    /// connection is closed.
    pub fn from_connection(connection: &Connection) -> Option<Self> {
        connection.last_error()
    }

    /// The extended result code as reported by the engine.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// The primary result code (low 8 bits of the extended code).
    pub fn primary_code(&self) -> i32 {
        self.code & 0xff
    }

    /// The diagnostic text.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors that can occur while using a connection or statement.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// The database could not be opened.
    #[error("failed to open database '{path}': {source}")]
    Connection {
        /// Path or sentinel passed to open.
        path: String,
        /// Engine diagnostic.
        #[source]
        source: EngineError,
    },

    /// The connection has been closed.
    #[error("connection is closed")]
    Closed,

    /// SQL text could not be compiled.
    #[error("failed to prepare statement{}: {source}", offset_suffix(.offset))]
    Prepare {
        /// The SQL text that failed.
        sql: String,
        /// Byte offset of the offending token, when the engine reports one.
        offset: Option<usize>,
        /// Engine diagnostic.
        #[source]
        source: EngineError,
    },

    /// A parameter value was rejected.
    #[error("failed to bind parameter {index}: {source}")]
    Bind {
        /// 1-based parameter index.
        index: usize,
        /// Engine diagnostic.
        #[source]
        source: EngineError,
    },

    /// Raw SQL execution failed or was aborted by its row callback.
    #[error("execution failed: {0}")]
    Execution(#[source] EngineError),

    /// Advancing a statement failed with a non-busy code.
    #[error("step failed: {0}")]
    Step(#[source] EngineError),

    /// The database stayed busy for every retry attempt.
    #[error("database busy after {attempts} attempts: {source}")]
    BusyTimeout {
        /// Attempts made before giving up.
        attempts: u32,
        /// Engine diagnostic from the last attempt.
        #[source]
        source: EngineError,
    },

    /// The statement still has a live cursor.
    #[error("statement is occupied by a live cursor")]
    Occupied,

    /// An argument cannot be passed to the engine (e.g. interior NUL byte).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// SQL text assembly or configuration validation failed.
    #[error(transparent)]
    Core(#[from] stmtwrap_core::CoreError),
}

impl SqliteError {
    /// The engine result code behind this error, if there is one.
    pub fn code(&self) -> Option<i32> {
        self.engine_error().map(EngineError::code)
    }

    /// The engine error behind this error, if there is one.
    pub fn engine_error(&self) -> Option<&EngineError> {
        match self {
            SqliteError::Connection { source, .. }
            | SqliteError::Prepare { source, .. }
            | SqliteError::Bind { source, .. }
            | SqliteError::BusyTimeout { source, .. } => Some(source),
            SqliteError::Execution(source) | SqliteError::Step(source) => Some(source),
            SqliteError::Closed
            | SqliteError::Occupied
            | SqliteError::InvalidArgument(_)
            | SqliteError::Core(_) => None,
        }
    }
}

fn offset_suffix(offset: &Option<usize>) -> String {
    offset.map(|o| format!(" at byte {o}")).unwrap_or_default()
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;
