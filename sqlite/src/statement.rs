//! Prepared statements.
//!
//! A [`Statement`] is compiled once and executed many times. Parameters
//! are 1-based and keep their values across executions until rebound.
//! Rows are read through a [`Cursor`] checked out with
//! [`Statement::begin`]; while a cursor is alive the statement is
//! *occupied* and the borrow checker rejects any other use of it.

use std::ffi::c_int;

use stmtwrap_core::{Param, RetryPolicy, StepFailure, StepOutcome};
use tracing::debug;

use crate::connection::Connection;
use crate::cursor::Cursor;
use crate::error::{EngineError, Result, SqliteError};
use crate::raw::{self, RawStatement};

/// Execution state of a [`Statement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    /// Freshly prepared or rewound; ready to bind and execute.
    Ready,
    /// The last step produced a row that has not been consumed.
    HasRow,
    /// The last step completed the statement.
    Done,
    /// A cursor owns the statement's rows.
    Occupied,
}

/// A compiled SQL statement tied to the connection that prepared it.
///
/// Dropping the statement finalizes it.
///
/// # Examples
///
/// ```
/// use stmtwrap_sqlite::{Connection, StatementState, params};
///
/// let conn = Connection::open_in_memory().unwrap();
/// conn.execute("CREATE TABLE T(x INTEGER);").unwrap();
///
/// let mut insert = conn.prepare("INSERT INTO T VALUES (?)").unwrap();
/// for x in 0..3 {
///     assert!(!insert.execute(params![x]).unwrap());
/// }
/// assert_eq!(insert.state(), StatementState::Done);
///
/// let mut count = conn.prepare("SELECT count(*) FROM T").unwrap();
/// assert!(count.execute(params![]).unwrap());
/// let rows = count.begin().unwrap();
/// assert_eq!(rows.current_row().read_integer(0), 3);
/// ```
pub struct Statement<'conn> {
    raw: RawStatement,
    connection: &'conn Connection,
    state: StatementState,
    retry: RetryPolicy,
}

impl<'conn> Statement<'conn> {
    pub(crate) fn new(raw: RawStatement, connection: &'conn Connection, retry: RetryPolicy) -> Self {
        Self {
            raw,
            connection,
            state: StatementState::Ready,
            retry,
        }
    }

    pub(crate) fn raw(&self) -> &RawStatement {
        &self.raw
    }

    /// The connection that prepared this statement.
    pub fn connection(&self) -> &'conn Connection {
        self.connection
    }

    /// Current execution state.
    pub fn state(&self) -> StatementState {
        self.state
    }

    /// Whether a cursor still claims this statement's rows.
    ///
    /// Only observable after a cursor was leaked with [`std::mem::forget`];
    /// [`reset`](Self::reset) clears it.
    pub fn is_occupied(&self) -> bool {
        self.state == StatementState::Occupied
    }

    /// The SQL text the statement was compiled from.
    pub fn sql(&self) -> String {
        self.raw.sql()
    }

    /// Number of `?` parameters (the largest parameter index).
    pub fn parameter_count(&self) -> usize {
        usize::try_from(self.raw.parameter_count()).unwrap_or(0)
    }

    /// Number of result columns; zero for statements that return no data.
    pub fn column_count(&self) -> usize {
        usize::try_from(self.raw.column_count()).unwrap_or(0)
    }

    /// Name of result column `index`.
    pub fn column_name(&self, index: usize) -> Option<String> {
        c_int::try_from(index)
            .ok()
            .and_then(|index| self.raw.column_name(index))
    }

    /// Replaces the busy-retry policy inherited from the connection.
    pub fn set_retry_policy(&mut self, retry: RetryPolicy) {
        self.retry = retry;
    }

    /// The busy-retry policy used by every step.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Binds `value` to the 1-based parameter `index`.
    ///
    /// A statement holding an unconsumed row or a finished result is
    /// rewound first. Earlier bindings are kept.
    ///
    /// # Errors
    ///
    /// [`SqliteError::Bind`] with the engine's range error when `index` is
    /// 0 or above [`parameter_count`](Self::parameter_count), or
    /// [`SqliteError::Occupied`] if a leaked cursor still owns the statement.
    pub fn bind<'v>(&mut self, index: usize, value: impl Into<Param<'v>>) -> Result<()> {
        self.make_ready()?;
        self.bind_param(index, value.into())
    }

    /// Binds a 64-bit integer.
    ///
    /// # Errors
    ///
    /// As [`bind`](Self::bind).
    pub fn bind_integer(&mut self, index: usize, value: i64) -> Result<()> {
        self.bind(index, Param::Integer(value))
    }

    /// Binds a double.
    ///
    /// # Errors
    ///
    /// As [`bind`](Self::bind).
    pub fn bind_float(&mut self, index: usize, value: f64) -> Result<()> {
        self.bind(index, Param::Float(value))
    }

    /// Binds text. The engine keeps its own copy.
    ///
    /// # Errors
    ///
    /// As [`bind`](Self::bind).
    pub fn bind_text(&mut self, index: usize, value: &str) -> Result<()> {
        self.bind(index, Param::Text(value))
    }

    /// Binds a blob. The engine keeps its own copy.
    ///
    /// # Errors
    ///
    /// As [`bind`](Self::bind).
    pub fn bind_blob(&mut self, index: usize, value: &[u8]) -> Result<()> {
        self.bind(index, Param::Blob(value))
    }

    /// Binds SQL NULL.
    ///
    /// # Errors
    ///
    /// As [`bind`](Self::bind).
    pub fn bind_null(&mut self, index: usize) -> Result<()> {
        self.bind(index, Param::Null)
    }

    /// Binds `params` to indices `1..=params.len()` and takes the first step.
    ///
    /// Returns `true` when the step produced a row (read it through
    /// [`begin`](Self::begin)) and `false` when the statement ran to
    /// completion. Parameters beyond `params.len()` keep their previous
    /// bindings. A statement that was already executed is rewound first.
    /// On any failure the statement is rewound to [`StatementState::Ready`].
    ///
    /// # Errors
    ///
    /// [`SqliteError::Bind`] if a parameter is rejected,
    /// [`SqliteError::BusyTimeout`] if the database stayed locked for every
    /// retry, [`SqliteError::Step`] for any other engine failure, or
    /// [`SqliteError::Occupied`] if a leaked cursor still owns the statement.
    pub fn execute(&mut self, params: &[Param<'_>]) -> Result<bool> {
        self.make_ready()?;
        for (i, param) in params.iter().enumerate() {
            self.bind_param(i + 1, *param)?;
        }

        match self.step() {
            Ok(has_row) => Ok(has_row),
            Err(err) => {
                self.rewind();
                Err(err)
            }
        }
    }

    /// Executes with `params` and checks out a cursor over the results.
    ///
    /// # Errors
    ///
    /// As [`execute`](Self::execute).
    pub fn query(&mut self, params: &[Param<'_>]) -> Result<Cursor<'_, 'conn>> {
        self.execute(params)?;
        self.begin()
    }

    /// Checks out a cursor positioned on the pending row.
    ///
    /// If no row is pending (never executed, or finished) the returned
    /// cursor is already exhausted and the statement is not occupied.
    ///
    /// # Errors
    ///
    /// [`SqliteError::Occupied`] if a leaked cursor still owns the statement.
    ///
    /// Only one cursor can be live at a time:
    ///
    /// ```compile_fail
    /// use stmtwrap_sqlite::{Connection, params};
    ///
    /// let conn = Connection::open_in_memory().unwrap();
    /// let mut stmt = conn.prepare("SELECT 1").unwrap();
    /// stmt.execute(params![]).unwrap();
    /// let first = stmt.begin().unwrap();
    /// let second = stmt.begin().unwrap();
    /// drop((first, second));
    /// ```
    pub fn begin(&mut self) -> Result<Cursor<'_, 'conn>> {
        match self.state {
            StatementState::Occupied => Err(SqliteError::Occupied),
            StatementState::HasRow => {
                self.state = StatementState::Occupied;
                Ok(Cursor::new(self))
            }
            StatementState::Ready | StatementState::Done => Ok(Cursor::end()),
        }
    }

    /// Rewinds the statement so it can be executed again.
    ///
    /// Bindings are kept and any occupancy left by a leaked cursor is
    /// cleared.
    pub fn reset(&mut self) {
        self.rewind();
    }

    /// Advances to the next row, retrying while the database is busy.
    pub(crate) fn step(&mut self) -> Result<bool> {
        let raw = &self.raw;
        let outcome = self.retry.drive(|| classify(raw.step()));

        match outcome {
            Ok(has_row) => {
                if self.state != StatementState::Occupied {
                    self.state = if has_row {
                        StatementState::HasRow
                    } else {
                        StatementState::Done
                    };
                }
                Ok(has_row)
            }
            Err(StepFailure::BusyTimeout { attempts }) => {
                debug!(attempts, sql = %self.raw.sql(), "step gave up on busy database");
                Err(SqliteError::BusyTimeout {
                    attempts,
                    source: self.raw.error_for(raw::SQLITE_BUSY),
                })
            }
            Err(StepFailure::Engine { code }) => Err(SqliteError::Step(self.raw.error_for(code))),
        }
    }

    fn make_ready(&mut self) -> Result<()> {
        match self.state {
            StatementState::Ready => Ok(()),
            StatementState::HasRow | StatementState::Done => {
                self.rewind();
                Ok(())
            }
            StatementState::Occupied => Err(SqliteError::Occupied),
        }
    }

    fn rewind(&mut self) {
        // The return value repeats the last step error, already reported.
        self.raw.reset();
        debug!(previous = ?self.state, "statement rewound");
        self.state = StatementState::Ready;
    }

    fn bind_param(&mut self, index: usize, param: Param<'_>) -> Result<()> {
        let Ok(slot) = c_int::try_from(index) else {
            return Err(SqliteError::Bind {
                index,
                source: EngineError::from_code(raw::SQLITE_RANGE, None),
            });
        };

        let rc = match param {
            Param::Null => self.raw.bind_null(slot),
            Param::Integer(value) => self.raw.bind_int64(slot, value),
            Param::Float(value) => self.raw.bind_double(slot, value),
            Param::Text(value) => self.raw.bind_text(slot, value),
            Param::Blob(value) => self.raw.bind_blob(slot, value),
        };
        self.raw
            .check(rc)
            .map_err(|source| SqliteError::Bind { index, source })
    }
}

impl std::fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.raw.sql())
            .field("state", &self.state)
            .finish()
    }
}

fn classify(rc: c_int) -> StepOutcome {
    match rc {
        raw::SQLITE_ROW => StepOutcome::Row,
        raw::SQLITE_DONE => StepOutcome::Done,
        rc if rc & 0xff == raw::SQLITE_BUSY => StepOutcome::Busy,
        rc => StepOutcome::Failed(rc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stmtwrap_core::params;

    fn table() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE T(a INTEGER, b TEXT);").unwrap();
        conn
    }

    #[test]
    fn test_classify_codes() {
        assert_eq!(classify(raw::SQLITE_ROW), StepOutcome::Row);
        assert_eq!(classify(raw::SQLITE_DONE), StepOutcome::Done);
        assert_eq!(classify(raw::SQLITE_BUSY), StepOutcome::Busy);
        // SQLITE_BUSY_RECOVERY
        assert_eq!(classify(raw::SQLITE_BUSY | (1 << 8)), StepOutcome::Busy);
        assert_eq!(classify(raw::SQLITE_MISUSE), StepOutcome::Failed(raw::SQLITE_MISUSE));
    }

    #[test]
    fn test_fresh_statement_is_ready() {
        let conn = table();
        let stmt = conn.prepare("SELECT a, b FROM T WHERE a=?").unwrap();
        assert_eq!(stmt.state(), StatementState::Ready);
        assert_eq!(stmt.parameter_count(), 1);
        assert_eq!(stmt.column_count(), 2);
        assert_eq!(stmt.column_name(1).as_deref(), Some("b"));
        assert_eq!(stmt.column_name(2), None);
        assert_eq!(stmt.sql(), "SELECT a, b FROM T WHERE a=?");
    }

    #[test]
    fn test_bind_out_of_range() {
        let conn = table();
        let mut stmt = conn.prepare("INSERT INTO T VALUES (?, ?)").unwrap();

        for index in [0, 3] {
            match stmt.bind(index, 1) {
                Err(SqliteError::Bind { index: i, source }) => {
                    assert_eq!(i, index);
                    assert_eq!(source.code(), raw::SQLITE_RANGE);
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }

    #[test]
    fn test_execute_without_rows_is_done() {
        let conn = table();
        let mut stmt = conn.prepare("INSERT INTO T VALUES (?, ?)").unwrap();
        assert!(!stmt.execute(params![1, "one"]).unwrap());
        assert_eq!(stmt.state(), StatementState::Done);

        // Re-executing rewinds automatically.
        assert!(!stmt.execute(params![2, "two"]).unwrap());
    }

    #[test]
    fn test_bindings_survive_reset() {
        let conn = table();
        let mut insert = conn.prepare("INSERT INTO T VALUES (?, ?)").unwrap();
        insert.bind(1, 7).unwrap();
        insert.bind(2, "seven").unwrap();
        insert.execute(params![]).unwrap();
        insert.reset();
        insert.execute(params![8]).unwrap();

        let mut select = conn.prepare("SELECT b FROM T WHERE a=8").unwrap();
        let mut rows = select.query(params![]).unwrap();
        let row = rows.next_row().unwrap().unwrap();
        assert_eq!(row.read_text(0), "seven");
    }

    #[test]
    fn test_step_failure_rewinds() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE U(a INTEGER PRIMARY KEY);").unwrap();
        let mut insert = conn.prepare("INSERT INTO U VALUES (?)").unwrap();
        insert.execute(params![1]).unwrap();

        let err = insert.execute(params![1]).unwrap_err();
        assert!(matches!(err, SqliteError::Step(_)), "{err}");
        assert_eq!(err.engine_error().map(EngineError::primary_code), Some(19));
        assert_eq!(insert.state(), StatementState::Ready);

        assert!(!insert.execute(params![2]).unwrap());
    }

    #[test]
    fn test_begin_without_row_is_exhausted() {
        let conn = table();
        let mut stmt = conn.prepare("SELECT a FROM T").unwrap();
        assert!(!stmt.begin().unwrap().is_live());
        assert!(!stmt.execute(params![]).unwrap());
        assert!(!stmt.begin().unwrap().is_live());
        assert!(!stmt.is_occupied());
    }

    #[test]
    fn test_statement_inherits_connection_retry() {
        let conn = table();
        let mut stmt = conn.prepare("SELECT 1").unwrap();
        assert_eq!(stmt.retry_policy(), conn.config().busy_retry);
        stmt.set_retry_policy(RetryPolicy::new(2, 0));
        assert_eq!(stmt.retry_policy(), RetryPolicy::new(2, 0));
    }
}
