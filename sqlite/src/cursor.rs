//! Forward-only iteration over a statement's result rows.

use crate::error::Result;
use crate::row::RowReader;
use crate::statement::Statement;

/// Exclusive, forward-only handle on a statement's result rows.
///
/// Obtained from [`Statement::begin`] or [`Statement::query`]. The cursor
/// mutably borrows its statement, so the statement cannot be re-executed,
/// rebound, or used for a second cursor until the cursor is dropped. When
/// the rows run out, a step fails, or the cursor is dropped, the statement
/// is rewound (bindings kept) and released.
///
/// Two cursors compare equal exactly when both are exhausted, so any
/// cursor can be compared against [`Cursor::end`].
///
/// # Examples
///
/// ```
/// use stmtwrap_sqlite::{Connection, params};
///
/// let conn = Connection::open_in_memory().unwrap();
/// conn.execute("CREATE TABLE T(x INTEGER); INSERT INTO T VALUES (1),(2),(3);")
///     .unwrap();
///
/// let mut stmt = conn.prepare("SELECT x FROM T ORDER BY x").unwrap();
/// let mut rows = stmt.query(params![]).unwrap();
/// let mut total = 0;
/// while let Some(row) = rows.next_row().unwrap() {
///     total += row.read_integer(0);
/// }
/// assert_eq!(total, 6);
/// ```
pub struct Cursor<'stmt, 'conn> {
    statement: Option<&'stmt mut Statement<'conn>>,
    started: bool,
}

impl<'stmt, 'conn> Cursor<'stmt, 'conn> {
    pub(crate) fn new(statement: &'stmt mut Statement<'conn>) -> Self {
        Self {
            statement: Some(statement),
            started: false,
        }
    }

    /// An exhausted cursor bound to no statement.
    pub fn end() -> Self {
        Self {
            statement: None,
            started: true,
        }
    }

    /// Whether the cursor is positioned on a row.
    pub fn is_live(&self) -> bool {
        self.statement.is_some()
    }

    /// Reader for the row the cursor is positioned on.
    ///
    /// Inactive (all reads yield zero values) once the cursor is exhausted.
    pub fn current_row(&self) -> RowReader<'_> {
        RowReader::new(self.statement.as_deref().map(Statement::raw))
    }

    /// Steps to the next row.
    ///
    /// Returns `false` and releases the statement when there are no more
    /// rows. Advancing an exhausted cursor is a no-op returning `false`.
    ///
    /// # Errors
    ///
    /// Step errors from the engine, including
    /// [`BusyTimeout`](crate::SqliteError::BusyTimeout). The statement is
    /// released before the error is returned.
    pub fn advance(&mut self) -> Result<bool> {
        self.started = true;
        let Some(statement) = self.statement.as_mut() else {
            return Ok(false);
        };

        match statement.step() {
            Ok(true) => Ok(true),
            Ok(false) => {
                self.release();
                Ok(false)
            }
            Err(err) => {
                self.release();
                Err(err)
            }
        }
    }

    /// Yields the pending row on the first call and advances on every later
    /// call. `None` once the rows are exhausted.
    ///
    /// # Errors
    ///
    /// As [`advance`](Self::advance).
    pub fn next_row(&mut self) -> Result<Option<RowReader<'_>>> {
        if self.started {
            self.advance()?;
        } else {
            self.started = true;
        }

        if self.is_live() {
            Ok(Some(self.current_row()))
        } else {
            Ok(None)
        }
    }

    /// Consumes the cursor, mapping every remaining row through `f`.
    ///
    /// # Errors
    ///
    /// As [`advance`](Self::advance).
    pub fn map_rows<T, F>(mut self, mut f: F) -> Result<Vec<T>>
    where
        F: FnMut(&RowReader<'_>) -> T,
    {
        let mut out = Vec::new();
        while let Some(row) = self.next_row()? {
            out.push(f(&row));
        }
        Ok(out)
    }

    fn release(&mut self) {
        if let Some(statement) = self.statement.take() {
            statement.reset();
        }
    }
}

impl Drop for Cursor<'_, '_> {
    fn drop(&mut self) {
        self.release();
    }
}

impl PartialEq for Cursor<'_, '_> {
    fn eq(&self, other: &Self) -> bool {
        !self.is_live() && !other.is_live()
    }
}

impl std::fmt::Debug for Cursor<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("live", &self.is_live())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::StatementState;
    use crate::{Connection, SqliteError};
    use stmtwrap_core::params;

    fn numbers(conn: &Connection) {
        conn.execute("CREATE TABLE N(x INTEGER); INSERT INTO N VALUES (1),(2),(3);")
            .unwrap();
    }

    #[test]
    fn test_end_cursors_are_equal() {
        assert_eq!(Cursor::end(), Cursor::end());
    }

    #[test]
    fn test_live_cursor_differs_from_end() {
        let conn = Connection::open_in_memory().unwrap();
        numbers(&conn);
        let mut stmt = conn.prepare("SELECT x FROM N").unwrap();
        let rows = stmt.query(params![]).unwrap();
        assert!(rows.is_live());
        assert_ne!(rows, Cursor::end());
    }

    #[test]
    fn test_advance_until_exhausted_releases() {
        let conn = Connection::open_in_memory().unwrap();
        numbers(&conn);
        let mut stmt = conn.prepare("SELECT x FROM N ORDER BY x").unwrap();
        let mut rows = stmt.query(params![]).unwrap();

        assert_eq!(rows.current_row().read_integer(0), 1);
        assert!(rows.advance().unwrap());
        assert_eq!(rows.current_row().read_integer(0), 2);
        assert!(rows.advance().unwrap());
        assert!(!rows.advance().unwrap());
        assert!(!rows.current_row().is_active());
        assert!(!rows.advance().unwrap());
        assert_eq!(rows, Cursor::end());

        drop(rows);
        assert_eq!(stmt.state(), StatementState::Ready);
    }

    #[test]
    fn test_drop_mid_iteration_releases() {
        let conn = Connection::open_in_memory().unwrap();
        numbers(&conn);
        let mut stmt = conn.prepare("SELECT x FROM N ORDER BY x").unwrap();

        {
            let rows = stmt.query(params![]).unwrap();
            assert!(rows.is_live());
        }
        assert!(!stmt.is_occupied());

        let all = stmt.query(params![]).unwrap().map_rows(|row| row.read_integer(0)).unwrap();
        assert_eq!(all, vec![1, 2, 3]);
    }

    #[test]
    fn test_leaked_cursor_occupies_until_reset() {
        let conn = Connection::open_in_memory().unwrap();
        numbers(&conn);
        let mut stmt = conn.prepare("SELECT x FROM N").unwrap();

        std::mem::forget(stmt.query(params![]).unwrap());
        assert!(stmt.is_occupied());
        assert!(matches!(stmt.begin(), Err(SqliteError::Occupied)));
        assert!(matches!(stmt.execute(params![]), Err(SqliteError::Occupied)));
        assert!(matches!(stmt.bind(1, 0), Err(SqliteError::Occupied)));

        stmt.reset();
        assert!(!stmt.is_occupied());
        assert!(stmt.execute(params![]).unwrap());
    }
}
