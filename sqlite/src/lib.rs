//! Typed prepared-statement layer over an embedded SQLite engine.
//!
//! The crate wraps the engine's C interface in four owning types whose
//! lifetimes mirror the engine's own rules:
//!
//! - [`Connection`] — an open database; runs raw SQL and prepares statements.
//! - [`Statement`] — a compiled statement borrowing its connection; binds
//!   parameters and executes with bounded busy-retry.
//! - [`Cursor`] — a forward-only, exclusive handle on a statement's rows.
//! - [`RowReader`] — typed, zero-on-NULL reads of the current row.
//!
//! A statement cannot outlive its connection and a cursor cannot outlive
//! (or share) its statement; both are enforced by the borrow checker.
//!
//! # Architecture
//!
//! - **`raw`** — the only module with `unsafe`; owns engine handles
//! - **`connection`** — open/close, raw execution, preparing, builders
//! - **`statement`** — binding, stepping, busy-retry, occupancy
//! - **`cursor`** / **`row`** — result iteration and column reads
//! - **`exec`** — row view for raw execution callbacks
//! - **`error`** — [`EngineError`] snapshots and [`SqliteError`]
//!
//! Engine-independent pieces (values, retry policy, SQL builder,
//! configuration) live in `stmtwrap-core` and are re-exported here.
//!
//! # Quick start
//!
//! ```
//! use stmtwrap_sqlite::{Connection, params};
//!
//! let conn = Connection::open_in_memory().unwrap();
//! conn.execute("CREATE TABLE Arith_LUT(X INTEGER, Y INTEGER, Sum INTEGER);")
//!     .unwrap();
//!
//! let mut insert = conn.make_insert("Arith_LUT", "X,Y,Sum", "?,?,?").unwrap();
//! for (x, y) in [(12, 5), (3, 4)] {
//!     insert.execute(params![x, y, x + y]).unwrap();
//! }
//!
//! let mut select = conn
//!     .make_select("Arith_LUT", Some("Sum"), Some("X=?"))
//!     .unwrap();
//! let sums = select
//!     .query(params![12])
//!     .unwrap()
//!     .map_rows(|row| row.read_integer(0))
//!     .unwrap();
//! assert_eq!(sums, vec![17]);
//! ```

mod connection;
mod cursor;
mod error;
mod exec;
mod raw;
mod row;
mod statement;

pub use connection::{Connection, IN_MEMORY};
pub use cursor::Cursor;
pub use error::{EngineError, Result, SqliteError};
pub use exec::ExecRow;
pub use row::{FromColumn, Length, RowReader};
pub use statement::{Statement, StatementState};

pub use stmtwrap_core::{
    ConnectionConfig, CoreError, Param, RetryPolicy, SqlBuilder, Value, ValueType, params,
};
