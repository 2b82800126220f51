//! Engine-independent building blocks for the stmtwrap statement layer.
//!
//! This crate holds everything that does not touch the SQL engine itself:
//!
//! - [`Param`] / [`Value`] / [`ValueType`] — host-side values for binding
//!   parameters and reading columns, plus the engine's dynamic type tag.
//! - [`RetryPolicy`] — the bounded busy-retry state machine behind every
//!   statement step, driven by a caller-supplied step closure.
//! - [`SqlBuilder`] — capacity-checked `INSERT`/`SELECT`/`UPDATE`/`DELETE`
//!   text assembly from trusted fragments.
//! - [`ConnectionConfig`] — YAML-serializable connection settings.
//!
//! The `stmtwrap-sqlite` crate layers connections, prepared statements and
//! cursors on top of these types.
//!
//! # Example
//!
//! ```
//! use stmtwrap_core::{ConnectionConfig, Param, params};
//!
//! let config = ConnectionConfig::default();
//! let sql = config
//!     .sql_builder()
//!     .insert("Arith_LUT", "X,Y", "?,?")
//!     .unwrap();
//! assert_eq!(sql, "INSERT INTO Arith_LUT(X,Y) VALUES (?,?);");
//!
//! let bound: &[Param<'_>] = params![12, 5];
//! assert_eq!(bound[1], Param::Integer(5));
//! ```

mod builder;
mod config;
mod error;
mod retry;
mod value;

pub use builder::{DEFAULT_BUILDER_CAPACITY, SqlBuilder};
pub use config::ConnectionConfig;
pub use error::{CoreError, Result};
pub use retry::{DEFAULT_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS, RetryPolicy, StepFailure, StepOutcome};
pub use value::{Param, Value, ValueType};
