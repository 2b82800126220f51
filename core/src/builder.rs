//! Capacity-checked assembly of simple CRUD statement text.
//!
//! Fragments (table names, column lists, value lists, `WHERE` bodies) are
//! concatenated verbatim. Nothing is quoted or escaped, so every fragment
//! must come from the program itself, never from untrusted input; bind
//! untrusted values through `?` placeholders instead.
//!
//! Every statement ends with exactly one `;`. Statements longer than the
//! builder's capacity are rejected with [`CoreError::BuilderOverflow`].
//!
//! # Example
//!
//! ```
//! use stmtwrap_core::SqlBuilder;
//!
//! let builder = SqlBuilder::default();
//! assert_eq!(
//!     builder.select("T", None, Some("X=12")).unwrap(),
//!     "SELECT * FROM T WHERE X=12;"
//! );
//! assert_eq!(
//!     builder.update("T", &[("a", "1"), ("b", "?")], "id=3").unwrap(),
//!     "UPDATE T SET a=1, b=? WHERE id=3;"
//! );
//! ```

use crate::error::{CoreError, Result};

/// Default maximum statement length in bytes.
pub const DEFAULT_BUILDER_CAPACITY: usize = 1024;

/// Builds `INSERT`/`SELECT`/`UPDATE`/`DELETE` text from trusted fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlBuilder {
    capacity: usize,
}

impl Default for SqlBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_BUILDER_CAPACITY)
    }
}

impl SqlBuilder {
    /// Creates a builder that rejects statements longer than `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Maximum statement length in bytes, terminator included.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// `INSERT INTO {table}({names}) VALUES ({values});`
    ///
    /// # Errors
    ///
    /// [`CoreError::BuilderOverflow`] if the text exceeds the capacity.
    pub fn insert(&self, table: &str, names: &str, values: &str) -> Result<String> {
        self.finish(format!("INSERT INTO {table}({names}) VALUES ({values})"))
    }

    /// `INSERT INTO {table} VALUES ({values});` with no column list.
    ///
    /// # Errors
    ///
    /// [`CoreError::BuilderOverflow`] if the text exceeds the capacity.
    pub fn insert_positional(&self, table: &str, values: &str) -> Result<String> {
        self.finish(format!("INSERT INTO {table} VALUES ({values})"))
    }

    /// `SELECT {names|*} FROM {table}[ WHERE {filter}];`
    ///
    /// # Errors
    ///
    /// [`CoreError::BuilderOverflow`] if the text exceeds the capacity.
    pub fn select(&self, table: &str, names: Option<&str>, filter: Option<&str>) -> Result<String> {
        let names = names.unwrap_or("*");
        let mut sql = format!("SELECT {names} FROM {table}");
        if let Some(filter) = filter {
            sql.push_str(" WHERE ");
            sql.push_str(filter);
        }
        self.finish(sql)
    }

    /// `UPDATE {table} SET n1=v1, n2=v2 WHERE {filter};`
    ///
    /// Assignments are joined with `", "`.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidFragment`] if `assignments` is empty,
    /// [`CoreError::BuilderOverflow`] if the text exceeds the capacity.
    pub fn update(&self, table: &str, assignments: &[(&str, &str)], filter: &str) -> Result<String> {
        if assignments.is_empty() {
            return Err(CoreError::InvalidFragment(format!(
                "UPDATE of '{table}' needs at least one assignment"
            )));
        }

        let set = assignments
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(", ");

        self.finish(format!("UPDATE {table} SET {set} WHERE {filter}"))
    }

    /// `DELETE FROM {table} WHERE {filter};`
    ///
    /// # Errors
    ///
    /// [`CoreError::BuilderOverflow`] if the text exceeds the capacity.
    pub fn delete(&self, table: &str, filter: &str) -> Result<String> {
        self.finish(format!("DELETE FROM {table} WHERE {filter}"))
    }

    fn finish(&self, mut sql: String) -> Result<String> {
        sql.push(';');
        if sql.len() > self.capacity {
            return Err(CoreError::BuilderOverflow {
                length: sql.len(),
                capacity: self.capacity,
            });
        }
        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_with_names() {
        let sql = SqlBuilder::default()
            .insert("Arith_LUT", "X,Y,Sum", "?,?,?")
            .unwrap();
        assert_eq!(sql, "INSERT INTO Arith_LUT(X,Y,Sum) VALUES (?,?,?);");
    }

    #[test]
    fn test_insert_positional_omits_column_list() {
        let sql = SqlBuilder::default().insert_positional("T", "1,'a'").unwrap();
        assert_eq!(sql, "INSERT INTO T VALUES (1,'a');");
    }

    #[test]
    fn test_select_defaults_to_star_without_where() {
        let sql = SqlBuilder::default().select("T", None, None).unwrap();
        assert_eq!(sql, "SELECT * FROM T;");
    }

    #[test]
    fn test_select_with_names_and_where() {
        let sql = SqlBuilder::default()
            .select("T", Some("X, Y"), Some("X=12"))
            .unwrap();
        assert_eq!(sql, "SELECT X, Y FROM T WHERE X=12;");
    }

    #[test]
    fn test_update_single_assignment_has_no_separator() {
        let sql = SqlBuilder::default()
            .update("T", &[("Sum", "0")], "X=1")
            .unwrap();
        assert_eq!(sql, "UPDATE T SET Sum=0 WHERE X=1;");
    }

    #[test]
    fn test_update_separates_assignments() {
        let sql = SqlBuilder::default()
            .update("T", &[("a", "1"), ("b", "2"), ("c", "?")], "id=?")
            .unwrap();
        assert_eq!(sql, "UPDATE T SET a=1, b=2, c=? WHERE id=?;");
    }

    #[test]
    fn test_update_rejects_empty_assignments() {
        let err = SqlBuilder::default().update("T", &[], "1").unwrap_err();
        assert!(matches!(err, CoreError::InvalidFragment(_)));
    }

    #[test]
    fn test_delete() {
        let sql = SqlBuilder::default().delete("T", "X=0 AND Y=0").unwrap();
        assert_eq!(sql, "DELETE FROM T WHERE X=0 AND Y=0;");
    }

    #[test]
    fn test_exactly_one_terminator() {
        let builder = SqlBuilder::default();
        for sql in [
            builder.insert("T", "a", "1").unwrap(),
            builder.insert_positional("T", "1").unwrap(),
            builder.select("T", None, Some("a=1")).unwrap(),
            builder.update("T", &[("a", "2")], "a=1").unwrap(),
            builder.delete("T", "a=1").unwrap(),
        ] {
            assert_eq!(sql.matches(';').count(), 1, "{sql}");
            assert!(sql.ends_with(';'));
        }
    }

    #[test]
    fn test_capacity_boundary() {
        // "DELETE FROM T WHERE 1;" is 22 bytes
        assert!(SqlBuilder::new(22).delete("T", "1").is_ok());

        let err = SqlBuilder::new(21).delete("T", "1").unwrap_err();
        match err {
            CoreError::BuilderOverflow { length, capacity } => {
                assert_eq!(length, 22);
                assert_eq!(capacity, 21);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_default_capacity_rejects_oversized_where() {
        let filter = format!("name='{}'", "x".repeat(DEFAULT_BUILDER_CAPACITY));
        let err = SqlBuilder::default().select("T", None, Some(&filter));
        assert!(matches!(err, Err(CoreError::BuilderOverflow { .. })));
    }
}
