//! Typed access to the current result row.
//!
//! Column indices are 0-based. Reads never fail: SQL NULL, a column index
//! past the end, or a reader with no current row all produce the zero
//! value of the requested type (`0`, `0.0`, empty string, empty bytes).
//! Check [`RowReader::column_type`] first when NULL must be told apart
//! from zero.
//!
//! The engine converts between storage classes on request, so reading an
//! integer column as text yields its decimal form and reading text as an
//! integer parses its numeric prefix.

use std::ffi::c_int;

use stmtwrap_core::{Value, ValueType};

use crate::raw::{self, RawStatement};

/// Read-only view of the row a cursor is positioned on.
#[derive(Clone, Copy)]
pub struct RowReader<'row> {
    raw: Option<&'row RawStatement>,
}

impl<'row> RowReader<'row> {
    pub(crate) fn new(raw: Option<&'row RawStatement>) -> Self {
        Self { raw }
    }

    /// Whether the reader is attached to a row.
    pub fn is_active(&self) -> bool {
        self.raw.is_some()
    }

    /// Number of columns in the row; zero when inactive.
    pub fn column_count(&self) -> usize {
        self.raw
            .map_or(0, |raw| usize::try_from(raw.column_count()).unwrap_or(0))
    }

    fn column(&self, index: usize) -> Option<(&'row RawStatement, c_int)> {
        let raw = self.raw?;
        let index = c_int::try_from(index).ok()?;
        Some((raw, index))
    }

    /// Dynamic type of the value in column `index`.
    ///
    /// [`ValueType::Unknown`] when the index is out of range or the reader
    /// is inactive.
    pub fn column_type(&self, index: usize) -> ValueType {
        if index >= self.column_count() {
            return ValueType::Unknown;
        }
        let Some((raw, index)) = self.column(index) else {
            return ValueType::Unknown;
        };
        match raw.column_type(index) {
            raw::SQLITE_NULL => ValueType::Null,
            raw::SQLITE_INTEGER => ValueType::Integer,
            raw::SQLITE_FLOAT => ValueType::Float,
            raw::SQLITE_TEXT => ValueType::Text,
            raw::SQLITE_BLOB => ValueType::Blob,
            _ => ValueType::Unknown,
        }
    }

    /// Name of column `index`.
    pub fn column_name(&self, index: usize) -> Option<String> {
        let (raw, index) = self.column(index)?;
        raw.column_name(index)
    }

    /// Column `index` as a 64-bit integer.
    pub fn read_integer(&self, index: usize) -> i64 {
        self.column(index)
            .map_or(0, |(raw, index)| raw.column_int64(index))
    }

    /// Column `index` as a double.
    pub fn read_float(&self, index: usize) -> f64 {
        self.column(index)
            .map_or(0.0, |(raw, index)| raw.column_double(index))
    }

    /// Column `index` as owned text.
    ///
    /// Invalid UTF-8 is replaced with U+FFFD.
    pub fn read_text(&self, index: usize) -> String {
        let bytes = self
            .column(index)
            .map(|(raw, index)| raw.column_text(index))
            .unwrap_or_default();
        match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        }
    }

    /// Column `index` as owned bytes.
    pub fn read_blob(&self, index: usize) -> Vec<u8> {
        self.column(index)
            .map(|(raw, index)| raw.column_blob(index))
            .unwrap_or_default()
    }

    /// Size in bytes of column `index` as text or blob.
    pub fn read_length(&self, index: usize) -> usize {
        self.column(index).map_or(0, |(raw, index)| {
            usize::try_from(raw.column_bytes(index)).unwrap_or(0)
        })
    }

    /// Column `index` in its own storage class.
    pub fn read_value(&self, index: usize) -> Value {
        match self.column_type(index) {
            ValueType::Integer => Value::Integer(self.read_integer(index)),
            ValueType::Float => Value::Float(self.read_float(index)),
            ValueType::Text => Value::Text(self.read_text(index)),
            ValueType::Blob => Value::Blob(self.read_blob(index)),
            ValueType::Null | ValueType::Unknown => Value::Null,
        }
    }

    /// Every column in its own storage class.
    pub fn values(&self) -> Vec<Value> {
        (0..self.column_count())
            .map(|index| self.read_value(index))
            .collect()
    }

    /// Column `index` converted to `T`.
    ///
    /// # Examples
    ///
    /// ```
    /// use stmtwrap_sqlite::{Connection, Length, params};
    ///
    /// let conn = Connection::open_in_memory().unwrap();
    /// let mut stmt = conn.prepare("SELECT 300, 'héllo', 2.5").unwrap();
    /// let rows = stmt.query(params![]).unwrap();
    /// let row = rows.current_row();
    ///
    /// assert_eq!(row.read::<i64>(0), 300);
    /// assert_eq!(row.read::<i8>(0), 44); // truncated like an `as` cast
    /// assert_eq!(row.read::<String>(1), "héllo");
    /// assert_eq!(row.read::<Length>(1), Length(6));
    /// assert_eq!(row.read::<f32>(2), 2.5);
    /// ```
    pub fn read<T: FromColumn>(&self, index: usize) -> T {
        T::from_column(self, index)
    }
}

impl std::fmt::Debug for RowReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowReader")
            .field("active", &self.is_active())
            .field("columns", &self.column_count())
            .finish()
    }
}

/// Byte length of a text or blob column, readable through [`RowReader::read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Length(pub usize);

impl Length {
    /// The length in bytes.
    pub fn get(self) -> usize {
        self.0
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Host types a column can be read as.
///
/// Narrow integer types truncate the 64-bit value the way an `as` cast
/// does. Implemented for `i64`, `i32`, `i16`, `i8`, `isize`, `f64`, `f32`,
/// `String`, `Vec<u8>`, [`Length`], and [`Value`]; the set is closed.
pub trait FromColumn: sealed::Sealed + Sized {
    /// Reads column `index` of `row`.
    fn from_column(row: &RowReader<'_>, index: usize) -> Self;
}

macro_rules! from_integer_column {
    ($($t:ty),*) => {
        $(
            impl sealed::Sealed for $t {}

            impl FromColumn for $t {
                #[allow(clippy::cast_possible_truncation)]
                fn from_column(row: &RowReader<'_>, index: usize) -> Self {
                    row.read_integer(index) as $t
                }
            }
        )*
    };
}

from_integer_column!(i64, i32, i16, i8, isize);

impl sealed::Sealed for f64 {}

impl FromColumn for f64 {
    fn from_column(row: &RowReader<'_>, index: usize) -> Self {
        row.read_float(index)
    }
}

impl sealed::Sealed for f32 {}

impl FromColumn for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_column(row: &RowReader<'_>, index: usize) -> Self {
        row.read_float(index) as f32
    }
}

impl sealed::Sealed for String {}

impl FromColumn for String {
    fn from_column(row: &RowReader<'_>, index: usize) -> Self {
        row.read_text(index)
    }
}

impl sealed::Sealed for Vec<u8> {}

impl FromColumn for Vec<u8> {
    fn from_column(row: &RowReader<'_>, index: usize) -> Self {
        row.read_blob(index)
    }
}

impl sealed::Sealed for Length {}

impl FromColumn for Length {
    fn from_column(row: &RowReader<'_>, index: usize) -> Self {
        Length(row.read_length(index))
    }
}

impl sealed::Sealed for Value {}

impl FromColumn for Value {
    fn from_column(row: &RowReader<'_>, index: usize) -> Self {
        row.read_value(index)
    }
}
