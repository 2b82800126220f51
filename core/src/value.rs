//! Host-side representations of dynamically typed column values.
//!
//! [`Param`] is what gets bound to a statement parameter, [`Value`] is an
//! owned copy of a column read back from a row, and [`ValueType`] is the
//! engine's per-column type tag for the current row.

use serde::{Deserialize, Serialize};

/// Dynamic type of a column in the current row.
///
/// Reported by the engine per row and per column; the same column can hold
/// different types in different rows.
///
/// # Examples
///
/// ```
/// use stmtwrap_core::ValueType;
///
/// assert_eq!(ValueType::default(), ValueType::Unknown);
/// assert_eq!(ValueType::Float.as_str(), "FLOAT");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ValueType {
    /// No active row, index out of range, or a code the engine does not document.
    #[default]
    Unknown,
    /// SQL `NULL`.
    Null,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit IEEE floating point.
    Float,
    /// UTF-8 text.
    Text,
    /// Raw bytes.
    Blob,
}

impl ValueType {
    /// Upper-case SQL-ish name of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Unknown => "UNKNOWN",
            ValueType::Null => "NULL",
            ValueType::Integer => "INTEGER",
            ValueType::Float => "FLOAT",
            ValueType::Text => "TEXT",
            ValueType::Blob => "BLOB",
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value that can be bound to a positional statement parameter.
///
/// This is a closed set: every host type that can be bound converts into
/// one of these variants through a `From` impl, so binding dispatch is a
/// plain `match`.
///
/// # Examples
///
/// ```
/// use stmtwrap_core::Param;
///
/// assert_eq!(Param::from(12), Param::Integer(12));
/// assert_eq!(Param::from(2.5_f32), Param::Float(2.5));
/// assert_eq!(Param::from("x"), Param::Text("x"));
/// assert_eq!(Param::from(None::<i64>), Param::Null);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Param<'a> {
    /// SQL `NULL`.
    Null,
    /// Signed integer.
    Integer(i64),
    /// Floating point.
    Float(f64),
    /// Text; the engine takes its own copy when bound.
    Text(&'a str),
    /// Bytes; the engine takes its own copy when bound.
    Blob(&'a [u8]),
}

impl Param<'_> {
    /// The column type this parameter stores as.
    pub fn value_type(&self) -> ValueType {
        match self {
            Param::Null => ValueType::Null,
            Param::Integer(_) => ValueType::Integer,
            Param::Float(_) => ValueType::Float,
            Param::Text(_) => ValueType::Text,
            Param::Blob(_) => ValueType::Blob,
        }
    }
}

macro_rules! param_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Param<'_> {
                fn from(v: $t) -> Self {
                    Param::Integer(i64::from(v))
                }
            }
        )*
    };
}

param_from_integer!(i8, i16, i32, i64, u8, u16, u32, bool);

impl From<isize> for Param<'_> {
    fn from(v: isize) -> Self {
        // isize is at most 64 bits on every supported target
        Param::Integer(v as i64)
    }
}

impl From<f64> for Param<'_> {
    fn from(v: f64) -> Self {
        Param::Float(v)
    }
}

impl From<f32> for Param<'_> {
    fn from(v: f32) -> Self {
        Param::Float(f64::from(v))
    }
}

impl<'a> From<&'a str> for Param<'a> {
    fn from(v: &'a str) -> Self {
        Param::Text(v)
    }
}

impl<'a> From<&'a String> for Param<'a> {
    fn from(v: &'a String) -> Self {
        Param::Text(v.as_str())
    }
}

impl<'a> From<&'a [u8]> for Param<'a> {
    fn from(v: &'a [u8]) -> Self {
        Param::Blob(v)
    }
}

impl<'a> From<&'a Vec<u8>> for Param<'a> {
    fn from(v: &'a Vec<u8>) -> Self {
        Param::Blob(v.as_slice())
    }
}

impl<'a, T> From<Option<T>> for Param<'a>
where
    T: Into<Param<'a>>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(Param::Null, Into::into)
    }
}

impl<'a> From<&'a Value> for Param<'a> {
    fn from(v: &'a Value) -> Self {
        match v {
            Value::Null => Param::Null,
            Value::Integer(i) => Param::Integer(*i),
            Value::Float(f) => Param::Float(*f),
            Value::Text(s) => Param::Text(s),
            Value::Blob(b) => Param::Blob(b),
        }
    }
}

/// Builds a `&[Param]` slice from heterogeneous values.
///
/// # Examples
///
/// ```
/// use stmtwrap_core::{Param, params};
///
/// let name = String::from("ada");
/// let list: &[Param<'_>] = params![1, 2.5, &name, None::<i64>];
/// assert_eq!(list.len(), 4);
/// assert_eq!(list[2], Param::Text("ada"));
/// ```
#[macro_export]
macro_rules! params {
    () => {
        &[] as &[$crate::Param<'_>]
    };
    ($($value:expr),+ $(,)?) => {
        &[$($crate::Param::from($value)),+] as &[$crate::Param<'_>]
    };
}

/// An owned column value, typed by what the engine actually stored.
///
/// Serializes untagged, so a row of values renders as plain JSON scalars
/// (blobs become byte arrays).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL `NULL`.
    Null,
    /// Signed integer.
    Integer(i64),
    /// Floating point.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Blob(Vec<u8>),
}

impl Value {
    /// The column type this value was read as.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Integer(_) => ValueType::Integer,
            Value::Float(_) => ValueType::Float,
            Value::Text(_) => ValueType::Text,
            Value::Blob(_) => ValueType::Blob,
        }
    }

    /// Returns `true` for SQL `NULL`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
            Value::Blob(b) => {
                f.write_str("x'")?;
                for byte in b {
                    write!(f, "{byte:02X}")?;
                }
                f.write_str("'")
            }
        }
    }
}
