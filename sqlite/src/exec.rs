//! Row view handed to [`Connection::execute_with`](crate::Connection::execute_with).

use std::borrow::Cow;

/// One result row produced while executing raw SQL.
///
/// Values arrive as text, the way the engine's one-shot execution interface
/// reports them; `None` marks SQL NULL. The row borrows engine memory and
/// is only valid inside the callback.
#[derive(Debug)]
pub struct ExecRow<'a> {
    names: Vec<Cow<'a, str>>,
    values: Vec<Option<Cow<'a, str>>>,
}

impl<'a> ExecRow<'a> {
    pub(crate) fn new(names: Vec<Cow<'a, str>>, values: Vec<Option<Cow<'a, str>>>) -> Self {
        Self { names, values }
    }

    /// Number of columns in the row.
    pub fn column_count(&self) -> usize {
        self.values.len()
    }

    /// Column name at `index`.
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(AsRef::as_ref)
    }

    /// Column value at `index`; `None` for NULL or an out-of-range index.
    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index)?.as_deref()
    }

    /// Value of the first column called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        let index = self.names.iter().position(|n| n == name)?;
        self.value(index)
    }

    /// `(name, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.names
            .iter()
            .map(AsRef::as_ref)
            .zip(self.values.iter().map(Option::as_deref))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ExecRow<'static> {
        ExecRow::new(
            vec!["X".into(), "Quot".into()],
            vec![Some("12".into()), None],
        )
    }

    #[test]
    fn test_value_and_name_lookup() {
        let row = sample();
        assert_eq!(row.column_count(), 2);
        assert_eq!(row.name(0), Some("X"));
        assert_eq!(row.value(0), Some("12"));
        assert_eq!(row.get("X"), Some("12"));
    }

    #[test]
    fn test_null_and_out_of_range_are_none() {
        let row = sample();
        assert_eq!(row.value(1), None);
        assert_eq!(row.get("Quot"), None);
        assert_eq!(row.value(7), None);
        assert_eq!(row.name(7), None);
    }

    #[test]
    fn test_iter_pairs() {
        let row = sample();
        let pairs: Vec<_> = row.iter().collect();
        assert_eq!(pairs, vec![("X", Some("12")), ("Quot", None)]);
    }
}
