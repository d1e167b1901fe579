//! Buffered statement results.

use crate::error::StmtResult;
use crate::record::{FromRecord, Record};
use std::collections::VecDeque;
use std::sync::Arc;

/// Result of one executed statement or batch.
///
/// Rows are fully buffered before the session is released, so a cursor never
/// holds a connection. Fetching consumes rows front to back.
///
/// A cursor is single-use and cannot be cloned:
///
/// ```compile_fail
/// fn assert_clone<T: Clone>() {}
/// assert_clone::<pgstmt::Cursor>();
/// ```
#[derive(Debug, Default)]
pub struct Cursor {
    columns: Arc<[String]>,
    rows: VecDeque<Record>,
    rows_affected: u64,
}

impl Cursor {
    pub(crate) fn new(columns: Arc<[String]>, rows: Vec<Record>, rows_affected: u64) -> Self {
        Self {
            columns,
            rows: rows.into(),
            rows_affected,
        }
    }

    /// Column names of the result (empty when nothing was returned).
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows inserted, updated or selected by the statement.
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    /// Rows not yet fetched.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    /// Next row, or `None` when exhausted.
    pub fn fetch_one(&mut self) -> Option<Record> {
        self.rows.pop_front()
    }

    /// Next row projected into `T`.
    pub fn fetch_one_as<T: FromRecord>(&mut self) -> StmtResult<Option<T>> {
        self.fetch_one().map(|r| T::from_record(&r)).transpose()
    }

    /// Every remaining row. Empty when there are none.
    pub fn fetch_all(&mut self) -> Vec<Record> {
        self.rows.drain(..).collect()
    }

    /// Every remaining row projected into `T`; fails on the first row that
    /// does not project.
    pub fn fetch_all_as<T: FromRecord>(&mut self) -> StmtResult<Vec<T>> {
        self.rows.drain(..).map(|r| T::from_record(&r)).collect()
    }

    /// Discard remaining rows.
    pub fn close(self) {}
}

impl Iterator for Cursor {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        self.fetch_one()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StmtError;
    use crate::value::Value;

    struct Code(String);

    impl FromRecord for Code {
        const FIELDS: &'static [&'static str] = &["id"];

        fn from_record(record: &Record) -> StmtResult<Self> {
            Ok(Code(record.try_get("id")?))
        }
    }

    fn cursor(ids: &[&str]) -> Cursor {
        let columns: Arc<[String]> = Arc::from(vec!["id".to_string()]);
        let rows = ids
            .iter()
            .map(|id| Record::new(columns.clone(), vec![Value::from(*id)]).unwrap())
            .collect();
        Cursor::new(columns, rows, ids.len() as u64)
    }

    #[test]
    fn fetch_one_walks_rows() {
        let mut c = cursor(&["A", "B"]);
        assert_eq!(c.remaining(), 2);
        assert_eq!(c.fetch_one().unwrap().get("id"), Some(&Value::from("A")));
        assert_eq!(c.fetch_one_as::<Code>().unwrap().unwrap().0, "B");
        assert!(c.fetch_one().is_none());
        assert!(c.fetch_one_as::<Code>().unwrap().is_none());
    }

    #[test]
    fn fetch_all_on_empty_is_empty_vec() {
        let mut c = Cursor::default();
        assert!(c.fetch_all().is_empty());
        assert!(c.fetch_all_as::<Code>().unwrap().is_empty());
        assert_eq!(c.rows_affected(), 0);
    }

    #[test]
    fn fetch_all_as_projects_every_row() {
        let mut c = cursor(&["A", "B", "C"]);
        let codes: Vec<String> = c.fetch_all_as::<Code>().unwrap().into_iter().map(|c| c.0).collect();
        assert_eq!(codes, ["A", "B", "C"]);
        assert_eq!(c.rows_affected(), 3);
    }

    #[test]
    fn projection_failure_surfaces() {
        let columns: Arc<[String]> = Arc::from(vec!["other".to_string()]);
        let row = Record::new(columns.clone(), vec![Value::Int(1)]).unwrap();
        let mut c = Cursor::new(columns, vec![row], 1);
        assert!(matches!(
            c.fetch_all_as::<Code>(),
            Err(StmtError::Projection { .. })
        ));
    }
}
