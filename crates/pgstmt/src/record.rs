//! Result rows and typed record mapping.

use crate::error::{StmtError, StmtResult};
use crate::fields::{FieldSet, FieldSource};
use crate::value::{FromValue, Value};
use std::sync::Arc;

/// One result row: column names (shared by every row of a result) and values.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Record {
    /// Build a record. `values` must be as long as `columns`.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> StmtResult<Self> {
        if columns.len() != values.len() {
            return Err(StmtError::schema_mismatch(format!(
                "row has {} values for {} columns",
                values.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, values })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of the first column with this name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Typed access, returning [`StmtError::Projection`] on failure.
    ///
    /// An absent column is an error unless the target type has a default for
    /// it (`Option<T>` reads an absent column as `None`).
    pub fn try_get<T: FromValue>(&self, column: &str) -> StmtResult<T> {
        match self.get(column) {
            Some(value) => {
                T::from_value(value).map_err(|e| StmtError::projection(column, e.to_string()))
            }
            None => T::missing()
                .ok_or_else(|| StmtError::projection(column, "column not present in row")),
        }
    }

    /// Project into a record type.
    pub fn to_typed<T: FromRecord>(&self) -> StmtResult<T> {
        T::from_record(self)
    }

    /// JSON object keyed by column name.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.iter()
                .map(|(c, v)| (c.to_string(), v.to_json()))
                .collect(),
        )
    }
}

impl FieldSource for Record {
    fn into_field_set(self) -> StmtResult<FieldSet> {
        FieldSet::from_pairs(self.columns.iter().cloned().zip(self.values))
    }
}

/// A type whose values can be built from a [`Record`].
///
/// Usually derived with `#[derive(Record)]`.
///
/// # Example
///
/// ```ignore
/// use pgstmt::Record;
///
/// #[derive(Record)]
/// struct Currency {
///     id: String,
///     currency_name: String,
///     rate: Option<f64>,
/// }
/// ```
pub trait FromRecord: Sized {
    /// Field names in declaration order.
    const FIELDS: &'static [&'static str];

    fn from_record(record: &Record) -> StmtResult<Self>;
}

impl FromRecord for Record {
    const FIELDS: &'static [&'static str] = &[];

    fn from_record(record: &Record) -> StmtResult<Self> {
        Ok(record.clone())
    }
}
