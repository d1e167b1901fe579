//! Ordered column/value pairs supplied to INSERT and UPDATE.

use crate::error::{StmtError, StmtResult};
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};

/// Ordered set of column names and values.
///
/// Column order is insertion order and determines placeholder order.
/// Names are unique and non-empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    fields: Vec<(String, Value)>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from pairs, rejecting duplicate or empty names.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> StmtResult<Self>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut set = Self::new();
        for (name, value) in pairs {
            set.insert(name, value)?;
        }
        Ok(set)
    }

    /// Append a field.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> StmtResult<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(StmtError::invalid_identifier(name, "column name cannot be empty"));
        }
        if self.get(&name).is_some() {
            return Err(StmtError::schema_mismatch(format!(
                "duplicate column '{name}' in field set"
            )));
        }
        self.fields.push((name, value.into()));
        Ok(())
    }

    /// Builder-style [`FieldSet::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> StmtResult<Self> {
        self.insert(name, value)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Same column names, in any order.
    pub fn same_columns(&self, other: &FieldSet) -> bool {
        self.len() == other.len() && self.columns().all(|c| other.contains(c))
    }
}

impl IntoIterator for FieldSet {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// Anything that can supply the fields of one record.
///
/// Implemented for [`FieldSet`], [`crate::Record`], pair lists, maps, JSON
/// objects and, through `#[derive(Record)]`, for plain structs.
pub trait FieldSource {
    fn into_field_set(self) -> StmtResult<FieldSet>;
}

impl FieldSource for FieldSet {
    fn into_field_set(self) -> StmtResult<FieldSet> {
        Ok(self)
    }
}

impl<K: Into<String>, V: Into<Value>> FieldSource for Vec<(K, V)> {
    fn into_field_set(self) -> StmtResult<FieldSet> {
        FieldSet::from_pairs(self)
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> FieldSource for [(K, V); N] {
    fn into_field_set(self) -> StmtResult<FieldSet> {
        FieldSet::from_pairs(self)
    }
}

impl<K: Into<String>, V: Into<Value>> FieldSource for BTreeMap<K, V> {
    fn into_field_set(self) -> StmtResult<FieldSet> {
        FieldSet::from_pairs(self)
    }
}

/// Iteration order of a `HashMap` is unspecified, so placeholder order is too.
impl<K: Into<String>, V: Into<Value>, S> FieldSource for HashMap<K, V, S> {
    fn into_field_set(self) -> StmtResult<FieldSet> {
        FieldSet::from_pairs(self)
    }
}

impl FieldSource for serde_json::Map<String, serde_json::Value> {
    fn into_field_set(self) -> StmtResult<FieldSet> {
        FieldSet::from_pairs(self.into_iter().map(|(k, v)| (k, Value::from_json(v))))
    }
}

impl FieldSource for serde_json::Value {
    fn into_field_set(self) -> StmtResult<FieldSet> {
        match self {
            serde_json::Value::Object(map) => map.into_field_set(),
            other => Err(StmtError::schema_mismatch(format!(
                "expected a JSON object of fields, got {}",
                Value::from_json(other).kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_insertion_order() {
        let set = FieldSet::from_pairs([("id", "EEE"), ("currency_name", "Euro")]).unwrap();
        assert_eq!(set.columns().collect::<Vec<_>>(), ["id", "currency_name"]);
        assert_eq!(set.get("id"), Some(&Value::from("EEE")));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn duplicate_column_is_rejected() {
        let err = FieldSet::from_pairs([("id", 1), ("id", 2)]).unwrap_err();
        assert!(matches!(err, StmtError::SchemaMismatch(_)));
    }

    #[test]
    fn empty_column_is_rejected() {
        let err = FieldSet::new().with("", 1).unwrap_err();
        assert!(matches!(err, StmtError::InvalidIdentifier { .. }));
    }

    #[test]
    fn same_columns_ignores_order() {
        let a = FieldSet::from_pairs([("a", 1), ("b", 2)]).unwrap();
        let b = FieldSet::from_pairs([("b", 3), ("a", 4)]).unwrap();
        let c = FieldSet::from_pairs([("a", 1), ("c", 2)]).unwrap();
        let d = FieldSet::from_pairs([("a", 1)]).unwrap();
        assert!(a.same_columns(&b));
        assert!(!a.same_columns(&c));
        assert!(!a.same_columns(&d));
    }

    #[test]
    fn json_object_is_a_source() {
        let set = json!({"id": "EEE", "rate": 1.5, "active": true})
            .into_field_set()
            .unwrap();
        assert_eq!(set.get("rate"), Some(&Value::Float(1.5)));
        assert_eq!(set.get("active"), Some(&Value::Bool(true)));
    }

    #[test]
    fn json_non_object_is_rejected() {
        assert!(matches!(
            json!([1, 2]).into_field_set(),
            Err(StmtError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn btree_map_is_sorted_by_key() {
        let mut map = BTreeMap::new();
        map.insert("b", 2);
        map.insert("a", 1);
        let set = map.into_field_set().unwrap();
        assert_eq!(set.columns().collect::<Vec<_>>(), ["a", "b"]);
    }
}
