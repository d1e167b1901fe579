//! Declarative filter predicates and their compilation to WHERE conditions.
//!
//! A [`FilterExpr`] is one [`Predicate`], a list of predicates combined with
//! `AND`, or a raw condition string. [`compile`] turns it into a
//! [`Fragment`] whose values are all bound parameters.
//!
//! # Example
//! ```ignore
//! use pgstmt::filter::{compile, FilterExpr, Predicate};
//!
//! let expr = FilterExpr::all([
//!     Predicate::in_list("id", ["1"]),
//!     Predicate::eq("id", "1"),
//! ]);
//! assert_eq!(compile(&expr)?.to_sql(), "id IN ($1) AND id = $2");
//! # Ok::<(), pgstmt::StmtError>(())
//! ```

use crate::error::{StmtError, StmtResult};
use crate::fragment::Fragment;
use crate::ident::Ident;
use crate::value::Value;
use std::fmt;
use std::str::FromStr;

/// Filter operator vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `col = $n`
    Equal,
    /// `col IS NULL`
    IsNull,
    /// `col > $n`
    Higher,
    /// `col >= $n`
    HigherEqual,
    /// `col < $n`
    Lower,
    /// `col <= $n`
    LowerEqual,
    /// `col IN ($n, ...)`
    In,
}

impl Operator {
    pub const ALL: [Operator; 7] = [
        Operator::Equal,
        Operator::IsNull,
        Operator::Higher,
        Operator::HigherEqual,
        Operator::Lower,
        Operator::LowerEqual,
        Operator::In,
    ];

    /// Vocabulary name, e.g. `HIGHER_EQUAL`.
    pub fn name(self) -> &'static str {
        match self {
            Operator::Equal => "EQUAL",
            Operator::IsNull => "IS_NULL",
            Operator::Higher => "HIGHER",
            Operator::HigherEqual => "HIGHER_EQUAL",
            Operator::Lower => "LOWER",
            Operator::LowerEqual => "LOWER_EQUAL",
            Operator::In => "IN",
        }
    }

    fn sql(self) -> &'static str {
        match self {
            Operator::Equal => " = ",
            Operator::IsNull => " IS NULL",
            Operator::Higher => " > ",
            Operator::HigherEqual => " >= ",
            Operator::Lower => " < ",
            Operator::LowerEqual => " <= ",
            Operator::In => " IN (",
        }
    }

    /// Whether the operator needs a value.
    pub fn takes_value(self) -> bool {
        !matches!(self, Operator::IsNull)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operator {
    type Err = StmtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| StmtError::UnknownOperator(s.to_string()))
    }
}

/// Value attached to a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Scalar(Value),
    List(Vec<Value>),
}

impl FilterValue {
    pub fn scalar(value: impl Into<Value>) -> Self {
        FilterValue::Scalar(value.into())
    }

    pub fn list<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        FilterValue::List(values.into_iter().map(Into::into).collect())
    }

    /// JSON arrays become lists, everything else a scalar.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Array(items) => {
                FilterValue::List(items.into_iter().map(Value::from_json).collect())
            }
            other => FilterValue::Scalar(Value::from_json(other)),
        }
    }
}

/// A single `{column, operator, value?}` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub operator: Operator,
    pub value: Option<FilterValue>,
}

impl Predicate {
    pub fn new(column: impl Into<String>, operator: Operator, value: Option<FilterValue>) -> Self {
        Self {
            column: column.into(),
            operator,
            value,
        }
    }

    fn scalar(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self::new(column, operator, Some(FilterValue::scalar(value)))
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::scalar(column, Operator::Equal, value)
    }

    pub fn higher(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::scalar(column, Operator::Higher, value)
    }

    pub fn higher_equal(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::scalar(column, Operator::HigherEqual, value)
    }

    pub fn lower(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::scalar(column, Operator::Lower, value)
    }

    pub fn lower_equal(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::scalar(column, Operator::LowerEqual, value)
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::new(column, Operator::IsNull, None)
    }

    pub fn in_list<V: Into<Value>>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::new(column, Operator::In, Some(FilterValue::list(values)))
    }

    fn compile_into(&self, out: &mut Fragment) -> StmtResult<()> {
        let column = Ident::column(&self.column)?;
        let missing = || StmtError::MissingFilterValue {
            column: self.column.clone(),
            operator: self.operator.name(),
        };

        out.push_ident(&column).push(self.operator.sql());

        match (self.operator, &self.value) {
            (Operator::IsNull, _) => {}
            (_, None) | (_, Some(FilterValue::Scalar(Value::Null))) => return Err(missing()),
            (_, Some(FilterValue::Scalar(Value::Text(text)))) if text.is_empty() => {
                return Err(missing());
            }
            (Operator::In, Some(FilterValue::List(values))) => {
                if values.is_empty() {
                    return Err(missing());
                }
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        out.push(", ");
                    }
                    out.push_bind(value.clone());
                }
                out.push(")");
            }
            (Operator::In, Some(FilterValue::Scalar(_))) => {
                return Err(StmtError::invalid_filter_value(
                    &self.column,
                    "IN requires a list of values",
                ));
            }
            (op, Some(FilterValue::List(_))) => {
                return Err(StmtError::invalid_filter_value(
                    &self.column,
                    format!("{op} requires a single value, got a list"),
                ));
            }
            (_, Some(FilterValue::Scalar(value))) => {
                out.push_bind(value.clone());
            }
        }
        Ok(())
    }
}

/// A filter: one predicate, an AND-ed list, or raw condition text.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Predicate(Predicate),
    All(Vec<Predicate>),
    /// Raw condition text, inserted verbatim.
    Raw(String),
}

impl FilterExpr {
    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        FilterExpr::All(predicates.into_iter().collect())
    }

    /// Raw condition text, used without any escaping.
    ///
    /// # Safety
    ///
    /// Be careful with SQL injection; only pass text you fully control.
    pub fn raw_unchecked(condition: impl Into<String>) -> Self {
        FilterExpr::Raw(condition.into())
    }

    /// Decode a filter from JSON.
    ///
    /// Accepts a string (raw condition), an object
    /// `{"column": .., "operator": .., "value": ..}` or an array of such objects.
    pub fn from_json(json: serde_json::Value) -> StmtResult<Self> {
        match json {
            serde_json::Value::String(s) => Ok(FilterExpr::Raw(s)),
            serde_json::Value::Object(_) => predicate_from_json(json).map(FilterExpr::Predicate),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(predicate_from_json)
                .collect::<StmtResult<Vec<_>>>()
                .map(FilterExpr::All),
            other => Err(StmtError::invalid_filter_value(
                "<filter>",
                format!("expected string, object or array, got {other}"),
            )),
        }
    }
}

impl From<Predicate> for FilterExpr {
    fn from(predicate: Predicate) -> Self {
        FilterExpr::Predicate(predicate)
    }
}

impl From<Vec<Predicate>> for FilterExpr {
    fn from(predicates: Vec<Predicate>) -> Self {
        FilterExpr::All(predicates)
    }
}

fn predicate_from_json(json: serde_json::Value) -> StmtResult<Predicate> {
    let serde_json::Value::Object(mut map) = json else {
        return Err(StmtError::invalid_filter_value(
            "<filter>",
            format!("expected a predicate object, got {json}"),
        ));
    };
    let column = match map.remove("column") {
        Some(serde_json::Value::String(c)) => c,
        _ => {
            return Err(StmtError::invalid_filter_value(
                "<filter>",
                "predicate needs a string 'column'",
            ));
        }
    };
    let operator = match map.remove("operator") {
        Some(serde_json::Value::String(op)) => op.parse::<Operator>()?,
        Some(other) => return Err(StmtError::UnknownOperator(other.to_string())),
        None => return Err(StmtError::UnknownOperator(String::new())),
    };
    let value = map.remove("value").map(FilterValue::from_json);
    Ok(Predicate::new(column, operator, value))
}

/// Compile a filter into a WHERE condition (without the `WHERE` keyword).
pub fn compile(expr: &FilterExpr) -> StmtResult<Fragment> {
    let mut out = Fragment::empty();
    match expr {
        FilterExpr::Predicate(p) => p.compile_into(&mut out)?,
        FilterExpr::All(predicates) => {
            if predicates.is_empty() {
                return Err(StmtError::MissingFilter(
                    "filter list contains no predicates".to_string(),
                ));
            }
            for (i, p) in predicates.iter().enumerate() {
                if i > 0 {
                    out.push(" AND ");
                }
                p.compile_into(&mut out)?;
            }
        }
        FilterExpr::Raw(condition) => {
            if condition.trim().is_empty() {
                return Err(StmtError::MissingFilter(
                    "raw filter condition is empty".to_string(),
                ));
            }
            out.push_fragment(Fragment::raw_unchecked(condition.as_str()));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::Param;
    use serde_json::json;

    fn values(f: &Fragment) -> Vec<Value> {
        f.params()
            .iter()
            .map(|p| match p {
                Param::Value(v) => v.clone(),
                Param::Named(n) => panic!("unexpected named param {n}"),
            })
            .collect()
    }

    #[test]
    fn in_and_equal_are_and_ed() {
        let expr = FilterExpr::all([Predicate::in_list("id", ["1"]), Predicate::eq("id", "1")]);
        let f = compile(&expr).unwrap();
        assert_eq!(f.to_sql(), "id IN ($1) AND id = $2");
        assert_eq!(values(&f), [Value::from("1"), Value::from("1")]);
    }

    #[test]
    fn in_expands_one_param_per_element() {
        let f = compile(&Predicate::in_list("id", [1, 2, 3]).into()).unwrap();
        assert_eq!(f.to_sql(), "id IN ($1, $2, $3)");
        assert_eq!(f.params().len(), 3);
    }

    #[test]
    fn comparison_operators() {
        let cases = [
            (Predicate::higher("rate", 1), "rate > $1"),
            (Predicate::higher_equal("rate", 1), "rate >= $1"),
            (Predicate::lower("rate", 1), "rate < $1"),
            (Predicate::lower_equal("rate", 1), "rate <= $1"),
            (Predicate::eq("rate", 1), "rate = $1"),
        ];
        for (p, sql) in cases {
            assert_eq!(compile(&p.into()).unwrap().to_sql(), sql);
        }
    }

    #[test]
    fn is_null_binds_nothing() {
        let f = compile(&Predicate::is_null("deleted_at").into()).unwrap();
        assert_eq!(f.to_sql(), "deleted_at IS NULL");
        assert!(f.params().is_empty());
    }

    #[test]
    fn columns_needing_quotes_are_quoted() {
        let f = compile(&Predicate::eq("currencyName", "Euro").into()).unwrap();
        assert_eq!(f.to_sql(), r#""currencyName" = $1"#);
    }

    #[test]
    fn missing_value_is_rejected() {
        let p = Predicate::new("id", Operator::Equal, None);
        assert!(matches!(
            compile(&p.into()),
            Err(StmtError::MissingFilterValue { operator: "EQUAL", .. })
        ));

        let p = Predicate::eq("id", Value::Null);
        assert!(matches!(
            compile(&p.into()),
            Err(StmtError::MissingFilterValue { .. })
        ));
    }

    #[test]
    fn empty_text_is_missing_value() {
        let p = Predicate::eq("currency_name", "");
        assert!(matches!(
            compile(&p.into()),
            Err(StmtError::MissingFilterValue { operator: "EQUAL", .. })
        ));

        let p = Predicate::higher("rate", 0);
        assert_eq!(compile(&p.into()).unwrap().to_sql(), "rate > $1");
    }

    #[test]
    fn empty_in_list_is_missing_value() {
        let p = Predicate::in_list("id", Vec::<i64>::new());
        assert!(matches!(
            compile(&p.into()),
            Err(StmtError::MissingFilterValue { operator: "IN", .. })
        ));
    }

    #[test]
    fn shape_mismatch_is_invalid_value() {
        let p = Predicate::new("id", Operator::In, Some(FilterValue::scalar(1)));
        assert!(matches!(
            compile(&p.into()),
            Err(StmtError::InvalidFilterValue { .. })
        ));

        let p = Predicate::new("id", Operator::Equal, Some(FilterValue::list([1, 2])));
        assert!(matches!(
            compile(&p.into()),
            Err(StmtError::InvalidFilterValue { .. })
        ));
    }

    #[test]
    fn empty_list_and_blank_raw_are_missing_filter() {
        assert!(matches!(
            compile(&FilterExpr::All(vec![])),
            Err(StmtError::MissingFilter(_))
        ));
        assert!(matches!(
            compile(&FilterExpr::raw_unchecked("  ")),
            Err(StmtError::MissingFilter(_))
        ));
    }

    #[test]
    fn raw_is_verbatim() {
        let f = compile(&FilterExpr::raw_unchecked("rate > 1 OR id = 'EEE'")).unwrap();
        assert_eq!(f.to_sql(), "rate > 1 OR id = 'EEE'");
        assert!(f.params().is_empty());
    }

    #[test]
    fn operator_names_round_trip() {
        for op in Operator::ALL {
            assert_eq!(op.name().parse::<Operator>().unwrap(), op);
        }
        assert!(matches!(
            "LIKE".parse::<Operator>(),
            Err(StmtError::UnknownOperator(name)) if name == "LIKE"
        ));
    }

    #[test]
    fn decodes_json_filters() {
        let expr = FilterExpr::from_json(json!([
            {"column": "id", "operator": "IN", "value": ["1"]},
            {"column": "id", "operator": "EQUAL", "value": "1"},
        ]))
        .unwrap();
        assert_eq!(compile(&expr).unwrap().to_sql(), "id IN ($1) AND id = $2");

        assert_eq!(
            FilterExpr::from_json(json!("1 = 1")).unwrap(),
            FilterExpr::raw_unchecked("1 = 1")
        );
    }

    #[test]
    fn json_with_unknown_operator_fails() {
        let err =
            FilterExpr::from_json(json!({"column": "id", "operator": "LIKE", "value": "x"}))
                .unwrap_err();
        assert!(matches!(err, StmtError::UnknownOperator(_)));

        let err = FilterExpr::from_json(json!({"column": "id"})).unwrap_err();
        assert!(matches!(err, StmtError::UnknownOperator(_)));

        let err = FilterExpr::from_json(json!(42)).unwrap_err();
        assert!(matches!(err, StmtError::InvalidFilterValue { .. }));
    }
}
