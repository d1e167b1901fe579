//! Statement composition.
//!
//! A [`Fragment`] stores SQL text pieces and parameters separately and only
//! produces `$1, $2, ...` placeholders when it is rendered. Text can enter a
//! fragment in three ways:
//!
//! - `&'static str` keywords and punctuation ([`Fragment::sql`], [`Fragment::push`]),
//! - validated identifiers ([`Fragment::column`], [`Fragment::push_ident`]),
//! - the explicitly unsafe [`Fragment::raw_unchecked`].
//!
//! Values travel as parameters: either bound immediately ([`Fragment::bind`])
//! or as a named placeholder ([`Fragment::placeholder`]) that is resolved from
//! a [`FieldSet`] once per record.
//!
//! # Example
//!
//! ```ignore
//! use pgstmt::{Fragment, Value};
//!
//! let mut q = Fragment::sql("SELECT * FROM currencies WHERE ");
//! q.push_fragment(Fragment::column("id")?).push(" = ").push_bind("EEE");
//! let stmt = q.into_statement();
//! assert_eq!(stmt.text(), "SELECT * FROM currencies WHERE id = $1");
//! # Ok::<(), pgstmt::StmtError>(())
//! ```

use crate::error::{StmtError, StmtResult};
use crate::fields::FieldSet;
use crate::ident::Ident;
use crate::value::Value;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq)]
enum SqlPart {
    Raw(String),
    Param,
}

/// A statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// A value bound at build time.
    Value(Value),
    /// A slot filled from a field set at execution, keyed by column name.
    Named(String),
}

/// A composable piece of statement text with the parameters it introduces.
#[must_use]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    parts: Vec<SqlPart>,
    params: Vec<Param>,
}

impl Fragment {
    /// Create an empty fragment.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fragment holding fixed SQL text.
    pub fn sql(text: &'static str) -> Self {
        let mut f = Self::empty();
        f.push(text);
        f
    }

    /// Fragment holding caller-provided SQL text, used verbatim.
    ///
    /// # Safety
    ///
    /// Nothing is escaped. Only pass text you fully control.
    pub fn raw_unchecked(text: impl Into<String>) -> Self {
        let mut f = Self::empty();
        f.push_raw(&text.into());
        f
    }

    /// Fragment holding a quoted column name.
    pub fn column(name: &str) -> StmtResult<Self> {
        let ident = Ident::column(name)?;
        let mut f = Self::empty();
        f.push_ident(&ident);
        Ok(f)
    }

    /// Fragment holding a value inlined as an escaped SQL literal.
    ///
    /// This bypasses parameter binding; prefer [`Fragment::bind`].
    pub fn literal(value: &Value) -> StmtResult<Self> {
        Ok(Self::raw_unchecked(quote_literal(value)?))
    }

    /// A named placeholder, resolved from a [`FieldSet`] at execution.
    pub fn placeholder(name: impl Into<String>) -> Self {
        let mut f = Self::empty();
        f.push_placeholder(name);
        f
    }

    /// A placeholder with its value bound now.
    pub fn bind(value: impl Into<Value>) -> Self {
        let mut f = Self::empty();
        f.push_bind(value);
        f
    }

    /// Join fragments with a fixed separator.
    pub fn join(separator: &'static str, fragments: impl IntoIterator<Item = Fragment>) -> Self {
        let mut out = Self::empty();
        for (i, fragment) in fragments.into_iter().enumerate() {
            if i > 0 {
                out.push(separator);
            }
            out.push_fragment(fragment);
        }
        out
    }

    /// Append fixed SQL text.
    pub fn push(&mut self, sql: &'static str) -> &mut Self {
        self.push_raw(sql);
        self
    }

    fn push_raw(&mut self, sql: &str) {
        if sql.is_empty() {
            return;
        }
        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(SqlPart::Raw(sql.to_string())),
        }
    }

    /// Append a validated identifier.
    pub fn push_ident(&mut self, ident: &Ident) -> &mut Self {
        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => ident.write_sql(last),
            _ => {
                let mut s = String::new();
                ident.write_sql(&mut s);
                self.parts.push(SqlPart::Raw(s));
            }
        }
        self
    }

    /// Append a placeholder and bind its value.
    pub fn push_bind(&mut self, value: impl Into<Value>) -> &mut Self {
        self.parts.push(SqlPart::Param);
        self.params.push(Param::Value(value.into()));
        self
    }

    /// Append a named placeholder.
    pub fn push_placeholder(&mut self, name: impl Into<String>) -> &mut Self {
        self.parts.push(SqlPart::Param);
        self.params.push(Param::Named(name.into()));
        self
    }

    /// Append another fragment, consuming it.
    pub fn push_fragment(&mut self, other: Fragment) -> &mut Self {
        let mut parts = other.parts.into_iter();
        match parts.next() {
            Some(SqlPart::Raw(first)) => self.push_raw(&first),
            Some(SqlPart::Param) => self.parts.push(SqlPart::Param),
            None => {}
        }
        self.parts.extend(parts);
        self.params.extend(other.params);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Render with placeholders numbered from `$1`.
    pub fn to_sql(&self) -> String {
        self.render(1)
    }

    /// Render with placeholders numbered from `$first`.
    pub(crate) fn render(&self, first: usize) -> String {
        let mut out = String::new();
        let mut idx = first;
        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(s),
                SqlPart::Param => {
                    let _ = write!(out, "${idx}");
                    idx += 1;
                }
            }
        }
        out
    }

    /// Render into an immutable [`Statement`].
    pub fn into_statement(self) -> Statement {
        Statement {
            text: self.to_sql(),
            params: self.params,
        }
    }
}

/// A rendered statement: final text plus parameters in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    text: String,
    params: Vec<Param>,
}

impl Statement {
    /// Statement from caller-written SQL using `$1, $2, ...` placeholders.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    /// Statement from caller-written SQL and its positional parameters.
    pub fn with_params<V: Into<Value>>(
        text: impl Into<String>,
        params: impl IntoIterator<Item = V>,
    ) -> Self {
        Self {
            text: text.into(),
            params: params
                .into_iter()
                .map(|v| Param::Value(v.into()))
                .collect(),
        }
    }

    /// Bind the next positional parameter.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(Param::Value(value.into()));
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Names of the unresolved placeholders, in placeholder order.
    pub fn placeholder_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().filter_map(|p| match p {
            Param::Named(name) => Some(name.as_str()),
            Param::Value(_) => None,
        })
    }

    /// Whether every parameter carries a value.
    pub fn is_bound(&self) -> bool {
        self.params.iter().all(|p| matches!(p, Param::Value(_)))
    }

    /// Parameter values for execution, filling named placeholders from `fields`.
    pub fn resolve(&self, fields: Option<&FieldSet>) -> StmtResult<Vec<Value>> {
        self.params
            .iter()
            .map(|param| match param {
                Param::Value(v) => Ok(v.clone()),
                Param::Named(name) => fields
                    .and_then(|f| f.get(name))
                    .cloned()
                    .ok_or_else(|| {
                        StmtError::schema_mismatch(format!("no value for placeholder '{name}'"))
                    }),
            })
            .collect()
    }

    /// Replace every named placeholder with its value from `fields`.
    pub fn bind_fields(self, fields: &FieldSet) -> StmtResult<Statement> {
        let params = self.resolve(Some(fields))?;
        Ok(Statement {
            text: self.text,
            params: params.into_iter().map(Param::Value).collect(),
        })
    }

    pub(crate) fn truncate_text(mut self, len: usize) -> Statement {
        self.text.truncate(len);
        self
    }

    /// Append a keyword and a fragment, numbering its placeholders after ours.
    pub(crate) fn append(mut self, keyword: &'static str, fragment: Fragment) -> Statement {
        self.text.push_str(keyword);
        self.text.push_str(&fragment.render(self.params.len() + 1));
        self.params.extend(fragment.params);
        self
    }
}

impl From<&str> for Statement {
    fn from(text: &str) -> Self {
        Statement::new(text)
    }
}

impl From<String> for Statement {
    fn from(text: String) -> Self {
        Statement::new(text)
    }
}

impl From<Fragment> for Statement {
    fn from(fragment: Fragment) -> Self {
        fragment.into_statement()
    }
}

/// One statement text executed once per parameter row.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchStatement {
    text: String,
    rows: Vec<Vec<Value>>,
}

impl BatchStatement {
    /// Resolve `template`'s named placeholders once per field set.
    pub fn from_template(template: &Statement, records: &[FieldSet]) -> StmtResult<Self> {
        let rows = records
            .iter()
            .map(|fields| template.resolve(Some(fields)))
            .collect::<StmtResult<Vec<_>>>()?;
        Ok(Self {
            text: template.text.clone(),
            rows,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }
}

/// Escape a value as an SQL literal.
///
/// Literals bypass parameter binding; they exist for building conditions
/// passed to [`crate::FilterExpr::raw_unchecked`].
pub fn quote_literal(value: &Value) -> StmtResult<String> {
    let quoted = match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) if f.is_finite() => f.to_string(),
        Value::Float(f) if f.is_nan() => "'NaN'::float8".to_string(),
        Value::Float(f) if *f > 0.0 => "'Infinity'::float8".to_string(),
        Value::Float(_) => "'-Infinity'::float8".to_string(),
        Value::Text(s) => quote_string(s)?,
        Value::Bytes(b) => {
            let mut hex = String::with_capacity(b.len() * 2 + 16);
            hex.push_str("E'\\\\x");
            for byte in b {
                let _ = write!(hex, "{byte:02x}");
            }
            hex.push_str("'::bytea");
            hex
        }
        Value::Json(j) => format!("{}::jsonb", quote_string(&j.to_string())?),
        Value::Uuid(u) => format!("'{u}'::uuid"),
        Value::Date(d) => format!("'{d}'::date"),
        Value::Timestamp(ts) => format!("'{ts}'::timestamp"),
        Value::TimestampTz(ts) => format!("'{}'::timestamptz", ts.to_rfc3339()),
    };
    Ok(quoted)
}

fn quote_string(s: &str) -> StmtResult<String> {
    if s.contains('\0') {
        return Err(StmtError::invalid_filter_value(
            "<literal>",
            "text literal cannot contain NUL character",
        ));
    }
    let escape_backslashes = s.contains('\\');
    let mut out = String::with_capacity(s.len() + 3);
    if escape_backslashes {
        out.push('E');
    }
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('\'');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_placeholders_in_order() {
        let mut q = Fragment::sql("SELECT * FROM users WHERE a = ");
        q.push_bind(1).push(" AND b = ").push_bind("x");

        assert_eq!(q.to_sql(), "SELECT * FROM users WHERE a = $1 AND b = $2");
        assert_eq!(q.params().len(), 2);
    }

    #[test]
    fn can_compose_fragments() {
        let mut w = Fragment::empty();
        w.push(" WHERE id = ").push_bind(42);

        let mut q = Fragment::sql("SELECT * FROM users");
        q.push_fragment(w);

        assert_eq!(q.to_sql(), "SELECT * FROM users WHERE id = $1");
        assert_eq!(q.params(), [Param::Value(Value::Int(42))]);
    }

    #[test]
    fn fragment_starting_with_param_composes() {
        let mut q = Fragment::sql("VALUES (");
        q.push_fragment(Fragment::join(
            ", ",
            [Fragment::placeholder("a"), Fragment::placeholder("b")],
        ));
        q.push(")");
        assert_eq!(q.to_sql(), "VALUES ($1, $2)");
    }

    #[test]
    fn empty_fragment_adds_no_placeholder() {
        let mut q = Fragment::sql("SELECT 1");
        q.push_fragment(Fragment::empty());
        assert_eq!(q.to_sql(), "SELECT 1");
        assert!(q.params().is_empty());

        let joined = Fragment::join(" AND ", [Fragment::raw_unchecked(""), Fragment::bind(1)]);
        assert_eq!(joined.to_sql(), " AND $1");
        assert_eq!(joined.params().len(), 1);
    }

    #[test]
    fn join_separates_with_fixed_text() {
        let cols = ["id", "currency_name"]
            .into_iter()
            .map(Fragment::column)
            .collect::<StmtResult<Vec<_>>>()
            .unwrap();
        assert_eq!(Fragment::join(", ", cols).to_sql(), "id, currency_name");
        assert!(Fragment::join(", ", Vec::new()).is_empty());
    }

    #[test]
    fn render_offsets_numbering() {
        let f = Fragment::bind(1);
        assert_eq!(f.render(4), "$4");
    }

    #[test]
    fn append_numbers_after_existing_params() {
        let stmt = Statement::with_params("SELECT * FROM t WHERE a = $1", [1]).append(
            " AND ",
            Fragment::join(" AND ", [Fragment::bind(2), Fragment::bind(3)]),
        );
        assert_eq!(stmt.text(), "SELECT * FROM t WHERE a = $1 AND $2 AND $3");
        assert_eq!(stmt.params().len(), 3);
    }

    #[test]
    fn named_placeholders_resolve_from_fields() {
        let stmt = Fragment::join(", ", [Fragment::placeholder("a"), Fragment::placeholder("b")])
            .into_statement();
        assert!(!stmt.is_bound());
        assert_eq!(stmt.placeholder_names().collect::<Vec<_>>(), ["a", "b"]);

        let fields = FieldSet::from_pairs([("b", Value::Int(2)), ("a", Value::Int(1))]).unwrap();
        assert_eq!(
            stmt.resolve(Some(&fields)).unwrap(),
            [Value::Int(1), Value::Int(2)]
        );
        let bound = stmt.bind_fields(&fields).unwrap();
        assert!(bound.is_bound());
    }

    #[test]
    fn unresolved_placeholder_is_schema_mismatch() {
        let stmt = Fragment::placeholder("missing").into_statement();
        assert!(matches!(
            stmt.resolve(None),
            Err(StmtError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn literal_quoting() {
        assert_eq!(quote_literal(&Value::from("it's")).unwrap(), "'it''s'");
        assert_eq!(quote_literal(&Value::from(r"a\b")).unwrap(), r"E'a\\b'");
        assert_eq!(quote_literal(&Value::Int(-3)).unwrap(), "-3");
        assert_eq!(quote_literal(&Value::Null).unwrap(), "NULL");
        assert_eq!(quote_literal(&Value::Bool(true)).unwrap(), "TRUE");
        assert_eq!(
            quote_literal(&Value::Bytes(vec![0xde, 0xad])).unwrap(),
            r"E'\\xdead'::bytea"
        );
        assert_eq!(
            quote_literal(&Value::Json(serde_json::json!({"k": "v"}))).unwrap(),
            r#"'{"k":"v"}'::jsonb"#
        );
        assert!(quote_literal(&Value::from("a\0b")).is_err());
    }

    #[test]
    fn literal_fragment_is_inlined() {
        let mut q = Fragment::column("id").unwrap();
        q.push(" = ")
            .push_fragment(Fragment::literal(&Value::from("EEE")).unwrap());
        assert_eq!(q.to_sql(), "id = 'EEE'");
        assert!(q.params().is_empty());
    }

    #[test]
    fn batch_resolves_each_record() {
        let template = Fragment::join(", ", [Fragment::placeholder("id")]).into_statement();
        let records = vec![
            FieldSet::from_pairs([("id", "A")]).unwrap(),
            FieldSet::from_pairs([("id", "B")]).unwrap(),
        ];
        let batch = BatchStatement::from_template(&template, &records).unwrap();
        assert_eq!(batch.text(), "$1");
        assert_eq!(
            batch.rows(),
            [vec![Value::from("A")], vec![Value::from("B")]]
        );
    }
}
