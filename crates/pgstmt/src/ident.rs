//! Safe SQL identifier handling.
//!
//! [`Ident`] is a validated, possibly schema-qualified name. Rendering quotes
//! each part unless it is a lowercase simple identifier that is not a reserved
//! keyword, so `id` stays `id` while `currencyName` becomes `"currencyName"`.
//!
//! - Column names are taken as a single part, verbatim (any characters except NUL).
//! - Table names may be dotted (`public.currencies`) with quoted parts
//!   (`"My Schema".items`); unquoted parts are validated against
//!   `[A-Za-z_][A-Za-z0-9_$]*`.
//!
//! # Example
//! ```ignore
//! use pgstmt::Ident;
//!
//! assert_eq!(Ident::column("id")?.to_sql(), "id");
//! assert_eq!(Ident::column("Currency Name")?.to_sql(), r#""Currency Name""#);
//! assert_eq!(Ident::table(r#"public."Rates""#)?.to_sql(), r#"public."Rates""#);
//! # Ok::<(), pgstmt::StmtError>(())
//! ```

use crate::error::{StmtError, StmtResult};

/// Reserved keywords (reserved and reserved-can-be-function-or-type) that
/// cannot appear bare as a column or table name. Sorted for binary search.
const RESERVED: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric",
    "authorization", "binary", "both", "case", "cast", "check", "collate", "collation",
    "column", "concurrently", "constraint", "create", "cross", "current_catalog",
    "current_date", "current_role", "current_schema", "current_time", "current_timestamp",
    "current_user", "default", "deferrable", "desc", "distinct", "do", "else", "end",
    "except", "false", "fetch", "for", "foreign", "freeze", "from", "full", "grant", "group",
    "having", "ilike", "in", "initially", "inner", "intersect", "into", "is", "isnull",
    "join", "lateral", "leading", "left", "like", "limit", "localtime", "localtimestamp",
    "natural", "not", "notnull", "null", "offset", "on", "only", "or", "order", "outer",
    "overlaps", "placing", "primary", "references", "returning", "right", "select",
    "session_user", "similar", "some", "symmetric", "system_user", "table", "tablesample",
    "then", "to", "trailing", "true", "union", "unique", "user", "using", "variadic",
    "verbose", "when", "where", "window", "with",
];

/// A SQL identifier (column, table, or schema-qualified table name).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    parts: Vec<String>,
}

impl Ident {
    /// A single-part identifier, taken verbatim.
    pub fn column(name: &str) -> StmtResult<Self> {
        check_part(name, name)?;
        Ok(Self {
            parts: vec![name.to_string()],
        })
    }

    /// Parse a possibly qualified table name.
    ///
    /// - Dotted: `schema.table`
    /// - Quoted: `"CamelCase"."UserTable"`
    /// - Mixed: `public."UserTable"`
    pub fn table(s: &str) -> StmtResult<Self> {
        let invalid = |reason: &str| StmtError::invalid_identifier(s, reason);
        if s.is_empty() {
            return Err(invalid("identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(invalid("identifier cannot contain NUL character"));
        }

        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();

        while chars.peek().is_some() {
            if !parts.is_empty() {
                match chars.next() {
                    Some('.') if chars.peek().is_none() => {
                        return Err(invalid("trailing '.' in identifier"));
                    }
                    Some('.') => {}
                    Some(c) => {
                        return Err(invalid(&format!(
                            "expected '.' between identifier parts, got '{c}'"
                        )));
                    }
                    None => break,
                }
            }

            if chars.peek() == Some(&'"') {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('"') if chars.peek() == Some(&'"') => {
                            chars.next();
                            name.push('"');
                        }
                        Some('"') => break,
                        Some(c) => name.push(c),
                        None => return Err(invalid("unclosed quoted identifier")),
                    }
                }
                if name.is_empty() {
                    return Err(invalid("empty quoted identifier"));
                }
                parts.push(name);
                continue;
            }

            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                let ok = if name.is_empty() {
                    c == '_' || c.is_ascii_alphabetic()
                } else {
                    c == '_' || c == '$' || c.is_ascii_alphanumeric()
                };
                if !ok {
                    return Err(invalid(&format!("invalid character in identifier: '{c}'")));
                }
                name.push(c);
                chars.next();
            }
            if name.is_empty() {
                return Err(invalid("empty identifier segment"));
            }
            parts.push(name);
        }

        Ok(Self { parts })
    }

    /// Name parts, unquoted.
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        self.write_sql(&mut out);
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            if is_bare(part) {
                out.push_str(part);
            } else {
                out.push('"');
                for ch in part.chars() {
                    if ch == '"' {
                        out.push('"');
                    }
                    out.push(ch);
                }
                out.push('"');
            }
        }
    }
}

fn check_part(full: &str, part: &str) -> StmtResult<()> {
    if part.is_empty() {
        return Err(StmtError::invalid_identifier(full, "identifier cannot be empty"));
    }
    if part.contains('\0') {
        return Err(StmtError::invalid_identifier(
            full,
            "identifier cannot contain NUL character",
        ));
    }
    Ok(())
}

/// Whether `name` reads back unchanged when written without quotes.
fn is_bare(name: &str) -> bool {
    let mut bytes = name.bytes();
    let starts_ok = matches!(bytes.next(), Some(b'a'..=b'z' | b'_'));
    starts_ok
        && bytes.all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_' | b'$'))
        && RESERVED.binary_search(&name).is_err()
}

/// Quote a column name for direct inclusion in statement text.
pub fn quote_identifier(name: &str) -> StmtResult<String> {
    Ident::column(name).map(|ident| ident.to_sql())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_list_is_sorted() {
        assert!(RESERVED.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn simple_lowercase_stays_bare() {
        assert_eq!(quote_identifier("id").unwrap(), "id");
        assert_eq!(quote_identifier("currency_name").unwrap(), "currency_name");
        assert_eq!(quote_identifier("my_var$1").unwrap(), "my_var$1");
    }

    #[test]
    fn mixed_case_and_spaces_are_quoted() {
        assert_eq!(quote_identifier("currencyName").unwrap(), r#""currencyName""#);
        assert_eq!(quote_identifier("Currency Name").unwrap(), r#""Currency Name""#);
        assert_eq!(quote_identifier("1col").unwrap(), r#""1col""#);
    }

    #[test]
    fn reserved_words_are_quoted() {
        assert_eq!(quote_identifier("order").unwrap(), r#""order""#);
        assert_eq!(quote_identifier("user").unwrap(), r#""user""#);
        assert_eq!(quote_identifier("type").unwrap(), "type");
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        assert_eq!(
            quote_identifier(r#"x"; DROP TABLE t; --"#).unwrap(),
            r#""x""; DROP TABLE t; --""#
        );
    }

    #[test]
    fn column_rejects_empty_and_nul() {
        assert!(matches!(
            Ident::column(""),
            Err(StmtError::InvalidIdentifier { .. })
        ));
        assert!(Ident::column("a\0b").is_err());
    }

    #[test]
    fn table_dotted() {
        let ident = Ident::table("public.currencies").unwrap();
        assert_eq!(ident.parts(), ["public", "currencies"]);
        assert_eq!(ident.to_sql(), "public.currencies");
    }

    #[test]
    fn table_quoted_with_escape() {
        let ident = Ident::table(r#""has""quote""#).unwrap();
        assert_eq!(ident.parts(), [r#"has"quote"#]);
        assert_eq!(ident.to_sql(), r#""has""quote""#);
    }

    #[test]
    fn table_mixed_quoted_unquoted() {
        let ident = Ident::table(r#"public."UserTable""#).unwrap();
        assert_eq!(ident.to_sql(), r#"public."UserTable""#);
    }

    #[test]
    fn table_unquoted_uppercase_is_preserved() {
        assert_eq!(Ident::table("Currencies").unwrap().to_sql(), r#""Currencies""#);
    }

    #[test]
    fn table_rejects_unsafe() {
        assert!(Ident::table("").is_err());
        assert!(Ident::table("1table").is_err());
        assert!(Ident::table("my table").is_err());
        assert!(Ident::table("schema..table").is_err());
        assert!(Ident::table("schema.").is_err());
        assert!(Ident::table(r#""unclosed"#).is_err());
        assert!(Ident::table("users; drop table users; --").is_err());
    }
}
