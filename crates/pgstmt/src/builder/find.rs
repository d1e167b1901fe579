use crate::error::{StmtError, StmtResult};
use crate::filter;
use crate::fragment::Statement;
use crate::options::FindOptions;

/// Top-level keywords that may not precede an appended `WHERE`.
const TRAILING_CLAUSES: &[&str] = &[
    "WHERE",
    "GROUP",
    "HAVING",
    "WINDOW",
    "ORDER",
    "LIMIT",
    "OFFSET",
    "FETCH",
    "FOR",
    "RETURNING",
    "UNION",
    "INTERSECT",
    "EXCEPT",
];

/// Append the filter of `options` to a caller-written statement.
///
/// The condition is added as ` WHERE <cond>` with placeholders numbered after
/// the statement's own parameters. Without a filter the statement is
/// returned unchanged.
pub fn build_find(base: Statement, options: &FindOptions) -> StmtResult<Statement> {
    let Some(expr) = &options.filter else {
        return Ok(base);
    };

    let end = appendable_len(base.text())?;
    let condition = filter::compile(expr)?;
    Ok(base.truncate_text(end).append(" WHERE ", condition))
}

fn not_applicable(reason: impl Into<String>) -> StmtError {
    StmtError::FilterNotApplicable(reason.into())
}

/// Length of `sql` without a trailing `;`, whitespace or comments.
///
/// Fails when the statement already has a clause a WHERE cannot follow, at
/// the top level (outside parentheses, quotes and comments).
fn appendable_len(sql: &str) -> StmtResult<usize> {
    let bytes = sql.as_bytes();
    let mut i = 0;
    let mut depth = 0usize;
    let mut end = 0;
    let mut terminated = false;

    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if b == b'-' && bytes.get(i + 1) == Some(&b'-') {
            i = sql[i..].find('\n').map_or(bytes.len(), |pos| i + pos + 1);
            continue;
        }
        if b == b'/' && bytes.get(i + 1) == Some(&b'*') {
            i = skip_block_comment(bytes, i)?;
            continue;
        }
        if terminated {
            return Err(not_applicable("statement text continues after ';'"));
        }

        match b {
            b'\'' => i = skip_quoted(bytes, i, b'\'', false)?,
            b'"' => i = skip_quoted(bytes, i, b'"', false)?,
            b'$' => i = skip_dollar(sql, i)?,
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                depth = depth.saturating_sub(1);
                i += 1;
            }
            b';' if depth == 0 => {
                terminated = true;
                i += 1;
                continue;
            }
            b if is_word_start(b) => {
                let start = i;
                while i < bytes.len() && is_word_char(bytes[i]) {
                    i += 1;
                }
                let word = &sql[start..i];
                if depth == 0
                    && let Some(kw) = TRAILING_CLAUSES.iter().find(|k| word.eq_ignore_ascii_case(k))
                {
                    return Err(not_applicable(format!(
                        "statement already has a top-level {kw} clause"
                    )));
                }
                if word.eq_ignore_ascii_case("e") && bytes.get(i) == Some(&b'\'') {
                    i = skip_quoted(bytes, i, b'\'', true)?;
                }
            }
            _ => i += 1,
        }
        end = i;
    }

    if end == 0 {
        return Err(not_applicable("statement is empty"));
    }
    Ok(end)
}

fn is_word_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_word_char(b: u8) -> bool {
    is_word_start(b) || b.is_ascii_digit() || b == b'$'
}

/// Skip a quoted token starting at `start`; a doubled quote is an escape.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8, backslash_escapes: bool) -> StmtResult<usize> {
    let mut j = start + 1;
    while j < bytes.len() {
        let b = bytes[j];
        if backslash_escapes && b == b'\\' {
            j += 2;
            continue;
        }
        if b == quote {
            if bytes.get(j + 1) == Some(&quote) {
                j += 2;
                continue;
            }
            return Ok(j + 1);
        }
        j += 1;
    }
    Err(not_applicable("unterminated quoted text"))
}

/// Block comments nest.
fn skip_block_comment(bytes: &[u8], start: usize) -> StmtResult<usize> {
    let mut depth = 0usize;
    let mut j = start;
    while j + 1 < bytes.len() {
        match (bytes[j], bytes[j + 1]) {
            (b'/', b'*') => {
                depth += 1;
                j += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                j += 2;
                if depth == 0 {
                    return Ok(j);
                }
            }
            _ => j += 1,
        }
    }
    Err(not_applicable("unterminated block comment"))
}

/// `$1` parameters and `$tag$ ... $tag$` dollar-quoted strings.
fn skip_dollar(sql: &str, start: usize) -> StmtResult<usize> {
    let bytes = sql.as_bytes();
    let mut j = start + 1;
    if bytes.get(j).is_some_and(u8::is_ascii_digit) {
        while bytes.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        return Ok(j);
    }
    while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
        j += 1;
    }
    if bytes.get(j) != Some(&b'$') {
        return Ok(start + 1);
    }
    let tag = &sql[start..=j];
    match sql[j + 1..].find(tag) {
        Some(pos) => Ok(j + 1 + pos + tag.len()),
        None => Err(not_applicable("unterminated dollar-quoted text")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn len_of(sql: &str) -> StmtResult<&str> {
        appendable_len(sql).map(|n| &sql[..n])
    }

    #[test]
    fn plain_select_is_appendable() {
        assert_eq!(len_of("SELECT * FROM currencies").unwrap(), "SELECT * FROM currencies");
        assert_eq!(len_of("SELECT * FROM currencies ;\n").unwrap(), "SELECT * FROM currencies");
        assert_eq!(len_of("SELECT 1 -- note\n").unwrap(), "SELECT 1");
    }

    #[test]
    fn top_level_where_is_rejected() {
        for sql in [
            "SELECT * FROM t WHERE a = 1",
            "select * from t where a = 1",
            "SELECT * FROM t ORDER BY id",
            "SELECT * FROM t LIMIT 5",
            "SELECT a, count(*) FROM t GROUP BY a",
        ] {
            assert!(
                matches!(appendable_len(sql), Err(StmtError::FilterNotApplicable(_))),
                "{sql}"
            );
        }
    }

    #[test]
    fn nested_or_quoted_where_is_ignored() {
        assert!(appendable_len("SELECT * FROM (SELECT * FROM t WHERE a = 1) s").is_ok());
        assert!(appendable_len("SELECT 'where' AS w FROM t").is_ok());
        assert!(appendable_len(r#"SELECT "where" FROM t"#).is_ok());
        assert!(appendable_len("SELECT 1 /* WHERE /* nested */ */ FROM t").is_ok());
        assert!(appendable_len("SELECT $q$ WHERE $q$ FROM t").is_ok());
        assert!(appendable_len(r"SELECT E'it\'s where' FROM t").is_ok());
        assert!(appendable_len("SELECT 'it''s where' FROM t").is_ok());
        assert!(appendable_len("SELECT * FROM t_where_x").is_ok());
    }

    #[test]
    fn multiple_statements_are_rejected() {
        assert!(appendable_len("SELECT 1; SELECT 2").is_err());
        assert!(appendable_len("").is_err());
        assert!(appendable_len("SELECT 'open").is_err());
    }

    #[test]
    fn positional_params_are_not_dollar_quotes() {
        assert!(appendable_len("SELECT * FROM t JOIN u ON u.id = $1").is_ok());
    }
}
