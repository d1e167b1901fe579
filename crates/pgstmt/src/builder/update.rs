use crate::error::{StmtError, StmtResult};
use crate::fields::FieldSet;
use crate::filter;
use crate::fragment::{Fragment, Statement};
use crate::ident::Ident;
use crate::options::UpdateOptions;

/// Build `UPDATE <t> SET <col> = $n, ... [WHERE <cond>] [RETURNING ..]`.
///
/// A filter is required unless [`UpdateOptions::all_rows`] is set.
pub fn build_update(
    table: &str,
    fields: &FieldSet,
    options: &UpdateOptions,
) -> StmtResult<Statement> {
    let table = Ident::table(table)?;
    if fields.is_empty() {
        return Err(StmtError::schema_mismatch("UPDATE needs at least one field to set"));
    }

    let condition = match &options.filter {
        Some(expr) => Some(filter::compile(expr)?),
        None if options.all_rows => None,
        None => {
            return Err(StmtError::MissingFilter(format!(
                "UPDATE {} has no filter; set all_rows to update every row",
                table.to_sql()
            )));
        }
    };

    let mut q = Fragment::sql("UPDATE ");
    q.push_ident(&table).push(" SET ");
    for (i, column) in fields.columns().enumerate() {
        if i > 0 {
            q.push(", ");
        }
        q.push_ident(&Ident::column(column)?)
            .push(" = ")
            .push_placeholder(column);
    }

    if let Some(condition) = condition {
        q.push(" WHERE ").push_fragment(condition);
    }
    if let Some(returning) = &options.returning {
        returning.write_to(&mut q)?;
    }

    Ok(q.into_statement())
}
