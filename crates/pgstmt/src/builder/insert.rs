use crate::error::{StmtError, StmtResult};
use crate::fields::FieldSet;
use crate::fragment::{BatchStatement, Fragment, Statement};
use crate::ident::Ident;
use crate::options::{Conflict, ConflictAction, ConflictTarget, InsertOptions};

/// Build `INSERT INTO <t> (<cols>) VALUES (<placeholders>) [ON CONFLICT ..] [RETURNING ..]`.
///
/// Placeholders are named after the columns of `fields`, in the same order.
/// An empty field set inserts `DEFAULT VALUES`.
pub fn build_insert(
    table: &str,
    fields: &FieldSet,
    options: &InsertOptions,
) -> StmtResult<Statement> {
    let table = Ident::table(table)?;
    let columns = fields
        .columns()
        .map(Ident::column)
        .collect::<StmtResult<Vec<_>>>()?;

    let mut q = Fragment::sql("INSERT INTO ");
    q.push_ident(&table);

    if columns.is_empty() {
        q.push(" DEFAULT VALUES");
    } else {
        q.push(" (");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                q.push(", ");
            }
            q.push_ident(column);
        }
        q.push(") VALUES (");
        q.push_fragment(Fragment::join(
            ", ",
            fields.columns().map(Fragment::placeholder),
        ));
        q.push(")");
    }

    if let Some(conflict) = &options.conflict {
        write_conflict(&mut q, conflict, fields)?;
    }
    if let Some(returning) = &options.returning {
        returning.write_to(&mut q)?;
    }

    Ok(q.into_statement())
}

/// Build one INSERT for a batch of records sharing the same columns.
///
/// Column order may differ between records; values are matched by name.
pub fn build_insert_batch(
    table: &str,
    records: &[FieldSet],
    options: &InsertOptions,
) -> StmtResult<BatchStatement> {
    let Some(first) = records.first() else {
        return Err(StmtError::schema_mismatch("batch insert needs at least one record"));
    };
    if let Some(pos) = records.iter().position(|r| !r.same_columns(first)) {
        return Err(StmtError::schema_mismatch(format!(
            "record {pos} has columns ({}) but record 0 has ({})",
            records[pos].columns().collect::<Vec<_>>().join(", "),
            first.columns().collect::<Vec<_>>().join(", "),
        )));
    }

    let template = build_insert(table, first, options)?;
    BatchStatement::from_template(&template, records)
}

fn write_conflict(q: &mut Fragment, conflict: &Conflict, fields: &FieldSet) -> StmtResult<()> {
    q.push(" ON CONFLICT");

    let target_columns: &[String] = match &conflict.target {
        ConflictTarget::Any => &[],
        ConflictTarget::Columns(columns) => {
            if columns.is_empty() {
                return Err(StmtError::schema_mismatch(
                    "ON CONFLICT column list is empty",
                ));
            }
            q.push(" (");
            for (i, column) in columns.iter().enumerate() {
                if i > 0 {
                    q.push(", ");
                }
                q.push_ident(&Ident::column(column)?);
            }
            q.push(")");
            columns
        }
        ConflictTarget::Constraint(name) => {
            q.push(" ON CONSTRAINT ");
            q.push_ident(&Ident::column(name)?);
            &[]
        }
    };

    let update = match &conflict.action {
        ConflictAction::DoNothing => {
            q.push(" DO NOTHING");
            return Ok(());
        }
        ConflictAction::DoUpdate(_) if conflict.target == ConflictTarget::Any => {
            return Err(StmtError::schema_mismatch(
                "ON CONFLICT DO UPDATE needs conflict columns or a constraint",
            ));
        }
        ConflictAction::DoUpdate(Some(columns)) => {
            if let Some(missing) = columns.iter().find(|c| !fields.contains(c)) {
                return Err(StmtError::schema_mismatch(format!(
                    "ON CONFLICT DO UPDATE column '{missing}' is not part of the insert"
                )));
            }
            columns.iter().map(String::as_str).collect::<Vec<_>>()
        }
        ConflictAction::DoUpdate(None) => fields
            .columns()
            .filter(|c| !target_columns.iter().any(|t| t == c))
            .collect(),
    };

    if update.is_empty() {
        return Err(StmtError::schema_mismatch(
            "ON CONFLICT DO UPDATE has no columns to update",
        ));
    }

    q.push(" DO UPDATE SET ");
    for (i, column) in update.into_iter().enumerate() {
        let ident = Ident::column(column)?;
        if i > 0 {
            q.push(", ");
        }
        q.push_ident(&ident).push(" = EXCLUDED.").push_ident(&ident);
    }
    Ok(())
}
