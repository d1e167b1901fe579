//! Per-operation options: RETURNING, ON CONFLICT and filters.
//!
//! Every field defaults to "none", so `InsertOptions::default()` builds a
//! plain INSERT and `UpdateOptions::default()` is rejected for lacking a filter.

use crate::error::{StmtError, StmtResult};
use crate::filter::FilterExpr;
use crate::fragment::Fragment;
use crate::ident::Ident;
use crate::record::FromRecord;

/// What a statement hands back after writing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Returning {
    /// `RETURNING *`
    All,
    /// `RETURNING c1, c2`
    Columns(Vec<String>),
}

impl Returning {
    pub fn all() -> Self {
        Returning::All
    }

    pub fn columns<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Returning::Columns(columns.into_iter().map(Into::into).collect())
    }

    /// The declared fields of a record type, in declaration order.
    pub fn of<T: FromRecord>() -> Self {
        Self::columns(T::FIELDS.iter().copied())
    }

    pub(crate) fn write_to(&self, out: &mut Fragment) -> StmtResult<()> {
        out.push(" RETURNING ");
        match self {
            Returning::All => {
                out.push("*");
            }
            Returning::Columns(columns) => {
                if columns.is_empty() {
                    return Err(StmtError::schema_mismatch("RETURNING column list is empty"));
                }
                for (i, column) in columns.iter().enumerate() {
                    if i > 0 {
                        out.push(", ");
                    }
                    out.push_ident(&Ident::column(column)?);
                }
            }
        }
        Ok(())
    }
}

impl From<&str> for Returning {
    /// `"*"` is [`Returning::All`]; anything else is a single column.
    fn from(s: &str) -> Self {
        if s == "*" {
            Returning::All
        } else {
            Returning::Columns(vec![s.to_string()])
        }
    }
}

impl<S: Into<String>> From<Vec<S>> for Returning {
    fn from(columns: Vec<S>) -> Self {
        Returning::columns(columns)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConflictTarget {
    Any,
    Columns(Vec<String>),
    Constraint(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConflictAction {
    DoNothing,
    /// Overwrite with the proposed row. `None` means every inserted column
    /// outside the conflict target.
    DoUpdate(Option<Vec<String>>),
}

/// ON CONFLICT policy for an INSERT.
///
/// # Example
/// ```ignore
/// use pgstmt::Conflict;
///
/// Conflict::do_nothing();                          // ON CONFLICT DO NOTHING
/// Conflict::on_columns(["id"]).do_update();        // ... DO UPDATE SET c = EXCLUDED.c, ...
/// Conflict::on_constraint("currencies_pkey").do_update_only(["currency_name"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub(crate) target: ConflictTarget,
    pub(crate) action: ConflictAction,
}

impl Conflict {
    /// `ON CONFLICT DO NOTHING` for any conflict.
    pub fn do_nothing() -> Self {
        Self {
            target: ConflictTarget::Any,
            action: ConflictAction::DoNothing,
        }
    }

    /// Conflicts on a set of unique columns. Defaults to DO NOTHING.
    pub fn on_columns<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            target: ConflictTarget::Columns(columns.into_iter().map(Into::into).collect()),
            action: ConflictAction::DoNothing,
        }
    }

    /// Conflicts on a named constraint. Defaults to DO NOTHING.
    pub fn on_constraint(name: impl Into<String>) -> Self {
        Self {
            target: ConflictTarget::Constraint(name.into()),
            action: ConflictAction::DoNothing,
        }
    }

    pub fn then_do_nothing(mut self) -> Self {
        self.action = ConflictAction::DoNothing;
        self
    }

    /// Update every inserted column outside the conflict target.
    pub fn do_update(mut self) -> Self {
        self.action = ConflictAction::DoUpdate(None);
        self
    }

    /// Update only the given columns; each must be part of the insert.
    pub fn do_update_only<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.action =
            ConflictAction::DoUpdate(Some(columns.into_iter().map(Into::into).collect()));
        self
    }
}

/// Options for [`crate::PgClient::insert`] and [`crate::PgClient::insert_many`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertOptions {
    pub returning: Option<Returning>,
    pub conflict: Option<Conflict>,
}

impl InsertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returning(mut self, returning: impl Into<Returning>) -> Self {
        self.returning = Some(returning.into());
        self
    }

    pub fn on_conflict(mut self, conflict: Conflict) -> Self {
        self.conflict = Some(conflict);
        self
    }
}

/// Options for [`crate::PgClient::update`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOptions {
    pub returning: Option<Returning>,
    pub filter: Option<FilterExpr>,
    /// Allow an UPDATE without a filter, touching every row.
    pub all_rows: bool,
}

impl UpdateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returning(mut self, returning: impl Into<Returning>) -> Self {
        self.returning = Some(returning.into());
        self
    }

    pub fn filter(mut self, filter: impl Into<FilterExpr>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn all_rows(mut self) -> Self {
        self.all_rows = true;
        self
    }
}

/// Options for [`crate::PgClient::run`] and the `find_*` family.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub filter: Option<FilterExpr>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: impl Into<FilterExpr>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}
