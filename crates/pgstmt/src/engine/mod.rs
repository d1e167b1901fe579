//! Statement execution.
//!
//! The [`Executor`] runs one statement (or one batch) per call on a freshly
//! acquired session and releases that session on every path, including
//! errors. Sessions come from a [`ConnectionProvider`]; [`PgConnector`] is the
//! `tokio-postgres` implementation.
//!
//! SQL events are emitted on the `pgstmt.sql` tracing target:
//!
//! - `debug`: statement text (truncated), parameter count, elapsed time
//! - `warn`: integrity constraint violations, with SQLSTATE and constraint
//! - `error`: other driver failures

mod decode;
mod postgres;


pub use postgres::{PgConnector, PgSession};

use crate::config::ClientConfig;
use crate::cursor::Cursor;
use crate::error::{StmtError, StmtResult};
use crate::fields::FieldSet;
use crate::fragment::{BatchStatement, Statement};
use crate::record::Record;
use crate::value::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

const SQL_TARGET: &str = "pgstmt.sql";

/// Raw result of one statement or batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub columns: Arc<[String]>,
    pub rows: Vec<Vec<Value>>,
    pub rows_affected: u64,
}

impl QueryOutput {
    fn into_cursor(self) -> StmtResult<Cursor> {
        let rows = self
            .rows
            .into_iter()
            .map(|values| Record::new(self.columns.clone(), values))
            .collect::<StmtResult<Vec<_>>>()?;
        Ok(Cursor::new(self.columns, rows, self.rows_affected))
    }
}

/// An open database session.
pub trait Session: Send {
    /// Execute one statement and buffer every returned row.
    fn query(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = StmtResult<QueryOutput>> + Send;

    /// Execute one statement once per parameter row, atomically.
    ///
    /// Rows are concatenated in input order and affected counts summed.
    fn query_batch(
        &mut self,
        sql: &str,
        rows: &[Vec<Value>],
    ) -> impl Future<Output = StmtResult<QueryOutput>> + Send;

    /// Release the session.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Supplies ready sessions.
pub trait ConnectionProvider: Send + Sync {
    type Session: Session;

    fn connect(&self) -> impl Future<Output = StmtResult<Self::Session>> + Send;
}

/// Runs statements, one session per call.
#[derive(Debug, Clone)]
pub struct Executor<P> {
    provider: P,
    config: ClientConfig,
}

impl<P: ConnectionProvider> Executor<P> {
    pub fn new(provider: P, config: ClientConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Execute `statement`, filling named placeholders from `fields`.
    ///
    /// Parameters are resolved before a session is acquired, so an unbound
    /// placeholder never reaches the server.
    pub async fn execute(
        &self,
        statement: &Statement,
        fields: Option<&FieldSet>,
    ) -> StmtResult<Cursor> {
        let params = statement.resolve(fields)?;
        let sql = statement.text();
        tracing::debug!(
            target: SQL_TARGET,
            param_count = params.len(),
            sql = %self.config.truncate_sql(sql),
            "execute"
        );

        let start = Instant::now();
        let mut session = self.provider.connect().await?;
        let result = session.query(sql, &params).await;
        session.close().await;

        self.finish(sql, start, result)
    }

    /// Execute a batch: one statement, one parameter row per record.
    pub async fn execute_batch(&self, batch: &BatchStatement) -> StmtResult<Cursor> {
        let sql = batch.text();
        tracing::debug!(
            target: SQL_TARGET,
            batch_size = batch.rows().len(),
            sql = %self.config.truncate_sql(sql),
            "execute batch"
        );

        let start = Instant::now();
        let mut session = self.provider.connect().await?;
        let result = session.query_batch(sql, batch.rows()).await;
        session.close().await;

        self.finish(sql, start, result)
    }

    fn finish(
        &self,
        sql: &str,
        start: Instant,
        result: StmtResult<QueryOutput>,
    ) -> StmtResult<Cursor> {
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(output) => {
                tracing::debug!(
                    target: SQL_TARGET,
                    elapsed_ms,
                    rows = output.rows.len(),
                    rows_affected = output.rows_affected,
                    "completed"
                );
                output.into_cursor()
            }
            Err(err) => {
                match &err {
                    StmtError::ConstraintViolation(diag) => tracing::warn!(
                        target: SQL_TARGET,
                        sqlstate = %diag.code,
                        constraint = diag.constraint.as_deref().unwrap_or("-"),
                        detail = diag.detail.as_deref().unwrap_or("-"),
                        sql = %self.config.truncate_sql(sql),
                        "constraint violation: {}",
                        diag.message
                    ),
                    other => tracing::error!(
                        target: SQL_TARGET,
                        sqlstate = other.sqlstate().unwrap_or("-"),
                        elapsed_ms,
                        sql = %self.config.truncate_sql(sql),
                        error = %other,
                        "statement failed"
                    ),
                }
                Err(err)
            }
        }
    }
}
