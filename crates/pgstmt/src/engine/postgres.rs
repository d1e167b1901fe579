use super::decode::Decoded;
use super::{ConnectionProvider, QueryOutput, SQL_TARGET, Session};
use crate::config::ConnectionInfo;
use crate::error::{StmtError, StmtResult};
use crate::value::Value;
use futures_util::TryStreamExt;
use futures_util::future::try_join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_postgres::types::{FromSql, ToSql};
use tokio_postgres::{Client, Column, NoTls, Row, RowStream};

/// Opens a new `tokio-postgres` connection (without TLS) per session.
#[derive(Debug, Clone)]
pub struct PgConnector {
    config: tokio_postgres::Config,
}

impl PgConnector {
    pub fn new(info: &ConnectionInfo) -> StmtResult<Self> {
        Ok(Self::from_config(info.to_pg_config()?))
    }

    pub fn from_config(config: tokio_postgres::Config) -> Self {
        Self { config }
    }

    pub fn pg_config(&self) -> &tokio_postgres::Config {
        &self.config
    }
}

impl ConnectionProvider for PgConnector {
    type Session = PgSession;

    async fn connect(&self) -> StmtResult<PgSession> {
        let (client, connection) = self.config.connect(NoTls).await.map_err(|e| {
            tracing::error!(target: SQL_TARGET, error = %e, "failed to connect");
            StmtError::Connection(e.to_string())
        })?;

        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(target: SQL_TARGET, error = %e, "connection error");
            }
        });

        Ok(PgSession { client, driver })
    }
}

/// One connection. Dropping it closes the connection.
pub struct PgSession {
    client: Client,
    driver: JoinHandle<()>,
}

impl Session for PgSession {
    async fn query(&mut self, sql: &str, params: &[Value]) -> StmtResult<QueryOutput> {
        let statement = self
            .client
            .prepare(sql)
            .await
            .map_err(StmtError::from_driver)?;
        let stream = self
            .client
            .query_raw(&statement, bind(params))
            .await
            .map_err(StmtError::from_driver)?;
        let (rows, rows_affected) = collect_rows(stream).await?;

        Ok(QueryOutput {
            columns: column_names(statement.columns()),
            rows,
            rows_affected,
        })
    }

    async fn query_batch(&mut self, sql: &str, rows: &[Vec<Value>]) -> StmtResult<QueryOutput> {
        let tx = self
            .client
            .transaction()
            .await
            .map_err(StmtError::from_driver)?;
        let statement = tx.prepare(sql).await.map_err(StmtError::from_driver)?;

        // Requests are pipelined on the connection.
        let results = try_join_all(rows.iter().map(|params| {
            let tx = &tx;
            let statement = &statement;
            async move {
                let stream = tx
                    .query_raw(statement, bind(params))
                    .await
                    .map_err(StmtError::from_driver)?;
                collect_rows(stream).await
            }
        }))
        .await?;

        tx.commit().await.map_err(StmtError::from_driver)?;

        let mut output = QueryOutput {
            columns: column_names(statement.columns()),
            ..QueryOutput::default()
        };
        for (rows, affected) in results {
            output.rows.extend(rows);
            output.rows_affected += affected;
        }
        Ok(output)
    }

    async fn close(self) {
        let PgSession { client, driver } = self;
        drop(client);
        if let Err(e) = driver.await {
            tracing::error!(target: SQL_TARGET, error = %e, "connection task failed");
        }
    }
}

fn bind(params: &[Value]) -> impl ExactSizeIterator<Item = &(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync))
}

fn column_names(columns: &[Column]) -> Arc<[String]> {
    columns.iter().map(|c| c.name().to_string()).collect()
}

async fn collect_rows(stream: RowStream) -> StmtResult<(Vec<Vec<Value>>, u64)> {
    let mut stream = std::pin::pin!(stream);
    let mut rows = Vec::new();
    while let Some(row) = stream.try_next().await.map_err(StmtError::from_driver)? {
        rows.push(decode_row(&row)?);
    }
    let affected = stream.rows_affected().unwrap_or(rows.len() as u64);
    Ok((rows, affected))
}

fn decode_row(row: &Row) -> StmtResult<Vec<Value>> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            if !<Decoded as FromSql>::accepts(column.type_()) {
                return Err(StmtError::projection(
                    column.name(),
                    format!(
                        "unsupported column type {}; cast it to text in the query",
                        column.type_()
                    ),
                ));
            }
            row.try_get::<_, Decoded>(idx)
                .map(|decoded| decoded.0)
                .map_err(|e| StmtError::projection(column.name(), e.to_string()))
        })
        .collect()
}
