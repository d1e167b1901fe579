//! High-level client: build, execute and materialize in one call.

use crate::builder::{build_find, build_insert, build_insert_batch, build_update};
use crate::config::{ClientConfig, ConnectionInfo};
use crate::cursor::Cursor;
use crate::engine::{ConnectionProvider, Executor, PgConnector};
use crate::error::{StmtError, StmtResult};
use crate::fields::{FieldSet, FieldSource};
use crate::fragment::Statement;
use crate::options::{FindOptions, InsertOptions, UpdateOptions};
use crate::record::{FromRecord, Record};

/// PostgreSQL client that opens one session per operation.
///
/// Nothing is shared between calls: each operation acquires a session,
/// executes one statement (or one batch) and releases the session before
/// returning, so a `PgClient` can be shared freely across tasks.
///
/// # Example
///
/// ```ignore
/// use pgstmt::{FindOptions, InsertOptions, PgClient, Predicate};
///
/// let client = PgClient::connect("postgres://postgres@localhost/rates").await?;
///
/// let mut inserted = client
///     .insert(
///         "currencies",
///         [("id", "EEE"), ("currency_name", "name")],
///         &InsertOptions::new().returning("*"),
///     )
///     .await?;
/// let row = inserted.fetch_one();
///
/// let euros = client
///     .find_all(
///         "SELECT * FROM currencies",
///         &FindOptions::new().filter(Predicate::eq("id", "EEE")),
///     )
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct PgClient<P = PgConnector> {
    executor: Executor<P>,
}

impl PgClient<PgConnector> {
    /// Connect with default settings, verifying the server is reachable.
    pub async fn connect(info: impl Into<ConnectionInfo>) -> StmtResult<Self> {
        Self::connect_with_config(info, ClientConfig::default()).await
    }

    pub async fn connect_with_config(
        info: impl Into<ConnectionInfo>,
        config: ClientConfig,
    ) -> StmtResult<Self> {
        let connector = PgConnector::new(&info.into())?;
        let client = Self::with_provider(connector, config);
        if client.executor.config().verify_on_connect {
            client.verify().await.map_err(|err| match err {
                StmtError::Connection(_) => err,
                other => StmtError::Connection(format!("connection check failed: {other}")),
            })?;
        }
        Ok(client)
    }

    /// Connect using `DATABASE_URL`.
    pub async fn from_env() -> StmtResult<Self> {
        Self::connect(ConnectionInfo::from_env()?).await
    }
}

impl<P: ConnectionProvider> PgClient<P> {
    /// Client over a custom session provider. No connection is made.
    pub fn with_provider(provider: P, config: ClientConfig) -> Self {
        Self {
            executor: Executor::new(provider, config),
        }
    }

    pub fn executor(&self) -> &Executor<P> {
        &self.executor
    }

    /// Round-trip `SELECT 1`.
    pub async fn verify(&self) -> StmtResult<()> {
        self.executor
            .execute(&Statement::new("SELECT 1"), None)
            .await
            .map(Cursor::close)
    }

    /// Insert one record.
    pub async fn insert(
        &self,
        table: &str,
        record: impl FieldSource,
        options: &InsertOptions,
    ) -> StmtResult<Cursor> {
        let fields = record.into_field_set()?;
        let statement = build_insert(table, &fields, options)?;
        self.executor.execute(&statement, Some(&fields)).await
    }

    /// Insert several records sharing the same columns, atomically.
    pub async fn insert_many<R: FieldSource>(
        &self,
        table: &str,
        records: impl IntoIterator<Item = R>,
        options: &InsertOptions,
    ) -> StmtResult<Cursor> {
        let records = records
            .into_iter()
            .map(FieldSource::into_field_set)
            .collect::<StmtResult<Vec<FieldSet>>>()?;
        let batch = build_insert_batch(table, &records, options)?;
        self.executor.execute_batch(&batch).await
    }

    /// Update rows matching the filter of `options`.
    pub async fn update(
        &self,
        table: &str,
        fields: impl FieldSource,
        options: &UpdateOptions,
    ) -> StmtResult<Cursor> {
        let fields = fields.into_field_set()?;
        let statement = build_update(table, &fields, options)?;
        self.executor.execute(&statement, Some(&fields)).await
    }

    /// Execute a caller-written statement, appending the filter of `options`.
    pub async fn run(
        &self,
        statement: impl Into<Statement>,
        options: &FindOptions,
    ) -> StmtResult<Cursor> {
        let statement = build_find(statement.into(), options)?;
        self.executor.execute(&statement, None).await
    }

    /// First row of [`PgClient::run`], if any.
    pub async fn find_one(
        &self,
        statement: impl Into<Statement>,
        options: &FindOptions,
    ) -> StmtResult<Option<Record>> {
        Ok(self.run(statement, options).await?.fetch_one())
    }

    pub async fn find_one_as<T: FromRecord>(
        &self,
        statement: impl Into<Statement>,
        options: &FindOptions,
    ) -> StmtResult<Option<T>> {
        self.run(statement, options).await?.fetch_one_as()
    }

    /// Every row of [`PgClient::run`]; empty when nothing matched.
    pub async fn find_all(
        &self,
        statement: impl Into<Statement>,
        options: &FindOptions,
    ) -> StmtResult<Vec<Record>> {
        Ok(self.run(statement, options).await?.fetch_all())
    }

    pub async fn find_all_as<T: FromRecord>(
        &self,
        statement: impl Into<Statement>,
        options: &FindOptions,
    ) -> StmtResult<Vec<T>> {
        self.run(statement, options).await?.fetch_all_as()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{QueryOutput, Session};
    use crate::error::StmtError;
    use crate::filter::Predicate;
    use crate::value::Value;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder {
        issued: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
    }

    struct RecorderSession(Recorder);

    impl Session for RecorderSession {
        async fn query(&mut self, sql: &str, params: &[Value]) -> StmtResult<QueryOutput> {
            self.0
                .issued
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            Ok(QueryOutput::default())
        }

        async fn query_batch(&mut self, sql: &str, rows: &[Vec<Value>]) -> StmtResult<QueryOutput> {
            for params in rows {
                self.query(sql, params).await?;
            }
            Ok(QueryOutput::default())
        }

        async fn close(self) {}
    }

    impl ConnectionProvider for Recorder {
        type Session = RecorderSession;

        async fn connect(&self) -> StmtResult<RecorderSession> {
            Ok(RecorderSession(self.clone()))
        }
    }

    fn client() -> (PgClient<Recorder>, Recorder) {
        let recorder = Recorder::default();
        (
            PgClient::with_provider(recorder.clone(), ClientConfig::default()),
            recorder,
        )
    }

    #[tokio::test]
    async fn insert_binds_fields_in_column_order() {
        let (client, recorder) = client();
        client
            .insert(
                "currencies",
                [("id", "EEE"), ("currency_name", "name")],
                &InsertOptions::new().returning("*"),
            )
            .await
            .unwrap();

        let issued = recorder.issued.lock().unwrap();
        assert_eq!(
            issued[0].0,
            "INSERT INTO currencies (id, currency_name) VALUES ($1, $2) RETURNING *"
        );
        assert_eq!(issued[0].1, [Value::from("EEE"), Value::from("name")]);
    }

    #[tokio::test]
    async fn update_without_filter_issues_nothing() {
        let (client, recorder) = client();
        let err = client
            .update(
                "currencies",
                [("currency_name", "x")],
                &UpdateOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StmtError::MissingFilter(_)));
        assert!(recorder.issued.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_many_mismatch_issues_nothing() {
        let (client, recorder) = client();
        let records = vec![
            vec![("id", Value::from("A"))],
            vec![("code", Value::from("B"))],
        ];
        let err = client
            .insert_many("currencies", records, &InsertOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StmtError::SchemaMismatch(_)));
        assert!(recorder.issued.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_appends_filter() {
        let (client, recorder) = client();
        let rows = client
            .find_all(
                "SELECT * FROM currencies",
                &FindOptions::new().filter(Predicate::eq("id", "EEE")),
            )
            .await
            .unwrap();
        assert!(rows.is_empty());

        let issued = recorder.issued.lock().unwrap();
        assert_eq!(issued[0].0, "SELECT * FROM currencies WHERE id = $1");
        assert_eq!(issued[0].1, [Value::from("EEE")]);
    }
}
