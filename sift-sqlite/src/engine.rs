//! SQLite query engine implementation.

use std::time::{Duration, Instant};

use serde_json::Value as JsonValue;
use tokio_rusqlite::Connection;
use tracing::{debug, instrument, warn};

use sift_query::error::{QueryError, QueryResult};
use sift_query::traits::{BoxFuture, QueryEngine};
use sift_query::value::Params;

use crate::config::{DatabasePath, SqliteConfig};
use crate::error::{SqliteError, SqliteResult};
use crate::types::{filter_value_to_sqlite, row_to_json};

/// Runs Sift statements on one SQLite connection.
///
/// Cloning is cheap; clones share the connection, whose calls are
/// serialized on its background thread.
#[derive(Clone)]
pub struct SqliteEngine {
    conn: Connection,
    log_queries: bool,
    slow_query_threshold: Duration,
}

impl std::fmt::Debug for SqliteEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteEngine")
            .field("log_queries", &self.log_queries)
            .field("slow_query_threshold", &self.slow_query_threshold)
            .finish_non_exhaustive()
    }
}

impl SqliteEngine {
    /// Open the database described by `config` and apply its pragmas.
    pub async fn connect(config: &SqliteConfig) -> SqliteResult<Self> {
        let conn = match &config.path {
            DatabasePath::Memory => Connection::open_in_memory().await,
            DatabasePath::File(path) => Connection::open(path).await,
        }
        .map_err(|e| SqliteError::connection(e.to_string()))?;

        let init = config.init_sql();
        conn.call(move |conn| Ok(conn.execute_batch(&init)?))
            .await
            .map_err(SqliteError::from_call)?;

        debug!(memory = config.path.is_memory(), "opened SQLite database");
        Ok(Self {
            conn,
            log_queries: config.log_queries,
            slow_query_threshold: config.slow_query_threshold,
        })
    }

    /// Open an in-memory database with default settings.
    pub async fn memory() -> SqliteResult<Self> {
        Self::connect(&SqliteConfig::memory()).await
    }

    /// Run a batch of statements without parameters, e.g. schema and fixtures.
    pub async fn execute_batch(&self, sql: &str) -> SqliteResult<()> {
        let sql = sql.to_string();
        self.conn
            .call(move |conn| Ok(conn.execute_batch(&sql)?))
            .await
            .map_err(SqliteError::from_call)
    }

    /// Run `sql` with `params` bound by name and collect every row.
    ///
    /// Parameters the statement does not reference are ignored.
    #[instrument(skip_all, fields(params = params.len()))]
    pub async fn fetch(&self, sql: &str, params: Params) -> SqliteResult<Vec<JsonValue>> {
        if self.log_queries {
            debug!(sql = %sql, "executing statement");
        }
        let started = Instant::now();
        let owned_sql = sql.to_string();

        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&owned_sql)?;
                let names: Vec<Option<String>> = (1..=stmt.parameter_count())
                    .map(|i| stmt.parameter_name(i).map(str::to_owned))
                    .collect();
                for (i, name) in names.into_iter().enumerate() {
                    let index = i + 1;
                    let name = name
                        .ok_or_else(|| SqliteError::PositionalParameter(index).into_call())?;
                    let bare = name.trim_start_matches([':', '@', '$']);
                    let value = params.get(bare).ok_or_else(|| {
                        SqliteError::MissingParameter(bare.to_string()).into_call()
                    })?;
                    stmt.raw_bind_parameter(index, filter_value_to_sqlite(value))?;
                }

                let columns: Vec<String> =
                    stmt.column_names().iter().map(|c| c.to_string()).collect();
                let mut rows = stmt.raw_query();
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(row_to_json(row, &columns)?);
                }
                Ok(out)
            })
            .await
            .map_err(SqliteError::from_call)?;

        let elapsed = started.elapsed();
        if elapsed >= self.slow_query_threshold {
            warn!(
                sql = %sql,
                elapsed_ms = elapsed.as_millis() as u64,
                "slow query"
            );
        }
        Ok(rows)
    }

    async fn count(&self, sql: &str, params: Params) -> SqliteResult<u64> {
        let rows = self.fetch(sql, params).await?;
        let count = rows
            .first()
            .and_then(|row| row.as_object())
            .and_then(|row| row.values().next())
            .and_then(JsonValue::as_u64)
            .ok_or_else(|| SqliteError::decode("count statement returned no integer"))?;
        Ok(count)
    }
}

impl QueryEngine for SqliteEngine {
    fn query_rows(&self, sql: &str, params: Params) -> BoxFuture<'_, QueryResult<Vec<JsonValue>>> {
        let sql = sql.to_string();
        Box::pin(async move {
            self.fetch(&sql, params)
                .await
                .map_err(|e| QueryError::from(e).with_sql(sql.as_str()))
        })
    }

    fn query_count(&self, sql: &str, params: Params) -> BoxFuture<'_, QueryResult<u64>> {
        let sql = sql.to_string();
        Box::pin(async move {
            self.count(&sql, params)
                .await
                .map_err(|e| QueryError::from(e).with_sql(sql.as_str()))
        })
    }

    fn execute_returning(
        &self,
        sql: &str,
        params: Params,
    ) -> BoxFuture<'_, QueryResult<Vec<JsonValue>>> {
        let sql = sql.to_string();
        Box::pin(async move {
            self.fetch(&sql, params)
                .await
                .map_err(|e| QueryError::from(e).with_sql(sql.as_str()))
        })
    }
}
