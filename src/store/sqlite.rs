//! SQLite store backend.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{Row as _, SqlitePool, sqlite::SqliteRow};
use tracing::{debug, instrument};

use super::{
    Column, ColumnKind, Filter, Row, SelectQuery, StoreClient, StoreError, StoreResult,
    sql::{self, Dialect},
};
use crate::config::SqliteStoreConfig;

pub struct SqliteStoreClient {
    pool: SqlitePool,
}

impl SqliteStoreClient {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool on the configured database file.
    pub async fn connect(config: &SqliteStoreConfig) -> StoreResult<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(
                sqlx::sqlite::SqliteConnectOptions::new()
                    .filename(&config.path)
                    .create_if_missing(config.create_if_missing)
                    .busy_timeout(Duration::from_millis(config.busy_timeout_ms)),
            )
            .await
            .map_err(|e| StoreError::Connect {
                backend: "sqlite",
                message: e.to_string(),
            })?;

        Ok(Self::new(pool))
    }

    fn decode_row(row: &SqliteRow, columns: &[Column]) -> StoreResult<Row> {
        let mut out = Row::new();
        for (idx, column) in columns.iter().enumerate() {
            let value = match column.kind {
                ColumnKind::Integer => row
                    .try_get::<Option<i64>, _>(idx)?
                    .map(Value::from)
                    .unwrap_or(Value::Null),
                ColumnKind::Decimal => sql::f64_value(row.try_get::<Option<f64>, _>(idx)?),
                ColumnKind::Text | ColumnKind::Timestamp => row
                    .try_get::<Option<String>, _>(idx)?
                    .map(Value::String)
                    .unwrap_or(Value::Null),
                // SQLite has no boolean storage class
                ColumnKind::Boolean => row
                    .try_get::<Option<i64>, _>(idx)?
                    .map(|v| Value::Bool(v != 0))
                    .unwrap_or(Value::Null),
            };
            out.insert(column.name.clone(), value);
        }
        Ok(out)
    }
}

#[async_trait]
impl StoreClient for SqliteStoreClient {
    #[instrument(skip(self, filter), fields(backend = "sqlite"))]
    async fn count(&self, table: &str, filter: Option<&Filter>) -> StoreResult<u64> {
        let sql = sql::count_sql(Dialect::Sqlite, table, filter)?;
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(filter) = filter {
            query = query.bind(filter.value.as_str());
        }

        let total = query.fetch_one(&self.pool).await?;
        debug!(total, "Counted rows");
        Ok(total.max(0) as u64)
    }

    #[instrument(skip(self, query), fields(backend = "sqlite", table = %query.table))]
    async fn select(&self, query: &SelectQuery) -> StoreResult<Vec<Row>> {
        let sql = sql::select_sql(Dialect::Sqlite, query)?;
        let mut statement = sqlx::query(&sql);
        if let Some(filter) = &query.filter {
            statement = statement.bind(filter.value.as_str());
        }

        let rows = statement.fetch_all(&self.pool).await?;
        debug!(rows = rows.len(), "Selected rows");
        rows.iter()
            .map(|row| Self::decode_row(row, &query.columns))
            .collect()
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Connect {
                backend: "sqlite",
                message: e.to_string(),
            })?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
