//! PostgreSQL store backend.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row as _, postgres::PgRow};
use tracing::{debug, instrument};

use super::{
    Column, ColumnKind, Filter, Row, SelectQuery, StoreClient, StoreError, StoreResult,
    sql::{self, Dialect},
};
use crate::config::PostgresStoreConfig;

pub struct PostgresStoreClient {
    pool: PgPool,
}

impl PostgresStoreClient {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &PostgresStoreConfig) -> StoreResult<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::Connect {
                backend: "postgres",
                message: e.to_string(),
            })?;

        Ok(Self::new(pool))
    }

    fn decode_row(row: &PgRow, columns: &[Column]) -> StoreResult<Row> {
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
                ColumnKind::Boolean => row
                    .try_get::<Option<bool>, _>(idx)?
                    .map(Value::Bool)
                    .unwrap_or(Value::Null),
            };
            out.insert(column.name.clone(), value);
        }
        Ok(out)
    }
}

#[async_trait]
impl StoreClient for PostgresStoreClient {
    #[instrument(skip(self, filter), fields(backend = "postgres"))]
    async fn count(&self, table: &str, filter: Option<&Filter>) -> StoreResult<u64> {
        let sql = sql::count_sql(Dialect::Postgres, table, filter)?;
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(filter) = filter {
            query = query.bind(filter.value.as_str());
        }

        let total = query.fetch_one(&self.pool).await?;
        debug!(total, "Counted rows");
        Ok(total.max(0) as u64)
    }

    #[instrument(skip(self, query), fields(backend = "postgres", table = %query.table))]
    async fn select(&self, query: &SelectQuery) -> StoreResult<Vec<Row>> {
        let sql = sql::select_sql(Dialect::Postgres, query)?;
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
                backend: "postgres",
                message: e.to_string(),
            })?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
