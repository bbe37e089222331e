//! Pluggable data-access clients for tenant stores.
//!
//! A [`StoreClient`] is the narrow read interface the aggregator needs:
//! count rows matching a filter, select typed columns, and probe
//! connectivity. Backends:
//!
//! - **REST**: PostgREST endpoints such as Supabase projects (always available)
//! - **SQLite**: direct database file access (`database-sqlite`)
//! - **PostgreSQL**: direct database connection (`database-postgres`)
//!
//! [`connect_store`] builds the backend named by a [`StoreConfig`].

mod error;
#[cfg(feature = "database-postgres")]
pub mod postgres;
pub mod rest;
pub mod row;
#[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
mod sql;
#[cfg(feature = "database-sqlite")]
pub mod sqlite;

#[cfg(all(test, any(feature = "database-sqlite", feature = "database-postgres")))]
pub(crate) mod tests;

use std::sync::Arc;

use async_trait::async_trait;
pub use error::{StoreError, StoreResult};
use tracing::info;

use crate::config::{StoreConfig, is_identifier};

/// A result row keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// How a selected column should be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Decimal,
    Text,
    /// Rendered as text and parsed by [`row::parse_timestamp`].
    Timestamp,
    Boolean,
}

/// A column requested by a select query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Equality filter on a single column. Compared as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// Sort order for select queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending order (oldest first)
    #[default]
    Asc,
    /// Descending order (newest first)
    Desc,
}

impl SortOrder {
    /// Get the SQL ORDER BY direction string.
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    /// Get the PostgREST `order` modifier.
    pub fn as_rest(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub order: SortOrder,
}

/// A select over one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    pub table: String,
    pub columns: Vec<Column>,
    pub filter: Option<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u32>,
}

impl SelectQuery {
    pub fn new(table: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            table: table.into(),
            columns,
            filter: None,
            order_by: None,
            limit: None,
        }
    }

    pub fn filter(mut self, filter: Option<Filter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some(OrderBy {
            column: column.into(),
            order,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Column names listed in the query, in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Reject table or column names that aren't plain identifiers.
    pub fn validate(&self) -> StoreResult<()> {
        ensure_identifier(&self.table)?;
        if self.columns.is_empty() {
            return Err(StoreError::InvalidIdentifier(format!(
                "select on '{}' lists no columns",
                self.table
            )));
        }
        for column in &self.columns {
            ensure_identifier(&column.name)?;
        }
        if let Some(filter) = &self.filter {
            ensure_identifier(&filter.column)?;
        }
        if let Some(order_by) = &self.order_by {
            ensure_identifier(&order_by.column)?;
        }
        Ok(())
    }
}

pub(crate) fn ensure_identifier(name: &str) -> StoreResult<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// Read access to a tenant data store.
///
/// Implementations must be `Send + Sync` to support async contexts.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Count rows in `table`, optionally restricted by `filter`.
    async fn count(&self, table: &str, filter: Option<&Filter>) -> StoreResult<u64>;

    /// Run a select. A missing column surfaces as an error for which
    /// [`StoreError::is_schema_error`] is true.
    async fn select(&self, query: &SelectQuery) -> StoreResult<Vec<Row>>;

    /// Probe connectivity and credentials.
    async fn health_check(&self) -> StoreResult<()>;

    /// Get the backend type name (for logging/debugging).
    fn backend_name(&self) -> &'static str;
}

/// Create a store client from configuration.
pub async fn connect_store(config: &StoreConfig) -> StoreResult<Arc<dyn StoreClient>> {
    match config {
        StoreConfig::Rest(cfg) => {
            info!(url = %cfg.url, "Using REST store backend");
            Ok(Arc::new(rest::RestStoreClient::new(cfg)?))
        }
        #[cfg(feature = "database-sqlite")]
        StoreConfig::Sqlite(cfg) => {
            info!(path = %cfg.path, "Using SQLite store backend");
            Ok(Arc::new(sqlite::SqliteStoreClient::connect(cfg).await?))
        }
        #[cfg(feature = "database-postgres")]
        StoreConfig::Postgres(cfg) => {
            info!("Using PostgreSQL store backend");
            Ok(Arc::new(postgres::PostgresStoreClient::connect(cfg).await?))
        }
    }
}

/// Builds store clients on demand. The seam through which isolated stores
/// are opened.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self, config: &StoreConfig) -> StoreResult<Arc<dyn StoreClient>>;
}

/// Connector backed by [`connect_store`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStoreConnector;

#[async_trait]
impl StoreConnector for DefaultStoreConnector {
    async fn connect(&self, config: &StoreConfig) -> StoreResult<Arc<dyn StoreClient>> {
        connect_store(config).await
    }
}
