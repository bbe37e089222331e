//! Lookup of tenant config records in the shared store.

use tracing::{debug, instrument, warn};

use crate::{
    config::TenantConfigColumns,
    models::TenantConfig,
    store::{Column, ColumnKind, Filter, SelectQuery, StoreClient, StoreResult, row},
};

/// Reads tenant config records from the shared store.
pub struct TenantConfigLookup<'a> {
    store: &'a dyn StoreClient,
    columns: &'a TenantConfigColumns,
    default_tags_tenant_rows: bool,
}

impl<'a> TenantConfigLookup<'a> {
    pub fn new(
        store: &'a dyn StoreClient,
        columns: &'a TenantConfigColumns,
        default_tags_tenant_rows: bool,
    ) -> Self {
        Self {
            store,
            columns,
            default_tags_tenant_rows,
        }
    }

    /// Fetch the config record for `tenant_id`. `Ok(None)` when the tenant
    /// has no record.
    ///
    /// Older config tables have no capability column; those records take
    /// `default_tags_tenant_rows`.
    #[instrument(skip(self), fields(table = %self.columns.table))]
    pub async fn find(&self, tenant_id: &str) -> StoreResult<Option<TenantConfig>> {
        let with_flag = self.query(tenant_id, true);
        let rows = match self.store.select(&with_flag).await {
            Ok(rows) => rows,
            Err(e) if e.is_schema_error() => {
                warn!(
                    column = %self.columns.tags_tenant_rows_column,
                    error = %e,
                    "Tenant config table has no capability column, using default"
                );
                self.store.select(&self.query(tenant_id, false)).await?
            }
            Err(e) => return Err(e),
        };

        let Some(record) = rows.first() else {
            debug!("No tenant config record");
            return Ok(None);
        };

        let tags_tenant_rows = row::get_bool(record, &self.columns.tags_tenant_rows_column)
            .unwrap_or(self.default_tags_tenant_rows);
        let config = TenantConfig::from_parts(
            tenant_id,
            row::get_str(record, &self.columns.endpoint_column).map(str::to_string),
            row::get_str(record, &self.columns.secret_column).map(str::to_string),
            tags_tenant_rows,
        );
        debug!(
            isolated = config.is_isolated(),
            tags_tenant_rows = config.tags_tenant_rows,
            "Loaded tenant config"
        );
        Ok(Some(config))
    }

    fn query(&self, tenant_id: &str, with_flag: bool) -> SelectQuery {
        let mut columns = vec![
            Column::new(&self.columns.endpoint_column, ColumnKind::Text),
            Column::new(&self.columns.secret_column, ColumnKind::Text),
        ];
        if with_flag {
            columns.push(Column::new(
                &self.columns.tags_tenant_rows_column,
                ColumnKind::Boolean,
            ));
        }

        SelectQuery::new(&self.columns.table, columns)
            .filter(Some(Filter::eq(&self.columns.tenant_column, tenant_id)))
            .limit(1)
    }
}
