//! Per-tenant analytics aggregation.
//!
//! [`TenantAnalyticsAggregator::aggregate`] runs the whole pipeline for one
//! tenant, strictly in sequence:
//!
//! 1. Resolve the store holding the tenant's data (shared or isolated)
//! 2. Count messages, then leads
//! 3. Fetch usage rows, walking [`USAGE_SHAPES`] until one query succeeds
//! 4. Sum tokens and cost
//! 5. Bucket usage by calendar day
//!
//! A failure to reach a tenant's isolated store never falls back to the
//! shared store.

use std::sync::Arc;

use chrono::FixedOffset;
use tracing::{Span, debug, info, instrument, warn};

use super::{
    build_daily_series,
    tenant_configs::TenantConfigLookup,
    usage_shapes::USAGE_SHAPES,
};
use crate::{
    config::{AnalyticsConfig, ConfigError, StoreConfig},
    models::{TenantAnalytics, TenantConfig, UsageRecord},
    store::{DefaultStoreConnector, Filter, StoreClient, StoreConnector, StoreError},
};

/// Errors that abort an aggregation.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("Failed to connect to isolated store for tenant '{tenant_id}': {message}")]
    IsolatedStoreConnect { tenant_id: String, message: String },

    #[error("Count query on '{table}' failed: {source}")]
    CountQuery {
        table: String,
        #[source]
        source: StoreError,
    },
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// Every usage shape failed. Logged and treated as no usage.
#[derive(Debug, thiserror::Error)]
#[error("All {attempts} usage query shapes failed")]
struct UsageSchemaExhausted {
    attempts: usize,
    #[source]
    last_error: Option<StoreError>,
}

/// The store a tenant's data is read from.
#[derive(Clone)]
pub struct ResolvedStore {
    pub client: Arc<dyn StoreClient>,
    /// Whether `client` is the tenant's isolated store.
    pub isolated: bool,
}

impl std::fmt::Debug for ResolvedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedStore")
            .field("backend", &self.client.backend_name())
            .field("isolated", &self.isolated)
            .finish()
    }
}

/// Pick the store for a tenant.
///
/// Tenants without isolated credentials read from `shared`. Otherwise an
/// isolated client is built through `connector` and probed once; any failure
/// is an [`AnalyticsError::IsolatedStoreConnect`]. `sqlite:` endpoints are
/// refused unless `allow_local_stores` is set.
pub async fn resolve_store_client(
    shared: &Arc<dyn StoreClient>,
    tenant: &TenantConfig,
    connector: &dyn StoreConnector,
    allow_local_stores: bool,
) -> AnalyticsResult<ResolvedStore> {
    let Some(credentials) = &tenant.isolated_store else {
        return Ok(ResolvedStore {
            client: Arc::clone(shared),
            isolated: false,
        });
    };

    let connect_error = |message: String| AnalyticsError::IsolatedStoreConnect {
        tenant_id: tenant.tenant_id.clone(),
        message,
    };

    let config = StoreConfig::from_isolated_credentials(
        &credentials.endpoint,
        &credentials.secret,
        allow_local_stores,
    )
    .map_err(|e| connect_error(e.to_string()))?;
    let client = connector
        .connect(&config)
        .await
        .map_err(|e| connect_error(e.to_string()))?;
    client
        .health_check()
        .await
        .map_err(|e| connect_error(e.to_string()))?;

    info!(
        tenant_id = %tenant.tenant_id,
        backend = config.backend_name(),
        "Using isolated store"
    );
    Ok(ResolvedStore {
        client,
        isolated: true,
    })
}

/// Builds [`TenantAnalytics`] for one tenant at a time.
pub struct TenantAnalyticsAggregator {
    shared: Arc<dyn StoreClient>,
    connector: Arc<dyn StoreConnector>,
    config: AnalyticsConfig,
    offset: FixedOffset,
}

impl TenantAnalyticsAggregator {
    /// Aggregator over the shared store, opening isolated stores with
    /// [`DefaultStoreConnector`].
    pub fn new(shared: Arc<dyn StoreClient>, config: AnalyticsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let offset = config.offset()?;
        Ok(Self {
            shared,
            connector: Arc::new(DefaultStoreConnector),
            config,
            offset,
        })
    }

    /// Replace the connector used for isolated stores.
    pub fn with_connector(mut self, connector: Arc<dyn StoreConnector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    #[instrument(skip(self), fields(using_isolated_store = tracing::field::Empty))]
    pub async fn aggregate(&self, tenant_id: &str) -> AnalyticsResult<TenantAnalytics> {
        let tenant = self.tenant_config(tenant_id).await;
        let store = resolve_store_client(
            &self.shared,
            &tenant,
            self.connector.as_ref(),
            self.config.allow_local_isolated_stores,
        )
        .await?;
        Span::current().record("using_isolated_store", store.isolated);

        let tables = &self.config.tables;
        let filter = tenant
            .filters_by_tenant()
            .then(|| Filter::eq(&tables.tenant_column, tenant_id));
        let client = store.client.as_ref();

        let total_messages = count(client, &tables.messages, filter.as_ref()).await?;
        let total_leads = count(client, &tables.leads, filter.as_ref()).await?;

        let records = match self.fetch_usage(client, filter.as_ref()).await {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    attempts = e.attempts,
                    last_error = ?e.last_error.as_ref().map(ToString::to_string),
                    "{e}, reporting zero usage"
                );
                Vec::new()
            }
        };

        let total_tokens = records
            .iter()
            .fold(0i64, |total, r| total.saturating_add(r.tokens));
        let total_cost: f64 = records.iter().map(|r| r.cost).sum();
        let daily_series = build_daily_series(
            &records,
            self.offset,
            self.config.series_days,
            &self.config.empty_series_label,
        );

        debug!(
            total_messages,
            total_leads,
            total_tokens,
            usage_rows = records.len(),
            days = daily_series.len(),
            "Aggregated tenant analytics"
        );

        Ok(TenantAnalytics {
            total_messages,
            total_leads,
            total_tokens,
            total_cost,
            daily_series,
            using_isolated_store: store.isolated,
        })
    }

    /// A missing record, or a lookup that fails, means the tenant is read
    /// from the shared store. Shared-store queries are always tenant-filtered.
    async fn tenant_config(&self, tenant_id: &str) -> TenantConfig {
        let lookup = TenantConfigLookup::new(
            self.shared.as_ref(),
            &self.config.tenant_configs,
            self.config.default_tags_tenant_rows,
        );
        match lookup.find(tenant_id).await {
            Ok(Some(config)) => config,
            Ok(None) => TenantConfig::shared(tenant_id),
            Err(e) => {
                warn!(error = %e, "Tenant config lookup failed, using shared store");
                TenantConfig::shared(tenant_id)
            }
        }
    }

    /// Try each usage shape in order. Any failure moves on to the next shape;
    /// the first success wins even when it returns no rows.
    async fn fetch_usage(
        &self,
        client: &dyn StoreClient,
        filter: Option<&Filter>,
    ) -> Result<Vec<UsageRecord>, UsageSchemaExhausted> {
        let mut last_error = None;

        for (attempt, shape) in USAGE_SHAPES.iter().enumerate() {
            let query = shape.query(&self.config.tables.usage, filter.cloned());
            match client.select(&query).await {
                Ok(rows) => {
                    debug!(shape = shape.name, rows = rows.len(), "Usage query shape matched");
                    return Ok(rows.iter().map(|row| shape.normalize(row)).collect());
                }
                Err(e) => {
                    warn!(
                        shape = shape.name,
                        attempt = attempt + 1,
                        schema_error = e.is_schema_error(),
                        error = %e,
                        "Usage query failed, trying next shape"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(UsageSchemaExhausted {
            attempts: USAGE_SHAPES.len(),
            last_error,
        })
    }
}

async fn count(
    client: &dyn StoreClient,
    table: &str,
    filter: Option<&Filter>,
) -> AnalyticsResult<u64> {
    client
        .count(table, filter)
        .await
        .map_err(|source| AnalyticsError::CountQuery {
            table: table.to_string(),
            source,
        })
}
