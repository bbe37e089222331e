//! Tenant-scoped usage analytics for multi-tenant chat agent dashboards.
//!
//! Given a tenant identifier, [`TenantAnalyticsAggregator`] resolves which
//! backing store holds the tenant's data (the shared multi-tenant store or a
//! tenant-supplied isolated store), counts messages and leads, fetches token
//! usage with a schema-compatibility fallback, and returns totals plus a
//! daily series ready for rendering.
//!
//! ```ignore
//! let config = AnalyticsServiceConfig::from_file("analytics.toml")?;
//! let shared = store::connect_store(&config.shared_store).await?;
//! let aggregator = TenantAnalyticsAggregator::new(shared, config.analytics)?;
//!
//! let analytics = aggregator.aggregate("acme").await?;
//! println!("{} messages, {} tokens", analytics.total_messages, analytics.total_tokens);
//! ```

pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod store;

pub use config::{AnalyticsConfig, AnalyticsServiceConfig, ConfigError, StoreConfig};
pub use models::{
    DailyBucket, IsolatedStoreCredentials, TenantAnalytics, TenantConfig, UsageRecord,
};
pub use services::{
    AnalyticsError, AnalyticsResult, ResolvedStore, TenantAnalyticsAggregator,
    resolve_store_client,
};
pub use store::{StoreClient, StoreConnector, StoreError, StoreResult, connect_store};
