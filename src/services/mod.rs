mod analytics;
mod daily_series;
pub mod tenant_configs;
pub mod usage_shapes;

pub use analytics::{
    AnalyticsError, AnalyticsResult, ResolvedStore, TenantAnalyticsAggregator,
    resolve_store_client,
};
pub use daily_series::build_daily_series;
pub use tenant_configs::TenantConfigLookup;
pub use usage_shapes::{TokenColumns, USAGE_SHAPES, UsageShape};
