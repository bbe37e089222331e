use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One usage event after schema normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Combined input + output tokens.
    pub tokens: i64,
    /// Cost in dollars.
    pub cost: f64,
    /// None when the row's timestamp is missing or unparseable.
    pub created_at: Option<DateTime<Utc>>,
}

/// Usage summed over one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBucket {
    /// Day label, `DD/MM`.
    pub date: String,
    pub tokens: i64,
    pub cost: f64,
}

/// Aggregated analytics for one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantAnalytics {
    pub total_messages: u64,
    pub total_leads: u64,
    pub total_tokens: i64,
    /// Total cost in dollars.
    pub total_cost: f64,
    /// Oldest day first; never empty.
    pub daily_series: Vec<DailyBucket>,
    pub using_isolated_store: bool,
}
