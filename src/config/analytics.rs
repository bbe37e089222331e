use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyticsConfig {
    /// Maximum number of distinct days kept in the daily series.
    #[serde(default = "default_series_days")]
    pub series_days: usize,

    /// Tenant-local UTC offset used to assign usage events to calendar days,
    /// formatted `+HH:MM` / `-HH:MM`.
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,

    /// Label of the single zero bucket returned when a tenant has no usage.
    #[serde(default = "default_empty_series_label")]
    pub empty_series_label: String,

    /// Whether isolated stores tag their rows with the tenant id, for config
    /// records that don't carry the capability column.
    #[serde(default = "default_true")]
    pub default_tags_tenant_rows: bool,

    /// Accept `sqlite:` endpoints on tenant config records. Such an endpoint
    /// opens a file on this host, so it is off unless every config record is
    /// written by an operator.
    #[serde(default)]
    pub allow_local_isolated_stores: bool,

    /// Table and column names of the tenant data.
    #[serde(default)]
    pub tables: TableNames,

    /// Table and column names of the tenant config records.
    #[serde(default)]
    pub tenant_configs: TenantConfigColumns,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            series_days: default_series_days(),
            utc_offset: default_utc_offset(),
            empty_series_label: default_empty_series_label(),
            default_tags_tenant_rows: true,
            allow_local_isolated_stores: false,
            tables: TableNames::default(),
            tenant_configs: TenantConfigColumns::default(),
        }
    }
}

impl AnalyticsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.series_days == 0 {
            return Err(ConfigError::Validation(
                "analytics.series_days must be at least 1".into(),
            ));
        }
        self.offset()?;

        let identifiers = [
            ("analytics.tables.messages", &self.tables.messages),
            ("analytics.tables.leads", &self.tables.leads),
            ("analytics.tables.usage", &self.tables.usage),
            ("analytics.tables.tenant_column", &self.tables.tenant_column),
            ("analytics.tenant_configs.table", &self.tenant_configs.table),
            (
                "analytics.tenant_configs.tenant_column",
                &self.tenant_configs.tenant_column,
            ),
            (
                "analytics.tenant_configs.endpoint_column",
                &self.tenant_configs.endpoint_column,
            ),
            (
                "analytics.tenant_configs.secret_column",
                &self.tenant_configs.secret_column,
            ),
            (
                "analytics.tenant_configs.tags_tenant_rows_column",
                &self.tenant_configs.tags_tenant_rows_column,
            ),
        ];
        for (key, value) in identifiers {
            if !is_identifier(value) {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a plain SQL identifier, got '{value}'"
                )));
            }
        }
        Ok(())
    }

    /// Parse [`utc_offset`](Self::utc_offset).
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        parse_utc_offset(&self.utc_offset)
    }
}

/// Table and column names of the per-tenant data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableNames {
    pub messages: String,
    pub leads: String,
    pub usage: String,
    /// Column holding the tenant identifier on every tenant data table.
    pub tenant_column: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            messages: "messages".to_string(),
            leads: "leads".to_string(),
            usage: "token_usage".to_string(),
            tenant_column: "client_id".to_string(),
        }
    }
}

/// Where tenant config records live in the shared store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TenantConfigColumns {
    pub table: String,
    pub tenant_column: String,
    /// Isolated store endpoint URL.
    pub endpoint_column: String,
    /// Isolated store secret key.
    pub secret_column: String,
    /// Boolean capability flag: the isolated store tags rows with the tenant id.
    pub tags_tenant_rows_column: String,
}

impl Default for TenantConfigColumns {
    fn default() -> Self {
        Self {
            table: "agent_configs".to_string(),
            tenant_column: "client_id".to_string(),
            endpoint_column: "supabase_url".to_string(),
            secret_column: "supabase_service_role_key".to_string(),
            tags_tenant_rows_column: "isolated_rows_tagged".to_string(),
        }
    }
}

/// Table and column names end up inside SQL text and REST paths.
pub(crate) fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_utc_offset(value: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = || {
        ConfigError::Validation(format!(
            "analytics.utc_offset must look like +HH:MM or -HH:MM, got '{value}'"
        ))
    };

    let (sign, rest) = match value.as_bytes().first() {
        Some(b'+') => (1, &value[1..]),
        Some(b'-') => (-1, &value[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

fn default_series_days() -> usize {
    7
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}

fn default_empty_series_label() -> String {
    "Today".to_string()
}

fn default_true() -> bool {
    true
}
