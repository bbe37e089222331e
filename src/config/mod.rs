//! Configuration for the analytics service.
//!
//! Configured via a TOML file, with support for environment variable
//! interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [shared_store]
//! type = "rest"
//! url = "https://admin-project.supabase.co"
//! api_key = "${SUPABASE_SERVICE_ROLE_KEY}"
//!
//! [analytics]
//! series_days = 7
//! utc_offset = "-03:00"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

mod analytics;
mod observability;
mod store;

use std::path::Path;

pub use analytics::*;
pub(crate) use analytics::is_identifier;
pub use observability::*;
use serde::{Deserialize, Serialize};
pub use store::*;

/// Root configuration for the analytics service.
///
/// Only the shared store is required; every other section has defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyticsServiceConfig {
    /// The shared multi-tenant store. Also holds the tenant config records.
    pub shared_store: StoreConfig,

    /// Aggregation tunables and table/column naming.
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AnalyticsServiceConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let config: AnalyticsServiceConfig =
            toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    fn validate(&self) -> Result<(), ConfigError> {
        self.shared_store.validate()?;
        self.analytics.validate()?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand environment variables in the format `${VAR_NAME}`.
/// Skips commented lines (lines where content before the variable is a comment).
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ConfigError::Validation(format!("invalid interpolation pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let Some(whole) = cap.get(0) else { continue };

            // Variables inside a trailing comment stay verbatim
            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            result.push_str(&line[last_end..whole.start()]);
            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            result.push_str(&value);
            last_end = whole.end();
        }

        result.push_str(&line[last_end..]);
        result.push('\n');
    }

    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_minimal_config() {
        let config = AnalyticsServiceConfig::from_str(
            r#"
            [shared_store]
            type = "rest"
            url = "https://admin.supabase.co"
            api_key = "service-key"
        "#,
        )
        .unwrap();

        match &config.shared_store {
            StoreConfig::Rest(rest) => {
                assert_eq!(rest.url, "https://admin.supabase.co");
                assert_eq!(rest.rest_path, "/rest/v1");
                assert_eq!(rest.timeout_secs, 30);
            }
            other => panic!("expected rest store, got {other:?}"),
        }
        assert_eq!(config.analytics.series_days, 7);
        assert_eq!(config.analytics.empty_series_label, "Today");
        assert!(config.analytics.default_tags_tenant_rows);
        assert_eq!(config.analytics.tables.usage, "token_usage");
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_full_config() {
        let config = AnalyticsServiceConfig::from_str(
            r#"
            [shared_store]
            type = "rest"
            url = "https://admin.supabase.co"
            api_key = "service-key"
            rest_path = ""
            timeout_secs = 5

            [analytics]
            series_days = 14
            utc_offset = "-03:00"
            empty_series_label = "Hoje"
            default_tags_tenant_rows = false

            [analytics.tables]
            messages = "chat_messages"
            tenant_column = "tenant_id"

            [analytics.tenant_configs]
            table = "tenants"
            endpoint_column = "store_url"

            [logging]
            level = "debug"
            format = "json"
            filter = "reqwest=warn"
        "#,
        )
        .unwrap();

        assert_eq!(config.analytics.series_days, 14);
        assert_eq!(config.analytics.offset().unwrap().local_minus_utc(), -3 * 3600);
        assert_eq!(config.analytics.empty_series_label, "Hoje");
        assert!(!config.analytics.default_tags_tenant_rows);
        assert_eq!(config.analytics.tables.messages, "chat_messages");
        assert_eq!(config.analytics.tables.leads, "leads");
        assert_eq!(config.analytics.tables.tenant_column, "tenant_id");
        assert_eq!(config.analytics.tenant_configs.table, "tenants");
        assert_eq!(config.analytics.tenant_configs.endpoint_column, "store_url");
        assert_eq!(
            config.analytics.tenant_configs.secret_column,
            "supabase_service_role_key"
        );
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.filter.as_deref(), Some("reqwest=warn"));
    }

    #[test]
    fn test_missing_shared_store_rejected() {
        let result = AnalyticsServiceConfig::from_str("[analytics]\nseries_days = 3\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = AnalyticsServiceConfig::from_str(
            r#"
            [shared_store]
            type = "rest"
            url = "https://admin.supabase.co"
            api_key = "k"
            verbose = true
        "#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_zero_series_days_rejected() {
        let result = AnalyticsServiceConfig::from_str(
            r#"
            [shared_store]
            type = "rest"
            url = "https://admin.supabase.co"
            api_key = "k"

            [analytics]
            series_days = 0
        "#,
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_invalid_utc_offset_rejected() {
        let result = AnalyticsServiceConfig::from_str(
            r#"
            [shared_store]
            type = "rest"
            url = "https://admin.supabase.co"
            api_key = "k"

            [analytics]
            utc_offset = "Brazil"
        "#,
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_unsafe_table_name_rejected() {
        let result = AnalyticsServiceConfig::from_str(
            r#"
            [shared_store]
            type = "rest"
            url = "https://admin.supabase.co"
            api_key = "k"

            [analytics.tables]
            leads = "leads; DROP TABLE leads"
        "#,
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [shared_store]
            type = "rest"
            url = "https://admin.supabase.co"
            api_key = "from-file"
        "#
        )
        .unwrap();

        let config = AnalyticsServiceConfig::from_file(file.path()).unwrap();
        match config.shared_store {
            StoreConfig::Rest(rest) => assert_eq!(rest.api_key, "from-file"),
            other => panic!("expected rest store, got {other:?}"),
        }
    }

    #[test]
    fn test_from_missing_file() {
        let result = AnalyticsServiceConfig::from_file("/nonexistent/analytics.toml");
        assert!(matches!(result, Err(ConfigError::Io(_, _))));
    }

    #[test]
    fn test_env_var_expansion() {
        temp_env::with_var("TEST_SERVICE_KEY", Some("sk-secret"), || {
            let result = expand_env_vars("api_key = \"${TEST_SERVICE_KEY}\"").unwrap();
            assert_eq!(result, "api_key = \"sk-secret\"");
        });
    }

    #[test]
    fn test_env_var_in_comment_ignored() {
        let result = expand_env_vars("# api_key = \"${NONEXISTENT_VAR}\"").unwrap();
        assert_eq!(result, "# api_key = \"${NONEXISTENT_VAR}\"");
    }

    #[test]
    fn test_env_var_after_comment_ignored() {
        let result = expand_env_vars("key = \"value\" # ${NONEXISTENT_VAR}").unwrap();
        assert_eq!(result, "key = \"value\" # ${NONEXISTENT_VAR}");
    }

    #[test]
    fn test_missing_env_var_errors() {
        temp_env::with_var_unset("TEST_DEFINITELY_UNSET", || {
            let result = expand_env_vars("key = \"${TEST_DEFINITELY_UNSET}\"");
            assert!(
                matches!(result, Err(ConfigError::EnvVarNotFound(name)) if name == "TEST_DEFINITELY_UNSET")
            );
        });
    }

    #[test]
    fn test_multiline_expansion_keeps_lines() {
        temp_env::with_var("TEST_STORE_URL", Some("https://x.supabase.co"), || {
            let input = "[shared_store]\ntype = \"rest\"\nurl = \"${TEST_STORE_URL}\"\n";
            let result = expand_env_vars(input).unwrap();
            assert_eq!(
                result,
                "[shared_store]\ntype = \"rest\"\nurl = \"https://x.supabase.co\"\n"
            );
        });
    }
}
