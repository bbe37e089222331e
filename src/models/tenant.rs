use serde::{Deserialize, Serialize};

/// Credentials for a tenant-supplied isolated store.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IsolatedStoreCredentials {
    /// Endpoint URL (REST base URL or database connection URL).
    pub endpoint: String,
    /// Secret key authorizing access to the endpoint.
    pub secret: String,
}

// Keep the secret out of logs
impl std::fmt::Debug for IsolatedStoreCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsolatedStoreCredentials")
            .field("endpoint", &self.endpoint)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// A tenant's configuration record, as read from the shared store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TenantConfig {
    /// Opaque tenant identifier.
    pub tenant_id: String,

    /// Set only when both the endpoint and the secret are present.
    pub isolated_store: Option<IsolatedStoreCredentials>,

    /// Whether rows in the isolated store carry the tenant id column.
    /// Rows in the shared store always do.
    pub tags_tenant_rows: bool,
}

impl TenantConfig {
    /// Config for a tenant with no record: shared store, tenant-filtered.
    pub fn shared(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            isolated_store: None,
            tags_tenant_rows: true,
        }
    }

    /// Build a config from the raw record fields. Blank credentials count as absent.
    pub fn from_parts(
        tenant_id: impl Into<String>,
        endpoint: Option<String>,
        secret: Option<String>,
        tags_tenant_rows: bool,
    ) -> Self {
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        let isolated_store = match (present(endpoint), present(secret)) {
            (Some(endpoint), Some(secret)) => Some(IsolatedStoreCredentials { endpoint, secret }),
            _ => None,
        };

        Self {
            tenant_id: tenant_id.into(),
            isolated_store,
            tags_tenant_rows,
        }
    }

    pub fn is_isolated(&self) -> bool {
        self.isolated_store.is_some()
    }

    /// Whether queries for this tenant filter on the tenant column.
    pub fn filters_by_tenant(&self) -> bool {
        !self.is_isolated() || self.tags_tenant_rows
    }
}
