//! PostgREST store backend.
//!
//! Talks to any PostgREST server, including Supabase projects, where tables
//! are exposed as `GET {base}/{table}` with query-string filters. Counts use
//! `HEAD` with `Prefer: count=exact` and read the total from `Content-Range`.
//! Selects page with `offset`/`limit`, since the server silently caps each
//! response at its `max-rows`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, header};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{Filter, Row, SelectQuery, StoreClient, StoreError, StoreResult, ensure_identifier};
use crate::config::RestStoreConfig;

/// Error body returned by PostgREST.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

/// Client for a PostgREST endpoint.
#[derive(Clone)]
pub struct RestStoreClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    page_size: u32,
}

impl RestStoreClient {
    pub fn new(config: &RestStoreConfig) -> StoreResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Connect {
                backend: "rest",
                message: format!("failed to build HTTP client: {e}"),
            })?;

        let path = config.rest_path.trim_matches('/');
        let base = config.url.trim_end_matches('/');
        let base_url = if path.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{path}")
        };

        Ok(Self {
            http_client,
            base_url,
            api_key: config.api_key.clone(),
            page_size: config.page_size,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> StoreResult<String> {
        ensure_identifier(table)?;
        Ok(format!("{}/{}", self.base_url, table))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Total row count from a response sent with `Prefer: count=exact`.
    fn response_total(response: &Response) -> Option<u64> {
        response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| parse_content_range_total(v).ok())
    }

    fn filter_params(filter: Option<&Filter>) -> StoreResult<Vec<(String, String)>> {
        match filter {
            Some(filter) => {
                ensure_identifier(&filter.column)?;
                Ok(vec![(filter.column.clone(), format!("eq.{}", filter.value))])
            }
            None => Ok(Vec::new()),
        }
    }

    /// Turn a non-success response into a `StoreError`, keeping the
    /// PostgREST error code when the body carries one.
    async fn error_from_response(response: Response) -> StoreError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        match serde_json::from_str::<PostgrestError>(&body) {
            Ok(err) => {
                let mut message = err.message.unwrap_or_else(|| format!("HTTP {status}"));
                if let Some(details) = err.details.filter(|d| !d.is_empty()) {
                    message = format!("{message} ({details})");
                }
                if let Some(hint) = err.hint.filter(|h| !h.is_empty()) {
                    message = format!("{message}; hint: {hint}");
                }
                StoreError::Api {
                    status,
                    code: err.code,
                    message,
                }
            }
            Err(_) => StoreError::Api {
                status,
                code: None,
                message: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body
                },
            },
        }
    }
}

/// Parse the total out of a `Content-Range` header (`0-24/42`, `*/42`).
fn parse_content_range_total(value: &str) -> StoreResult<u64> {
    let total = value
        .rsplit_once('/')
        .map(|(_, total)| total.trim())
        .ok_or_else(|| {
            StoreError::InvalidResponse(format!("malformed Content-Range header: {value}"))
        })?;

    total.parse::<u64>().map_err(|_| {
        StoreError::InvalidResponse(format!("Content-Range carries no exact count: {value}"))
    })
}

#[async_trait]
impl StoreClient for RestStoreClient {
    #[instrument(skip(self, filter), fields(backend = "rest"))]
    async fn count(&self, table: &str, filter: Option<&Filter>) -> StoreResult<u64> {
        let url = self.table_url(table)?;
        let params = Self::filter_params(filter)?;

        let response = self
            .authorized(self.http_client.head(&url))
            .query(&[("select", "*")])
            .query(&params)
            .header("Prefer", "count=exact")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let range = response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                StoreError::InvalidResponse("count response has no Content-Range header".into())
            })?;

        let total = parse_content_range_total(range)?;
        debug!(total, "Counted rows");
        Ok(total)
    }

    #[instrument(skip(self, query), fields(backend = "rest", table = %query.table))]
    async fn select(&self, query: &SelectQuery) -> StoreResult<Vec<Row>> {
        query.validate()?;
        let url = self.table_url(&query.table)?;

        let mut params = vec![("select".to_string(), query.column_names().join(","))];
        params.extend(Self::filter_params(query.filter.as_ref())?);
        if let Some(order_by) = &query.order_by {
            params.push((
                "order".to_string(),
                format!("{}.{}", order_by.column, order_by.order.as_rest()),
            ));
        }

        let mut rows: Vec<Row> = Vec::new();
        let mut total: Option<u64> = None;
        loop {
            let remaining = query
                .limit
                .map_or(u32::MAX, |limit| limit.saturating_sub(rows.len() as u32));
            let page_size = remaining.min(self.page_size);
            if page_size == 0 {
                break;
            }

            let mut request = self
                .authorized(self.http_client.get(&url))
                .query(&params)
                .query(&[("offset", rows.len() as u64), ("limit", u64::from(page_size))]);
            if total.is_none() {
                request = request.header("Prefer", "count=exact");
            }
            let response = request.send().await?;

            if !response.status().is_success() {
                return Err(Self::error_from_response(response).await);
            }
            if total.is_none() {
                total = Self::response_total(&response);
            }

            let page: Vec<Row> = response.json().await.map_err(|e| {
                StoreError::InvalidResponse(format!("expected an array of rows: {e}"))
            })?;
            let fetched = page.len();
            rows.extend(page);

            // Without a total, a short page is the last one
            let done = match total {
                Some(total) => fetched == 0 || rows.len() as u64 >= total,
                None => fetched < page_size as usize,
            };
            if done {
                break;
            }
        }

        debug!(rows = rows.len(), "Selected rows");
        Ok(rows)
    }

    async fn health_check(&self) -> StoreResult<()> {
        let response = self
            .authorized(self.http_client.get(format!("{}/", self.base_url)))
            .send()
            .await
            .map_err(|e| StoreError::Connect {
                backend: "rest",
                message: e.to_string(),
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            let err = Self::error_from_response(response).await;
            Err(StoreError::Connect {
                backend: "rest",
                message: err.to_string(),
            })
        }
    }

    fn backend_name(&self) -> &'static str {
        "rest"
    }
}
