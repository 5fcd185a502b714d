//! HTTP client for the CRM REST API, and the [`CrmApi`] seam the
//! reconciliation job runs against.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use crate::crm::{
    AssociationBatchRequest, AssociationBatchResponse, PropertyPatch, TicketSearchRequest,
    TicketSearchResponse,
};

/// Default API host; override with [`CrmClientConfig::base_url`] for tests
/// against a local server.
pub const DEFAULT_BASE_URL: &str = "https://api.hubapi.com";

/// Errors from a single CRM API call.
///
/// Each variant carries the request URL plus enough detail to diagnose the
/// failure from the log line alone.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The remote server replied with a non-2xx HTTP status code.
    #[error("HTTP {status} from {url}: {body}")]
    Http { status: u16, url: String, body: String },
    /// The request could not be sent or the connection failed.
    #[error("request to {url} failed: {detail}")]
    Transport { url: String, detail: String },
    /// Response body could not be parsed as the expected JSON structure.
    #[error("failed to decode response from {url}: {detail}")]
    Decode { url: String, detail: String },
}

/// The remote operations the job needs. `CrmClient` is the production
/// implementation; tests drive the job with an in-memory fake.
#[allow(async_fn_in_trait)]
pub trait CrmApi {
    /// Fetch one page of tickets associated with `company_id`, starting at
    /// the given continuation cursor (None for the first page).
    async fn search_tickets(
        &self,
        company_id: &str,
        after: Option<String>,
    ) -> Result<TicketSearchResponse, ApiError>;

    /// Batch-resolve ticket ids to their associated deal ids. Tickets with
    /// no associated deal are absent from the returned map.
    async fn deal_associations(
        &self,
        ticket_ids: &[String],
    ) -> Result<HashMap<String, String>, ApiError>;

    /// Patch credit properties onto the company record.
    async fn patch_company(&self, company_id: &str, patch: &PropertyPatch)
        -> Result<(), ApiError>;

    /// Patch credit properties onto one deal record.
    async fn patch_deal(&self, deal_id: &str, patch: &PropertyPatch) -> Result<(), ApiError>;
}

/// Configuration for [`CrmClient`].
#[derive(Debug, Clone)]
pub struct CrmClientConfig {
    /// Base URL of the CRM API.
    pub base_url: String,
    /// TCP connection timeout.
    pub connect_timeout: Duration,
    /// Per-request read timeout.
    pub request_timeout: Duration,
}

impl CrmClientConfig {
    /// Create a config with sensible defaults.
    ///
    /// - connect_timeout: 5 s
    /// - request_timeout: 30 s
    pub fn new(base_url: impl Into<String>) -> Self {
        CrmClientConfig {
            base_url: base_url.into(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for CrmClientConfig {
    fn default() -> Self {
        CrmClientConfig::new(DEFAULT_BASE_URL)
    }
}

/// Production [`CrmApi`] implementation over `reqwest` with bearer auth.
pub struct CrmClient {
    config: CrmClientConfig,
    token: String,
    client: reqwest::Client,
}

impl CrmClient {
    pub fn new(config: CrmClientConfig, token: impl Into<String>) -> Self {
        // Builder failure is only possible in exotic TLS environments; fall
        // back to the default client rather than erroring out of new().
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_default();

        CrmClient {
            config,
            token: token.into(),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Send a JSON request and check the status. Non-2xx responses are
    /// turned into [`ApiError::Http`] with the response body attached.
    async fn send_checked(
        &self,
        req: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let resp = req
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ApiError::Transport {
                url: url.to_string(),
                detail: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Http {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }
        Ok(resp)
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
        url: &str,
    ) -> Result<T, ApiError> {
        resp.json::<T>().await.map_err(|e| ApiError::Decode {
            url: url.to_string(),
            detail: e.to_string(),
        })
    }
}

impl CrmApi for CrmClient {
    async fn search_tickets(
        &self,
        company_id: &str,
        after: Option<String>,
    ) -> Result<TicketSearchResponse, ApiError> {
        let url = self.url("/crm/v3/objects/tickets/search");
        let body = TicketSearchRequest::for_company(company_id, after);
        let resp = self.send_checked(self.client.post(&url).json(&body), &url).await?;
        Self::decode(resp, &url).await
    }

    async fn deal_associations(
        &self,
        ticket_ids: &[String],
    ) -> Result<HashMap<String, String>, ApiError> {
        let url = self.url("/crm/v3/associations/tickets/deals/batch/read");
        let body = AssociationBatchRequest::new(ticket_ids);
        let resp = self.send_checked(self.client.post(&url).json(&body), &url).await?;
        let parsed: AssociationBatchResponse = Self::decode(resp, &url).await?;
        Ok(parsed.into_deal_map())
    }

    async fn patch_company(
        &self,
        company_id: &str,
        patch: &PropertyPatch,
    ) -> Result<(), ApiError> {
        let url = self.url(&format!("/crm/v3/objects/companies/{company_id}"));
        self.send_checked(self.client.patch(&url).json(patch), &url).await?;
        Ok(())
    }

    async fn patch_deal(&self, deal_id: &str, patch: &PropertyPatch) -> Result<(), ApiError> {
        let url = self.url(&format!("/crm/v3/objects/deals/{deal_id}"));
        self.send_checked(self.client.patch(&url).json(patch), &url).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let cfg = CrmClientConfig::default();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.connect_timeout, Duration::from_secs(5));
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_config_custom_base_url() {
        let cfg = CrmClientConfig::new("http://127.0.0.1:9900");
        assert_eq!(cfg.base_url, "http://127.0.0.1:9900");
    }

    #[test]
    fn test_client_url_joins_path() {
        let client = CrmClient::new(CrmClientConfig::new("http://localhost:9900"), "token");
        assert_eq!(
            client.url("/crm/v3/objects/tickets/search"),
            "http://localhost:9900/crm/v3/objects/tickets/search"
        );
    }

    #[test]
    fn test_api_error_display_http() {
        let err = ApiError::Http {
            status: 403,
            url: "https://api.example.com/x".to_string(),
            body: "forbidden".to_string(),
        };
        let s = err.to_string();
        assert!(s.contains("403"), "status in display: {s}");
        assert!(s.contains("https://api.example.com/x"), "url in display: {s}");
        assert!(s.contains("forbidden"), "body in display: {s}");
    }

    #[test]
    fn test_api_error_display_transport() {
        let err = ApiError::Transport {
            url: "https://api.example.com".to_string(),
            detail: "connection refused".to_string(),
        };
        let s = err.to_string();
        assert!(s.contains("connection refused"), "detail in display: {s}");
    }

    #[test]
    fn test_api_error_is_std_error() {
        fn assert_error<E: std::error::Error>(_: &E) {}
        let err = ApiError::Decode { url: "x".to_string(), detail: "y".to_string() };
        assert_error(&err);
    }
}
