use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{mask_token, AuthManager, Provider};
use crate::config::Config;
use crate::error::ApiError;

/// HTTP client for the Fabric and management APIs
///
/// Headers are fetched from the auth manager for every request so that a token
/// expiring between two calls is refreshed transparently.
pub struct FabricHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Authentication manager
    auth_manager: Arc<AuthManager>,

    /// Fabric REST API base, e.g. https://api.fabric.microsoft.com/v1
    fabric_api_url: String,

    /// Resource-management API base, e.g. https://management.azure.com
    management_api_url: String,
}

impl FabricHttpClient {
    /// Create a new HTTP client
    pub fn new(auth_manager: Arc<AuthManager>, config: &Config) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.http_connect_timeout))
            .timeout(Duration::from_secs(config.http_request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            auth_manager,
            fabric_api_url: config.fabric_api_url.clone(),
            management_api_url: config.management_api_url.clone(),
        })
    }

    /// Full URL for a Fabric API path
    pub fn fabric_url(&self, path: &str) -> String {
        format!("{}/{}", self.fabric_api_url, path.trim_start_matches('/'))
    }

    /// Full URL for a management API path
    pub fn management_url(&self, path: &str) -> String {
        format!("{}/{}", self.management_api_url, path.trim_start_matches('/'))
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send a request authenticated for `provider`
    /// Non-success statuses become `ApiError::Upstream` with the response body
    pub async fn send(&self, provider: Provider, builder: RequestBuilder) -> Result<Response, ApiError> {
        let headers = self.auth_manager.get_headers(provider).await?;
        self.execute(builder.headers(headers)).await
    }

    /// Send a request authenticated for `provider`, keeping the builder's Content-Type
    pub async fn send_with_authorization(
        &self,
        provider: Provider,
        builder: RequestBuilder,
    ) -> Result<Response, ApiError> {
        let mut headers = self.auth_manager.get_headers(provider).await?;
        let mut authorization = HeaderMap::new();
        if let Some(value) = headers.remove(AUTHORIZATION) {
            authorization.insert(AUTHORIZATION, value);
        }
        self.execute(builder.headers(authorization)).await
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let request = builder.build()?;
        let method = request.method().clone();
        let url = request.url().clone();

        tracing::info!(method = %method, url = %url, "Sending HTTP request");
        tracing::debug!(headers = ?masked_headers(request.headers()), "Request headers");

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                let error_kind = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connection_failed"
                } else if e.is_request() {
                    "request_error"
                } else {
                    "unknown"
                };

                tracing::error!(
                    error_kind = error_kind,
                    error = %e,
                    url = %url,
                    "HTTP request error"
                );
                return Err(ApiError::Request(format!("{} (kind: {})", e, error_kind)));
            }
        };

        let status = response.status();
        tracing::info!(status = %status, "Received HTTP response");
        tracing::debug!(headers = ?response.headers(), "Response headers");

        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        tracing::error!(
            status = status.as_u16(),
            url = %url,
            response_body = %error_text,
            "HTTP request failed with error response"
        );

        Err(ApiError::Upstream {
            status: status.as_u16(),
            message: error_text,
        })
    }
}

/// Copy of the headers with the bearer value shortened for logging
fn masked_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = value.to_str().unwrap_or("<binary>");
            let shown = if name == AUTHORIZATION {
                mask_token(value)
            } else {
                value.to_string()
            };
            (name.to_string(), shown)
        })
        .collect()
}
