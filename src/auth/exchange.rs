// OAuth2 client-credentials exchange

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::types::{mask_token, ExchangedToken, FullConfig, TokenResponse};
use crate::error::AuthError;

/// One client-credentials exchange for one (configuration, scope) pair.
///
/// Implementations do no caching; that is the auth manager's job.
#[async_trait]
pub trait CredentialExchanger: Send + Sync {
    async fn acquire(&self, config: &FullConfig, scope: &str)
        -> Result<ExchangedToken, AuthError>;
}

/// Token endpoint for a tenant, e.g. https://login.microsoftonline.com/{tenant}/oauth2/v2.0/token
fn get_token_url(config: &FullConfig) -> String {
    format!("{}/oauth2/v2.0/token", config.authority_url())
}

/// Exchanger talking to the Microsoft identity platform
pub struct AadExchanger {
    client: Client,
}

impl AadExchanger {
    pub fn new(timeout: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CredentialExchanger for AadExchanger {
    async fn acquire(
        &self,
        config: &FullConfig,
        scope: &str,
    ) -> Result<ExchangedToken, AuthError> {
        let url = get_token_url(config);
        let exchange_error = |description: String| AuthError::CredentialExchange {
            scope: scope.to_string(),
            description,
        };

        tracing::debug!(
            "Requesting token: url={}, scope={}, client_id={}",
            url,
            scope,
            config.client_id
        );

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("scope", scope),
        ];

        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| exchange_error(format!("token request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        // Error responses still carry a JSON body with error/error_description
        let data: TokenResponse = match serde_json::from_str(&body) {
            Ok(data) => data,
            Err(_) if !status.is_success() => {
                tracing::error!("Token request failed: status={}, body={}", status, body);
                return Err(exchange_error(format!("{} - {}", status, body)));
            }
            Err(e) => return Err(exchange_error(format!("invalid token response: {}", e))),
        };

        match data.access_token {
            Some(access_token) if status.is_success() && !access_token.is_empty() => {
                tracing::debug!(
                    "Token acquired for {}: {} (expires_in={:?})",
                    scope,
                    mask_token(&access_token),
                    data.expires_in
                );
                Ok(ExchangedToken {
                    access_token,
                    expires_in: data.expires_in,
                })
            }
            _ => {
                let description = data
                    .error_description
                    .unwrap_or_else(|| "Unknown error".to_string());
                tracing::error!(
                    "Token request rejected: status={}, error={}, description={}",
                    status,
                    data.error.as_deref().unwrap_or("unknown"),
                    description
                );
                Err(exchange_error(description))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn config_for(server: &Server) -> FullConfig {
        FullConfig::new("client-id".into(), "client-secret".into(), "tenant-id".into())
            .with_authority(server.url())
    }

    #[test]
    fn test_token_url() {
        let config = FullConfig::new("c".into(), "s".into(), "tenant".into());
        assert_eq!(
            get_token_url(&config),
            "https://login.microsoftonline.com/tenant/oauth2/v2.0/token"
        );
    }

    #[tokio::test]
    async fn test_acquire_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/tenant-id/oauth2/v2.0/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                Matcher::UrlEncoded("client_id".into(), "client-id".into()),
                Matcher::UrlEncoded("client_secret".into(), "client-secret".into()),
                Matcher::UrlEncoded(
                    "scope".into(),
                    "https://api.fabric.microsoft.com/.default".into(),
                ),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"token_type":"Bearer","expires_in":3599,"access_token":"eyJ0eXAi"}"#)
            .expect(1)
            .create_async()
            .await;

        let exchanger = AadExchanger::new(5).unwrap();
        let token = exchanger
            .acquire(&config_for(&server), "https://api.fabric.microsoft.com/.default")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(token.access_token, "eyJ0eXAi");
        assert_eq!(token.expires_in, Some(3599));
    }

    #[tokio::test]
    async fn test_acquire_rejected_with_description() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/tenant-id/oauth2/v2.0/token")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"error":"invalid_client","error_description":"AADSTS7000215: Invalid client secret provided."}"#,
            )
            .create_async()
            .await;

        let exchanger = AadExchanger::new(5).unwrap();
        let err = exchanger
            .acquire(&config_for(&server), "https://management.azure.com/.default")
            .await
            .unwrap_err();

        match err {
            AuthError::CredentialExchange { scope, description } => {
                assert_eq!(scope, "https://management.azure.com/.default");
                assert_eq!(description, "AADSTS7000215: Invalid client secret provided.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_acquire_without_access_token() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/tenant-id/oauth2/v2.0/token")
            .with_status(200)
            .with_body(r#"{"token_type":"Bearer"}"#)
            .create_async()
            .await;

        let exchanger = AadExchanger::new(5).unwrap();
        let err = exchanger
            .acquire(&config_for(&server), "https://api.fabric.microsoft.com/.default")
            .await
            .unwrap_err();

        assert!(err.to_string().ends_with("Unknown error"));
    }

    #[tokio::test]
    async fn test_acquire_non_json_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/tenant-id/oauth2/v2.0/token")
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;

        let exchanger = AadExchanger::new(5).unwrap();
        let err = exchanger
            .acquire(&config_for(&server), "https://api.fabric.microsoft.com/.default")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("Bad Gateway"));
    }
}
