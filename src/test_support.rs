// Shared fixtures for unit tests

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::auth::{
    AuthManager, CredentialExchanger, ExchangedToken, FullConfig, StaticSecrets, TokenStore,
};
use crate::config::Config;
use crate::error::AuthError;
use crate::http_client::FabricHttpClient;

/// Config pointing every endpoint at a mock server
pub(crate) fn test_config(server_url: &str, dir: &Path) -> Config {
    Config {
        auth_file: dir.join("auth.json"),
        authority: server_url.to_string(),
        fabric_api_url: format!("{}/v1", server_url),
        management_api_url: server_url.to_string(),
        token_refresh_threshold: 300,
        http_connect_timeout: 5,
        http_request_timeout: 10,
        log_level: "debug".to_string(),
    }
}

/// Exchanger for tests that must never reach the identity platform
pub(crate) struct NoExchange;

#[async_trait]
impl CredentialExchanger for NoExchange {
    async fn acquire(&self, _config: &FullConfig, scope: &str) -> Result<ExchangedToken, AuthError> {
        Err(AuthError::CredentialExchange {
            scope: scope.to_string(),
            description: "exchange disabled in tests".to_string(),
        })
    }
}

/// HTTP client authenticated with the bearer value "token" for every provider
pub(crate) fn token_client(server_url: &str, dir: &Path) -> FabricHttpClient {
    let auth = Arc::new(AuthManager::new(
        TokenStore::new(dir.join("auth.json")),
        Arc::new(NoExchange),
        Arc::new(StaticSecrets {
            bearer_token: Some("token".to_string()),
            client_secret: None,
        }),
    ));
    FabricHttpClient::new(auth, &test_config(server_url, dir)).unwrap()
}
