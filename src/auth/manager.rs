use chrono::{DateTime, Duration, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::clock::{Clock, SystemClock};
use super::exchange::CredentialExchanger;
use super::secrets::SecretSource;
use super::store::TokenStore;
use super::types::{mask_token, AuthState, CachedToken, FullConfig, Provider, TokenStatus};
use crate::error::AuthError;

/// Validity of manually supplied tokens and of exchanged tokens without `expires_in`
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Default safety margin subtracted from server-declared lifetimes
pub const DEFAULT_REFRESH_THRESHOLD: u64 = 300;

/// Upper bound on the lifetime taken from a token response (one year)
const MAX_TOKEN_LIFETIME_SECS: i64 = 365 * 24 * 3600;

/// Authentication manager
/// Single source of truth for bearer tokens of every provider in this process.
///
/// Construct once at startup and share by reference. The check-then-refresh
/// sequence holds no lock across the exchange; separate processes sharing the
/// token file resolve conflicts last-write-wins.
pub struct AuthManager {
    /// Tokens and the secret-less service principal configuration
    state: RwLock<AuthState>,

    /// Token file backing the state
    store: TokenStore,

    /// Client-credentials exchange
    exchanger: Arc<dyn CredentialExchanger>,

    /// Environment token override and client secret
    secrets: Arc<dyn SecretSource>,

    /// Time source for validity checks
    clock: Arc<dyn Clock>,

    /// Seconds subtracted from `expires_in` (default: 300 = 5 minutes)
    refresh_threshold: i64,
}

impl AuthManager {
    /// Create a new AuthManager hydrated from the token store
    pub fn new(
        store: TokenStore,
        exchanger: Arc<dyn CredentialExchanger>,
        secrets: Arc<dyn SecretSource>,
    ) -> Self {
        tracing::debug!("Loading auth state from {}", store.path().display());
        let state = store.load();

        Self {
            state: RwLock::new(state),
            store,
            exchanger,
            secrets,
            clock: Arc::new(SystemClock),
            refresh_threshold: DEFAULT_REFRESH_THRESHOLD as i64,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_refresh_threshold(mut self, seconds: u64) -> Self {
        self.refresh_threshold = i64::try_from(seconds).unwrap_or(i64::MAX);
        self
    }

    /// Path of the backing token file
    pub fn store_path(&self) -> &Path {
        self.store.path()
    }

    /// Whether an externally supplied token overrides the cache
    pub fn has_override_token(&self) -> bool {
        self.secrets.bearer_token().is_some()
    }

    /// Store a token manually, valid for one hour from now
    pub async fn set_token(&self, token: &str, provider: Provider) {
        let token = token.trim().to_string();
        let expires_at = self.clock.now() + Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS);

        tracing::info!(
            "Setting {} token {} (expires: {})",
            provider,
            mask_token(&token),
            expires_at.to_rfc3339()
        );

        self.state
            .write()
            .await
            .set_token(provider, CachedToken::new(token, expires_at));
        self.persist().await;
    }

    /// Remember a service principal and exchange it for tokens of every provider
    ///
    /// Not atomic: when the second exchange fails the first token stays
    /// stored and usable, and the error is returned.
    pub async fn set_credential_config(&self, config: &FullConfig) -> Result<(), AuthError> {
        tracing::info!(
            "Storing service principal configuration (client_id={}, tenant_id={})",
            config.client_id,
            config.tenant_id
        );

        self.state.write().await.spn_config = Some(config.stored());
        self.persist().await;

        for provider in Provider::ALL {
            self.exchange(config, provider).await?;
        }

        Ok(())
    }

    /// Get a valid access token for a provider, refreshing if necessary
    ///
    /// Resolution order: environment token, cached token still valid,
    /// refresh through the stored configuration.
    pub async fn get_access_token(&self, provider: Provider) -> Result<String, AuthError> {
        if let Some(token) = self.secrets.bearer_token() {
            tracing::debug!("Using {} token from environment", provider);
            self.set_token(&token, provider).await;
            return Ok(token);
        }

        let now = self.clock.now();
        {
            let state = self.state.read().await;
            match state.token(provider) {
                Some(cached) if cached.is_valid_at(now) => {
                    return Ok(cached.access_token.clone());
                }
                Some(cached) => tracing::info!(
                    "{} token expired at {}, refreshing...",
                    provider,
                    cached.expires_at.to_rfc3339()
                ),
                None => tracing::debug!("No cached {} token", provider),
            }
        }

        self.refresh_token(provider).await
    }

    /// Request headers for a call to the provider's API
    pub async fn get_headers(&self, provider: Provider) -> Result<HeaderMap, AuthError> {
        let token = self.get_access_token(provider).await?;

        let authorization = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| AuthError::InvalidHeader(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Snapshot of the current state for diagnostics
    pub async fn get_state(&self) -> AuthState {
        self.state.read().await.clone()
    }

    /// Status of one provider's cached token at the current time
    pub async fn token_status(&self, provider: Provider) -> TokenStatus {
        self.state
            .read()
            .await
            .token_status(provider, self.clock.now())
    }

    /// Re-exchange the stored configuration for one provider
    async fn refresh_token(&self, provider: Provider) -> Result<String, AuthError> {
        let stored = self
            .state
            .read()
            .await
            .spn_config
            .clone()
            .ok_or(AuthError::NoCredentialSource { provider })?;

        let secret = self
            .secrets
            .client_secret()
            .ok_or_else(|| AuthError::MissingClientSecret {
                variable: self.secrets.client_secret_hint(),
            })?;

        tracing::debug!("Refreshing {} token...", provider);
        self.exchange(&stored.with_secret(secret), provider).await
    }

    /// Exchange, store and persist a token for one provider
    async fn exchange(&self, config: &FullConfig, provider: Provider) -> Result<String, AuthError> {
        let exchanged = self.exchanger.acquire(config, provider.scope()).await?;
        let expires_at = self.expiry_from(exchanged.expires_in);

        tracing::info!(
            "{} token acquired, expires: {}",
            provider,
            expires_at.to_rfc3339()
        );

        self.state.write().await.set_token(
            provider,
            CachedToken::new(exchanged.access_token.clone(), expires_at),
        );
        self.persist().await;

        Ok(exchanged.access_token)
    }

    /// Absolute expiry with the refresh threshold taken off the declared lifetime
    fn expiry_from(&self, expires_in: Option<u64>) -> DateTime<Utc> {
        let lifetime = match expires_in {
            Some(secs) => i64::try_from(secs)
                .unwrap_or(i64::MAX)
                .saturating_sub(self.refresh_threshold)
                .clamp(0, MAX_TOKEN_LIFETIME_SECS),
            None => DEFAULT_TOKEN_LIFETIME_SECS,
        };
        let now = self.clock.now();
        now.checked_add_signed(Duration::seconds(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    async fn persist(&self) {
        let snapshot = self.state.read().await.clone();
        self.store.save(&snapshot);
    }
}
