// Authentication types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default identity provider authority
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Token audience
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// Fabric data-platform API
    /// Scope: https://api.fabric.microsoft.com/.default
    Fabric,

    /// Azure resource-management API
    /// Scope: https://management.azure.com/.default
    Management,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Fabric, Provider::Management];

    /// OAuth2 scope requested for this audience
    pub fn scope(&self) -> &'static str {
        match self {
            Provider::Fabric => "https://api.fabric.microsoft.com/.default",
            Provider::Management => "https://management.azure.com/.default",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Fabric => "fabric",
            Provider::Management => "management",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fabric" => Ok(Provider::Fabric),
            "management" => Ok(Provider::Management),
            other => Err(format!(
                "unknown provider '{}' (expected 'fabric' or 'management')",
                other
            )),
        }
    }
}

/// Service principal configuration as persisted (no secret)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredConfig {
    pub client_id: String,
    pub tenant_id: String,
    #[serde(default = "default_authority")]
    pub authority: String,
}

fn default_authority() -> String {
    DEFAULT_AUTHORITY.to_string()
}

impl StoredConfig {
    /// Reattach a secret obtained from a trusted source
    pub fn with_secret(&self, client_secret: String) -> FullConfig {
        FullConfig {
            client_id: self.client_id.clone(),
            client_secret,
            tenant_id: self.tenant_id.clone(),
            authority: self.authority.clone(),
        }
    }
}

/// Service principal configuration including the client secret
///
/// Only ever held in memory for the duration of an exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct FullConfig {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
    pub authority: String,
}

impl FullConfig {
    pub fn new(client_id: String, client_secret: String, tenant_id: String) -> Self {
        Self {
            client_id,
            client_secret,
            tenant_id,
            authority: DEFAULT_AUTHORITY.to_string(),
        }
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    /// Authority URL including the tenant, e.g. https://login.microsoftonline.com/{tenant}
    pub fn authority_url(&self) -> String {
        format!("{}/{}", self.authority.trim_end_matches('/'), self.tenant_id)
    }

    /// Secret-less projection that is safe to persist
    pub fn stored(&self) -> StoredConfig {
        StoredConfig {
            client_id: self.client_id.clone(),
            tenant_id: self.tenant_id.clone(),
            authority: self.authority.clone(),
        }
    }
}

impl fmt::Debug for FullConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FullConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .field("authority", &self.authority)
            .finish()
    }
}

/// Bearer token with its absolute expiry
#[derive(Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn new(access_token: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token,
            expires_at,
        }
    }

    /// Strict comparison: a token expiring exactly at `now` is no longer valid
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &mask_token(&self.access_token))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// In-memory authentication state for all providers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub fabric: Option<CachedToken>,
    pub management: Option<CachedToken>,
    pub spn_config: Option<StoredConfig>,
}

impl AuthState {
    pub fn token(&self, provider: Provider) -> Option<&CachedToken> {
        match provider {
            Provider::Fabric => self.fabric.as_ref(),
            Provider::Management => self.management.as_ref(),
        }
    }

    pub fn set_token(&mut self, provider: Provider, token: CachedToken) {
        match provider {
            Provider::Fabric => self.fabric = Some(token),
            Provider::Management => self.management = Some(token),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fabric.is_none() && self.management.is_none() && self.spn_config.is_none()
    }

    /// Human-readable status of one provider's token
    pub fn token_status(&self, provider: Provider, now: DateTime<Utc>) -> TokenStatus {
        match self.token(provider) {
            None => TokenStatus::Missing,
            Some(token) if token.is_valid_at(now) => TokenStatus::Valid {
                expires_at: token.expires_at,
                remaining: token.expires_at - now,
            },
            Some(token) => TokenStatus::Expired {
                expired_at: token.expires_at,
            },
        }
    }
}

/// Token status used by diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    Missing,
    Valid {
        expires_at: DateTime<Utc>,
        remaining: Duration,
    },
    Expired {
        expired_at: DateTime<Utc>,
    },
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenStatus::Missing => f.write_str("not set"),
            TokenStatus::Valid {
                expires_at,
                remaining,
            } => write!(
                f,
                "valid until {} ({}h {}m left)",
                expires_at.to_rfc3339(),
                remaining.num_hours(),
                remaining.num_minutes() % 60
            ),
            TokenStatus::Expired { expired_at } => {
                write!(f, "expired at {} (will refresh on next use)", expired_at.to_rfc3339())
            }
        }
    }
}

/// Result of a single client-credentials exchange
#[derive(Debug, Clone)]
pub struct ExchangedToken {
    pub access_token: String,
    pub expires_in: Option<u64>,
}

/// Identity provider token response
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub expires_in: Option<u64>,
    #[allow(dead_code)]
    pub token_type: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Mask a bearer value for logging, keeping only a short prefix
pub fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(10).collect();
    format!("{}...", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_provider_scopes() {
        assert_eq!(
            Provider::Fabric.scope(),
            "https://api.fabric.microsoft.com/.default"
        );
        assert_eq!(
            Provider::Management.scope(),
            "https://management.azure.com/.default"
        );
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("fabric".parse::<Provider>().unwrap(), Provider::Fabric);
        assert_eq!("Management".parse::<Provider>().unwrap(), Provider::Management);
        assert!("powerbi".parse::<Provider>().is_err());
    }

    #[test]
    fn test_authority_url() {
        let config = FullConfig::new("client".into(), "secret".into(), "tenant".into());
        assert_eq!(
            config.authority_url(),
            "https://login.microsoftonline.com/tenant"
        );

        let config = config.with_authority("https://login.example.com/");
        assert_eq!(config.authority_url(), "https://login.example.com/tenant");
    }

    #[test]
    fn test_full_config_debug_redacts_secret() {
        let config = FullConfig::new("client".into(), "super-secret".into(), "tenant".into());
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_stored_config_drops_secret() {
        let config = FullConfig::new("client".into(), "secret".into(), "tenant".into());
        let stored = config.stored();
        let json = serde_json::to_string(&stored).unwrap();
        assert!(!json.contains("secret"));
        assert_eq!(stored.with_secret("secret".into()), config);
    }

    #[test]
    fn test_token_validity_is_strict() {
        let expires_at = Utc.with_ymd_and_hms(2025, 1, 12, 10, 0, 0).unwrap();
        let token = CachedToken::new("t".into(), expires_at);
        assert!(token.is_valid_at(expires_at - Duration::seconds(1)));
        assert!(!token.is_valid_at(expires_at));
    }

    #[test]
    fn test_token_status() {
        let now = Utc.with_ymd_and_hms(2025, 1, 12, 10, 0, 0).unwrap();
        let mut state = AuthState::default();
        assert_eq!(state.token_status(Provider::Fabric, now), TokenStatus::Missing);

        state.set_token(
            Provider::Fabric,
            CachedToken::new("t".into(), now + Duration::minutes(90)),
        );
        let status = state.token_status(Provider::Fabric, now);
        assert!(status.to_string().contains("1h 30m left"));

        state.set_token(
            Provider::Management,
            CachedToken::new("t".into(), now - Duration::minutes(1)),
        );
        assert!(matches!(
            state.token_status(Provider::Management, now),
            TokenStatus::Expired { .. }
        ));
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("abcdefghijklmnop"), "abcdefghij...");
        assert_eq!(mask_token("abc"), "abc...");
    }
}
