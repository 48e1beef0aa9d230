// Token persistence in the user's config directory
//
// Failures never leave this module: load falls back to an empty state and
// save keeps the previous document, both with a warning.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::types::{AuthState, CachedToken, Provider, StoredConfig};

/// Directory under the home directory holding the token document
pub const CONFIG_DIR: &str = ".fabric-cli";

/// Token document file name
pub const TOKEN_FILE: &str = "auth.json";

/// On-disk layout of the token document
#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenDocument {
    #[serde(default)]
    fabric_token: Option<String>,
    #[serde(default)]
    fabric_token_expiry: Option<String>,
    #[serde(default)]
    management_token: Option<String>,
    #[serde(default)]
    management_token_expiry: Option<String>,
    #[serde(default)]
    spn_config: Option<StoredConfig>,
}

impl TokenDocument {
    fn from_state(state: &AuthState) -> Self {
        let split = |token: Option<&CachedToken>| match token {
            Some(t) => (Some(t.access_token.clone()), Some(t.expires_at.to_rfc3339())),
            None => (None, None),
        };
        let (fabric_token, fabric_token_expiry) = split(state.token(Provider::Fabric));
        let (management_token, management_token_expiry) = split(state.token(Provider::Management));

        Self {
            fabric_token,
            fabric_token_expiry,
            management_token,
            management_token_expiry,
            spn_config: state.spn_config.clone(),
        }
    }

    fn into_state(self) -> AuthState {
        AuthState {
            fabric: pair_token(Provider::Fabric, self.fabric_token, self.fabric_token_expiry),
            management: pair_token(
                Provider::Management,
                self.management_token,
                self.management_token_expiry,
            ),
            spn_config: self.spn_config,
        }
    }
}

/// Rebuild a token only when both halves are present and the expiry parses
fn pair_token(
    provider: Provider,
    token: Option<String>,
    expiry: Option<String>,
) -> Option<CachedToken> {
    match (token, expiry) {
        (Some(token), Some(expiry)) => match parse_datetime(&expiry) {
            Ok(expires_at) => Some(CachedToken::new(token, expires_at)),
            Err(e) => {
                tracing::warn!("Discarding stored {} token: {:#}", provider, e);
                None
            }
        },
        (None, None) => None,
        _ => {
            tracing::warn!(
                "Discarding stored {} token: token and expiry must be stored together",
                provider
            );
            None
        }
    }
}

/// JSON-backed token store at a fixed path
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default location: ~/.fabric-cli/auth.json
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(TOKEN_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load state from disk, returning an empty state on any failure
    pub fn load(&self) -> AuthState {
        if !self.path.exists() {
            tracing::warn!(
                "No token file at {}, starting without credentials",
                self.path.display()
            );
            return AuthState::default();
        }

        match self.try_load() {
            Ok(state) => {
                tracing::debug!("Loaded auth state from {}", self.path.display());
                state
            }
            Err(e) => {
                tracing::warn!("Failed to load auth state: {:#}", e);
                AuthState::default()
            }
        }
    }

    /// Persist state, logging and ignoring any failure
    pub fn save(&self, state: &AuthState) {
        match self.try_save(state) {
            Ok(()) => tracing::debug!("Saved auth state to {}", self.path.display()),
            Err(e) => tracing::warn!("Failed to save auth state: {:#}", e),
        }
    }

    fn try_load(&self) -> Result<AuthState> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read token file: {}", self.path.display()))?;

        let document: TokenDocument = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse token file: {}", self.path.display()))?;

        Ok(document.into_state())
    }

    fn try_save(&self, state: &AuthState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create token directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(&TokenDocument::from_state(state))
            .context("Failed to serialize auth state")?;

        // Write beside the target and rename so a failed write keeps the old document
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)
            .with_context(|| format!("Failed to write token file: {}", tmp_path.display()))?;
        if let Err(e) = std::fs::rename(&tmp_path, &self.path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e).with_context(|| {
                format!("Failed to replace token file: {}", self.path.display())
            });
        }

        Ok(())
    }
}

/// Parse datetime from ISO 8601, with or without an offset (naive values are UTC)
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    let normalized = if s.ends_with('Z') {
        s.replace('Z', "+00:00")
    } else {
        s.to_string()
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .with_context(|| format!("Failed to parse datetime: {}", s))
}
