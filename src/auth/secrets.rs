// Secret inputs that never touch the token file

/// Environment variable holding an externally supplied bearer token
pub const ACCESS_TOKEN_ENV: &str = "POWER_BI_ACCESS_TOKEN";

/// Environment variable holding the service principal secret
pub const CLIENT_SECRET_ENV: &str = "FABRIC_CLIENT_SECRET";

/// Source of the bearer-token override and the client secret
pub trait SecretSource: Send + Sync {
    /// Trusted bearer token that takes priority over cached tokens
    fn bearer_token(&self) -> Option<String>;

    /// Client secret used to re-derive the full configuration at refresh time
    fn client_secret(&self) -> Option<String>;

    /// Name shown to the user when the secret is missing
    fn client_secret_hint(&self) -> String {
        CLIENT_SECRET_ENV.to_string()
    }
}

/// Reads secrets from process environment variables
#[derive(Debug, Clone)]
pub struct EnvSecrets {
    token_var: String,
    secret_var: String,
}

impl EnvSecrets {
    pub fn new(token_var: impl Into<String>, secret_var: impl Into<String>) -> Self {
        Self {
            token_var: token_var.into(),
            secret_var: secret_var.into(),
        }
    }
}

impl Default for EnvSecrets {
    fn default() -> Self {
        Self::new(ACCESS_TOKEN_ENV, CLIENT_SECRET_ENV)
    }
}

impl SecretSource for EnvSecrets {
    fn bearer_token(&self) -> Option<String> {
        non_blank(std::env::var(&self.token_var).ok())
    }

    fn client_secret(&self) -> Option<String> {
        non_blank(std::env::var(&self.secret_var).ok())
    }

    fn client_secret_hint(&self) -> String {
        self.secret_var.clone()
    }
}

/// Fixed secrets, used when the caller already holds them
#[derive(Debug, Clone, Default)]
pub struct StaticSecrets {
    pub bearer_token: Option<String>,
    pub client_secret: Option<String>,
}

impl SecretSource for StaticSecrets {
    fn bearer_token(&self) -> Option<String> {
        non_blank(self.bearer_token.clone())
    }

    fn client_secret(&self) -> Option<String> {
        non_blank(self.client_secret.clone())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
