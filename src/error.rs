// Error handling module
// Defines authentication and API error types

use thiserror::Error;

use crate::auth::Provider;

/// Errors raised while obtaining a bearer token
#[derive(Error, Debug)]
pub enum AuthError {
    /// Identity provider rejected the client-credentials request
    #[error("Failed to get token for {scope}: {description}")]
    CredentialExchange { scope: String, description: String },

    /// No cached token, environment token or stored configuration
    #[error("No credentials available for {provider}. Run 'fabric login token' or 'fabric login spn' first")]
    NoCredentialSource { provider: Provider },

    /// Stored configuration exists but the secret is not available
    #[error("Client secret is required to refresh the token: set {variable}")]
    MissingClientSecret { variable: String },

    /// Token cannot be used as an HTTP header value
    #[error("Invalid authorization header: {0}")]
    InvalidHeader(String),
}

/// Errors that can occur while calling the Fabric or management APIs
#[derive(Error, Debug)]
pub enum ApiError {
    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Error response from the remote API
    #[error("API error: {status} - {message}")]
    Upstream { status: u16, message: String },

    /// Request could not be sent or the response could not be read
    #[error("Request failed: {0}")]
    Request(String),

    /// Response was missing data we need
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Named resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Local file error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Request(e.to_string())
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
