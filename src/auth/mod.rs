// Authentication module
// Manages token lifecycle, persistence and client-credentials exchange

mod clock;
mod exchange;
mod manager;
mod secrets;
mod store;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use exchange::{AadExchanger, CredentialExchanger};
pub use manager::{AuthManager, DEFAULT_REFRESH_THRESHOLD};
pub use secrets::{EnvSecrets, SecretSource, StaticSecrets, ACCESS_TOKEN_ENV, CLIENT_SECRET_ENV};
pub use store::TokenStore;
pub use types::{
    mask_token, AuthState, CachedToken, ExchangedToken, FullConfig, Provider, StoredConfig,
    TokenStatus, DEFAULT_AUTHORITY,
};
