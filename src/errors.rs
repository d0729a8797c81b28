//! Errors for this crate.
//!
//! Only construction-time errors surface as `Err` values; everything that
//! happens during an API call is folded into [`crate::ApiResult`] so callers
//! always get a value they can branch on.

use crate::token::StoreError;

/// A required configuration value was missing at construction time.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("missing required configuration value: {0}")]
    Missing(&'static str),
}

/// Errors from the token lifecycle.
#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    /// Neither the configuration nor the token store supplied a token pair.
    #[error("no credentials: supply access/refresh tokens or seed the token store")]
    NoCredentials,

    /// The refresh exchange was rejected, malformed, or never reached the
    /// token endpoint. Stored state is left untouched.
    #[error("token refresh failed ({http_status}): {message}")]
    RefreshFailed { http_status: u16, message: String },

    /// The token store failed to load or persist a record.
    #[error("token store error: {0}")]
    Store(StoreError),
}

// Manual impl: a boxed dyn Error is Display but not Error, so thiserror's
// #[from] cannot be used here.
impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        AuthError::Store(e)
    }
}

/// Errors which can occur while building a [`crate::Salesforce`] client.
#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The underlying HTTP client could not be constructed.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
