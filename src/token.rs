//! Token lifecycle: durable storage trait, in-memory state, and the
//! single-flight refresh exchange.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::errors::AuthError;
use crate::types::TokenUrl;

/// Error type produced by [`TokenStore`] implementations.
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The OAuth2 token pair. The refresh token is long-lived; the access
/// token is short-lived and replaced on every successful refresh.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
}

/// Durable storage for the token pair.
///
/// The manager reads the record once at construction (unless explicit
/// tokens were configured) and writes the access token back whenever a
/// refresh changes it.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Load the stored token pair, or `None` if nothing has been stored yet.
    async fn get_token_record(&self) -> Result<Option<TokenRecord>, StoreError>;

    /// Persist a rotated access token.
    async fn set_access_token(&self, access_token: &str) -> Result<(), StoreError>;
}

/// A [`TokenStore`] holding the record in process memory. Useful on its
/// own for short-lived processes and as the backing store in tests.
#[derive(Default)]
pub struct InMemoryTokenStore {
    record: std::sync::RwLock<Option<TokenRecord>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `record`.
    pub fn seeded(record: TokenRecord) -> Self {
        Self {
            record: std::sync::RwLock::new(Some(record)),
        }
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get_token_record(&self) -> Result<Option<TokenRecord>, StoreError> {
        let guard = self.record.read().map_err(|e| e.to_string())?;
        Ok(guard.clone())
    }

    async fn set_access_token(&self, access_token: &str) -> Result<(), StoreError> {
        let mut guard = self.record.write().map_err(|e| e.to_string())?;
        match guard.as_mut() {
            Some(record) => record.access_token = access_token.to_string(),
            None => {
                *guard = Some(TokenRecord {
                    access_token: access_token.to_string(),
                    refresh_token: String::new(),
                })
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
    grant_type: &'static str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Owns the live token pair and knows how to exchange the refresh token
/// for a new access token.
///
/// Refreshes are serialized: concurrent callers that observe the same
/// stale token share one exchange instead of racing, since many OAuth2
/// servers invalidate a refresh token after first use.
pub struct TokenManager {
    http: reqwest::Client,
    token_url: TokenUrl,
    client_id: String,
    client_secret: String,
    store: Arc<dyn TokenStore>,
    state: RwLock<TokenRecord>,
    refresh_gate: Mutex<()>,
}

impl TokenManager {
    /// Resolve the initial token pair and build the manager.
    ///
    /// Explicit overrides win; otherwise the store is read exactly once.
    /// An empty store is [`AuthError::NoCredentials`], which is fatal at
    /// construction rather than on the first call.
    pub(crate) async fn new(
        http: reqwest::Client,
        token_url: TokenUrl,
        client_id: String,
        client_secret: String,
        store: Arc<dyn TokenStore>,
        access_token: Option<String>,
        refresh_token: Option<String>,
    ) -> Result<Self, AuthError> {
        let record = match (access_token, refresh_token) {
            (Some(access_token), Some(refresh_token)) => TokenRecord {
                access_token,
                refresh_token,
            },
            _ => {
                debug!("no token overrides configured, loading from the token store");
                store
                    .get_token_record()
                    .await?
                    .ok_or(AuthError::NoCredentials)?
            }
        };
        Ok(Self {
            http,
            token_url,
            client_id,
            client_secret,
            store,
            state: RwLock::new(record),
            refresh_gate: Mutex::new(()),
        })
    }

    /// The in-memory access token. Never touches the network.
    pub async fn current_access_token(&self) -> String {
        self.state.read().await.access_token.clone()
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// `stale` is the access token the caller saw rejected. If the live
    /// token already differs, another caller's refresh won the race and
    /// its result is returned without a second exchange.
    ///
    /// A successful refresh persists the new access token through the
    /// store before updating memory, so the operation either fully applies
    /// or leaves both copies untouched.
    pub async fn refresh(&self, stale: &str) -> Result<String, AuthError> {
        let _gate = self.refresh_gate.lock().await;

        let refresh_token = {
            let state = self.state.read().await;
            if state.access_token != stale {
                debug!("access token already rotated by a concurrent refresh");
                return Ok(state.access_token.clone());
            }
            state.refresh_token.clone()
        };

        let response = self
            .http
            .post(self.token_url.as_str())
            .form(&RefreshRequest {
                client_id: &self.client_id,
                client_secret: &self.client_secret,
                refresh_token: &refresh_token,
                grant_type: "refresh_token",
            })
            .send()
            .await
            .map_err(|e| AuthError::RefreshFailed {
                http_status: 500,
                message: e.to_string(),
            })?;

        let http_status = response.status().as_u16();
        let text = response.text().await.map_err(|e| AuthError::RefreshFailed {
            http_status,
            message: e.to_string(),
        })?;

        if !(200..300).contains(&http_status) {
            return Err(AuthError::RefreshFailed {
                http_status,
                message: text,
            });
        }

        let parsed: RefreshResponse =
            serde_json::from_str(&text).map_err(|_| AuthError::RefreshFailed {
                http_status,
                message: format!("malformed token response: {text}"),
            })?;

        // Durable copy first: a failed store write must not leave memory
        // ahead of storage.
        self.store.set_access_token(&parsed.access_token).await?;

        let mut state = self.state.write().await;
        state.access_token = parsed.access_token.clone();
        if let Some(refresh_token) = parsed.refresh_token {
            state.refresh_token = refresh_token;
        }
        info!("access token refreshed");
        Ok(parsed.access_token)
    }
}
