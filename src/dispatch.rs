//! Executes one logical API call: bearer attach, send, normalize, and the
//! single refresh-and-retry on an authentication failure.

use std::sync::Arc;

use reqwest::header::ACCEPT;
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::response::{normalize, ApiResult};
use crate::token::TokenManager;
use crate::types::InstanceUrl;

pub(crate) struct Dispatcher {
    http: reqwest::Client,
    tokens: Arc<TokenManager>,
    /// `https://{api_domain}` with no trailing slash, for absolute-path
    /// requests such as page cursors and Apex REST.
    origin: String,
    instance: InstanceUrl,
}

impl Dispatcher {
    pub(crate) fn new(
        http: reqwest::Client,
        tokens: Arc<TokenManager>,
        origin: String,
        instance: InstanceUrl,
    ) -> Self {
        Self {
            http,
            tokens,
            origin,
            instance,
        }
    }

    /// Resolve a request target the way the original client's base-URL
    /// handling did: full URLs pass through, absolute paths hang off the
    /// instance origin, everything else is relative to the versioned base.
    pub(crate) fn resolve(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else if target.starts_with('/') {
            format!("{}{}", self.origin, target)
        } else {
            format!("{}{}", self.instance, target)
        }
    }

    /// Execute one logical call and normalize whatever comes back.
    ///
    /// All failures are folded into the returned [`ApiResult`]; this never
    /// returns an error. At most one retry happens per call, and only for
    /// a 401 answered by a successful token refresh.
    pub(crate) async fn dispatch(
        &self,
        method: Method,
        target: &str,
        body: Option<&Value>,
    ) -> ApiResult {
        let url = self.resolve(target);
        let token = self.tokens.current_access_token().await;
        debug!(%method, %url, "dispatching API call");

        let response = match self.send(method.clone(), &url, body, &token).await {
            Ok(response) => response,
            Err(e) => {
                warn!(%url, error = %e, "transport failure");
                return ApiResult::transport_failure(e);
            }
        };

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!(%url, "access token rejected, refreshing");
            let fresh = match self.tokens.refresh(&token).await {
                Ok(fresh) => fresh,
                Err(e) => {
                    warn!(error = %e, "token refresh failed");
                    return ApiResult::auth_failure(&e);
                }
            };
            return match self.send(method.clone(), &url, body, &fresh).await {
                Ok(retried) => Self::finish(&method, retried).await,
                Err(e) => ApiResult::transport_failure(e),
            };
        }

        Self::finish(&method, response).await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        token: &str,
    ) -> Result<Response, reqwest::Error> {
        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await
    }

    async fn finish(method: &Method, response: Response) -> ApiResult {
        let http_status = response.status().as_u16();
        match response.text().await {
            Ok(text) => normalize(method, http_status, &text),
            Err(e) => ApiResult::transport_failure(e),
        }
    }
}
