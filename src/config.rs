//! Client configuration.

use std::time::Duration;

use crate::errors::ConfigError;
use crate::types::{InstanceUrl, TokenUrl};

/// Configuration consumed once at client construction.
///
/// Domains are given without a scheme (`https://` is assumed); a domain
/// that already carries an `http://` or `https://` prefix is used as-is,
/// which is how the test suite points the client at a local server.
#[derive(Clone, Debug)]
pub struct Config {
    /// Salesforce instance domain, e.g. `na1.salesforce.com`.
    pub api_domain: String,
    /// Versioned REST base path. Must start and end with `/`.
    pub api_base_uri: String,
    /// OAuth2 domain used for the refresh exchange.
    pub oauth_domain: String,
    /// Token endpoint path under `oauth_domain`.
    pub oauth_token_uri: String,
    /// Connected app consumer key (OAuth2 `client_id`).
    pub consumer_token: String,
    /// Connected app consumer secret (OAuth2 `client_secret`).
    pub consumer_secret: String,
    /// Explicit access token. When either token override is absent, both
    /// are loaded from the token store instead.
    pub access_token: Option<String>,
    /// Explicit refresh token.
    pub refresh_token: Option<String>,
    /// Timeout applied to every HTTP request. A timed-out call is reported
    /// as a transport failure, never retried.
    pub timeout: Duration,
    /// Upper bound on pages fetched by the pagination follower.
    pub max_pages: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_domain: String::new(),
            api_base_uri: "/services/data/v37.0/".to_string(),
            oauth_domain: "login.salesforce.com".to_string(),
            oauth_token_uri: "/services/oauth2/token".to_string(),
            consumer_token: String::new(),
            consumer_secret: String::new(),
            access_token: None,
            refresh_token: None,
            timeout: Duration::from_secs(30),
            max_pages: 100,
        }
    }
}

impl Config {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.api_domain.is_empty() {
            return Err(ConfigError::Missing("api_domain"));
        }
        if self.consumer_token.is_empty() {
            return Err(ConfigError::Missing("consumer_token"));
        }
        if self.consumer_secret.is_empty() {
            return Err(ConfigError::Missing("consumer_secret"));
        }
        Ok(())
    }

    /// `https://{api_domain}` with no trailing slash.
    pub(crate) fn api_origin(&self) -> String {
        origin(&self.api_domain)
    }

    /// `https://{api_domain}{api_base_uri}`, always slash-terminated.
    pub(crate) fn instance_url(&self) -> InstanceUrl {
        let mut url = format!("{}{}", self.api_origin(), self.api_base_uri);
        if !url.ends_with('/') {
            url.push('/');
        }
        InstanceUrl::new(url)
    }

    /// `https://{oauth_domain}{oauth_token_uri}`.
    pub(crate) fn token_url(&self) -> TokenUrl {
        TokenUrl::new(format!("{}{}", origin(&self.oauth_domain), self.oauth_token_uri))
    }
}

fn origin(domain: &str) -> String {
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.trim_end_matches('/').to_string()
    } else {
        format!("https://{domain}")
    }
}
