#![allow(dead_code)]

use std::sync::Arc;

use sforce::config::Config;
use sforce::token::{InMemoryTokenStore, TokenRecord, TokenStore};
use sforce::Salesforce;
use wiremock::MockServer;

pub const BASE: &str = "/services/data/v37.0";

/// Point both the API and the OAuth domain at the mock server.
pub fn config_for(server: &MockServer) -> Config {
    Config {
        api_domain: server.uri(),
        oauth_domain: server.uri(),
        consumer_token: "consumer-key".to_string(),
        consumer_secret: "consumer-secret".to_string(),
        ..Config::default()
    }
}

/// Connect a client backed by an in-memory store seeded with the given
/// token pair. The store handle is returned so tests can observe
/// persisted rotations.
pub async fn connect_seeded(
    server: &MockServer,
    access_token: &str,
    refresh_token: &str,
) -> (Salesforce, Arc<InMemoryTokenStore>) {
    connect_with(config_for(server), access_token, refresh_token).await
}

pub async fn connect_with(
    config: Config,
    access_token: &str,
    refresh_token: &str,
) -> (Salesforce, Arc<InMemoryTokenStore>) {
    let store = Arc::new(InMemoryTokenStore::seeded(TokenRecord {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.to_string(),
    }));
    let sf = Salesforce::build(config)
        .token_store(store.clone() as Arc<dyn TokenStore>)
        .connect()
        .await
        .expect("client should connect");
    (sf, store)
}
