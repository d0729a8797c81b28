//! The `Salesforce` facade: named operations over the dispatcher.

use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::errors::BuildError;
use crate::pagination::{encode_q, PaginationFollower, QueryKind};
use crate::response::ApiResult;
use crate::token::{InMemoryTokenStore, TokenManager, TokenStore};
use crate::types::{InstanceUrl, SObjectId, SObjectType};

/// Salesforce REST API client.
///
/// Construct with [`Salesforce::build`]. Every operation resolves to one
/// awaited round trip (paginated follows are a bounded sequential chain)
/// and returns an [`ApiResult`] value; nothing past construction throws.
pub struct Salesforce {
    dispatcher: Dispatcher,
    instance: InstanceUrl,
    max_pages: usize,
}

/// Builder for [`Salesforce`]. Configuration is validated and the token
/// pair resolved when [`SalesforceBuilder::connect`] is awaited.
pub struct SalesforceBuilder {
    config: Config,
    store: Option<Arc<dyn TokenStore>>,
}

impl SalesforceBuilder {
    /// Use `store` for durable token persistence. Without one, tokens
    /// live only in process memory.
    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Validate the configuration and resolve the initial token pair.
    pub async fn connect(self) -> Result<Salesforce, BuildError> {
        let config = self.config;
        config.validate()?;
        debug!(api_domain = %config.api_domain, "connecting Salesforce client");

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryTokenStore::new()));
        let tokens = Arc::new(
            TokenManager::new(
                http.clone(),
                config.token_url(),
                config.consumer_token.clone(),
                config.consumer_secret.clone(),
                store,
                config.access_token.clone(),
                config.refresh_token.clone(),
            )
            .await?,
        );

        let instance = config.instance_url();
        let dispatcher = Dispatcher::new(http, tokens, config.api_origin(), instance.clone());
        Ok(Salesforce {
            dispatcher,
            instance,
            max_pages: config.max_pages,
        })
    }
}

impl Salesforce {
    /// Start building a client from `config`.
    pub fn build(config: Config) -> SalesforceBuilder {
        SalesforceBuilder {
            config,
            store: None,
        }
    }

    /// The versioned REST base URL this client talks to.
    pub fn instance_url(&self) -> &InstanceUrl {
        &self.instance
    }

    /// Fetch a full record by id.
    pub async fn get_object(&self, id: &SObjectId, object_type: &SObjectType) -> ApiResult {
        self.dispatcher
            .dispatch(Method::GET, &format!("sobjects/{object_type}/{id}"), None)
            .await
    }

    /// Create a record. On success the result carries `operation=create`
    /// and the new identifier under both `id` and `Id`.
    pub async fn create_object(&self, object_type: &SObjectType, data: Value) -> ApiResult {
        self.dispatcher
            .dispatch(Method::POST, &format!("sobjects/{object_type}"), Some(&data))
            .await
    }

    /// Update a record. When `id` is `None` the identifier is taken from
    /// the body's `id` field; the `id` field is always stripped from the
    /// body since Salesforce rejects it in a PATCH.
    pub async fn update_object(
        &self,
        id: Option<&SObjectId>,
        object_type: &SObjectType,
        mut data: Value,
    ) -> ApiResult {
        if object_type.as_str().is_empty() {
            return ApiResult::local_failure("update requires an object type");
        }
        let id = match id {
            Some(id) if !id.as_str().is_empty() => id.to_string(),
            _ => match data.get("id").and_then(Value::as_str) {
                Some(id) => id.to_string(),
                None => return ApiResult::local_failure("update requires a record id"),
            },
        };
        if let Some(fields) = data.as_object_mut() {
            fields.remove("id");
        }
        if !matches!(data.as_object(), Some(fields) if !fields.is_empty()) {
            return ApiResult::local_failure("update requires a non-empty object body");
        }
        self.dispatcher
            .dispatch(
                Method::PATCH,
                &format!("sobjects/{object_type}/{id}"),
                Some(&data),
            )
            .await
    }

    /// Delete a record by id.
    pub async fn delete_object(&self, id: &SObjectId, object_type: &SObjectType) -> ApiResult {
        if id.as_str().is_empty() || object_type.as_str().is_empty() {
            return ApiResult::local_failure("delete requires a record id and type");
        }
        self.dispatcher
            .dispatch(Method::DELETE, &format!("sobjects/{object_type}/{id}"), None)
            .await
    }

    /// Fetch a record by a caller-defined external id field.
    pub async fn external_get_object(
        &self,
        external_field: &str,
        external_id: &str,
        object_type: &SObjectType,
    ) -> ApiResult {
        self.dispatcher
            .dispatch(
                Method::GET,
                &format!("sobjects/{object_type}/{external_field}/{external_id}"),
                None,
            )
            .await
    }

    /// Update-or-create a record keyed by an external id field.
    pub async fn external_upsert_object(
        &self,
        external_field: &str,
        external_id: &str,
        object_type: &SObjectType,
        data: Value,
    ) -> ApiResult {
        self.dispatcher
            .dispatch(
                Method::PATCH,
                &format!("sobjects/{object_type}/{external_field}/{external_id}"),
                Some(&data),
            )
            .await
    }

    /// Run a SOQL query; returns the first page only.
    pub async fn query(&self, query: &str) -> ApiResult {
        self.soql_get("query/", query).await
    }

    /// Run a SOQL query and follow every `nextRecordsUrl` cursor.
    pub async fn query_follow_next(&self, query: &str) -> ApiResult {
        self.follower().follow_all(QueryKind::Query, query).await
    }

    /// Like [`Salesforce::query`] but includes soft-deleted and archived
    /// records.
    pub async fn query_all(&self, query: &str) -> ApiResult {
        self.soql_get("queryAll/", query).await
    }

    /// Like [`Salesforce::query_follow_next`] over the `queryAll/` variant.
    pub async fn query_all_follow_next(&self, query: &str) -> ApiResult {
        self.follower().follow_all(QueryKind::QueryAll, query).await
    }

    /// Run a SOSL search.
    pub async fn search(&self, query: &str) -> ApiResult {
        self.soql_get("search/", query).await
    }

    /// GET an Apex REST endpoint under `/services/apexrest/`.
    pub async fn custom_get(&self, uri: &str) -> ApiResult {
        self.raw_get(&format!("/services/apexrest/{}", uri.trim_start_matches('/')))
            .await
    }

    /// POST to an Apex REST endpoint under `/services/apexrest/`.
    pub async fn custom_post(&self, uri: &str, data: Value) -> ApiResult {
        self.raw_post(
            &format!("/services/apexrest/{}", uri.trim_start_matches('/')),
            data,
        )
        .await
    }

    /// GET an arbitrary target: a full URL, an absolute path on the
    /// instance, or a path relative to the versioned base.
    pub async fn raw_get(&self, target: &str) -> ApiResult {
        self.dispatcher.dispatch(Method::GET, target, None).await
    }

    /// POST a JSON body to an arbitrary target.
    pub async fn raw_post(&self, target: &str, data: Value) -> ApiResult {
        self.dispatcher
            .dispatch(Method::POST, target, Some(&data))
            .await
    }

    async fn soql_get(&self, path: &str, query: &str) -> ApiResult {
        let encoded = match encode_q(query) {
            Ok(encoded) => encoded,
            Err(e) => return ApiResult::local_failure(&format!("unencodable query: {e}")),
        };
        self.dispatcher
            .dispatch(Method::GET, &format!("{path}?{encoded}"), None)
            .await
    }

    fn follower(&self) -> PaginationFollower<'_> {
        PaginationFollower::new(&self.dispatcher, self.max_pages)
    }
}
