//! The uniform response shape and the status-code normalization rules.
//!
//! Salesforce answers different operations with different conventions:
//! `200` with a full body, `201` with a lowercase `id`, `204` with no body
//! at all, and errors as either a JSON object or a single-element list.
//! Everything is folded into one [`ApiResult`] value here.

use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::AuthError;

/// Which mutating operation a result came from, if any.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    #[default]
    #[serde(rename = "")]
    None,
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// The normalized outcome of every API call.
///
/// `success` is true iff the call semantically succeeded. `http_status` is
/// the literal status code observed, or 500 when the request never reached
/// the server. `message_string` carries the server's error description on
/// failure. All remaining decoded response fields live in `body`, which
/// serializes flattened so the wire shape stays a single JSON object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub operation: Operation,
    #[serde(default)]
    pub http_status: u16,
    #[serde(default)]
    pub message_string: String,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl ApiResult {
    fn empty(http_status: u16) -> Self {
        Self {
            success: false,
            operation: Operation::None,
            http_status,
            message_string: String::new(),
            body: Map::new(),
        }
    }

    /// The request never produced an HTTP response (connect error,
    /// timeout, TLS failure).
    pub(crate) fn transport_failure(error: impl fmt::Display) -> Self {
        let mut result = Self::empty(500);
        result.message_string = error.to_string();
        result
    }

    /// A 401 whose refresh attempt failed; carries the refresh attempt's
    /// status.
    pub(crate) fn auth_failure(error: &AuthError) -> Self {
        let http_status = match error {
            AuthError::RefreshFailed { http_status, .. } => *http_status,
            _ => 500,
        };
        let mut result = Self::empty(http_status);
        result.message_string = error.to_string();
        result
    }

    /// A failure detected before any request was made.
    pub(crate) fn local_failure(message: &str) -> Self {
        let mut result = Self::empty(500);
        result.message_string = message.to_string();
        result
    }

    /// Whether the exchange itself succeeded at the HTTP level.
    ///
    /// Distinct from `success`: a 200 query page carries no `success`
    /// field, so `success` stays false even though the page is good.
    pub fn http_ok(&self) -> bool {
        (200..300).contains(&self.http_status)
    }
}

/// Apply the status-code interpretation rules to one exchange.
pub(crate) fn normalize(method: &Method, http_status: u16, text: &str) -> ApiResult {
    match http_status {
        200 => {
            // Plain fetch: the decoded body decides `success` (a bare
            // record object does not declare one, so it stays false only
            // if the server said nothing either way).
            let mut result = ApiResult::empty(http_status);
            merge_decoded_object(&mut result, text);
            result
        }
        201 => {
            let mut result = ApiResult::empty(http_status);
            merge_decoded_object(&mut result, text);
            result.operation = Operation::Create;
            // A create answers with a lowercase `id`; mirror it so created
            // and fetched records expose the identifier under the same key.
            if let Some(id) = result.body.get("id").cloned() {
                result.body.insert("Id".to_string(), id);
            }
            result
        }
        204 => {
            let mut result = ApiResult::empty(http_status);
            result.success = true;
            result.operation = if method == Method::DELETE {
                Operation::Delete
            } else {
                Operation::Update
            };
            result
        }
        _ => normalize_error(http_status, text),
    }
}

/// Non-2xx normalization. Two documented server shapes are handled as
/// explicit branches: a JSON object (merged directly) and a single-element
/// list holding one error object (unwrapped, then merged). Anything else
/// falls back to the raw body text.
fn normalize_error(http_status: u16, text: &str) -> ApiResult {
    let mut result = ApiResult::empty(http_status);
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(fields)) => merge_fields(&mut result, fields),
        Ok(Value::Array(items)) if items.len() == 1 => {
            if let Some(Value::Object(fields)) = items.into_iter().next() {
                merge_fields(&mut result, fields);
            }
        }
        _ => {}
    }
    if result.message_string.is_empty() {
        result.message_string = result
            .body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| text.to_string());
    }
    result.success = false;
    result.http_status = http_status;
    result
}

/// Decode `text` as a JSON object and merge its fields. A body that fails
/// to decode is treated conservatively: nothing is merged and the raw text
/// becomes the message.
fn merge_decoded_object(result: &mut ApiResult, text: &str) {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(fields)) => merge_fields(result, fields),
        _ if text.is_empty() => {}
        _ => result.message_string = text.to_string(),
    }
}

/// Merge decoded fields into the result. Fields named like the envelope
/// (`success`, `operation`, `message_string`) take priority over the
/// defaults and land in the envelope itself; everything else goes into
/// `body`. The literal observed `http_status` always wins over a body
/// field of the same name.
fn merge_fields(result: &mut ApiResult, fields: Map<String, Value>) {
    for (key, value) in fields {
        match key.as_str() {
            "success" => match value {
                Value::Bool(b) => result.success = b,
                other => {
                    result.body.insert(key, other);
                }
            },
            "operation" => match serde_json::from_value::<Operation>(value.clone()) {
                Ok(op) => result.operation = op,
                Err(_) => {
                    result.body.insert(key, value);
                }
            },
            "message_string" => match value {
                Value::String(s) => result.message_string = s,
                other => {
                    result.body.insert(key, other);
                }
            },
            "http_status" => {}
            _ => {
                result.body.insert(key, value);
            }
        }
    }
}
