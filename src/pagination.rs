//! Follows `nextRecordsUrl` cursors until a query's full result set has
//! been assembled.
//!
//! The server hands out independent pages, so the client owns the loop.
//! Cursor values are server-opaque and not validated, so the walk is
//! bounded two ways the naive implementation was not: a visited-cursor set
//! (a misbehaving server that repeats a cursor terminates the walk instead
//! of looping forever) and a configurable maximum page count.

use std::collections::HashSet;

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::dispatch::Dispatcher;
use crate::response::ApiResult;
use crate::types::CursorUrl;

const CURSOR_KEY: &str = "nextRecordsUrl";

/// Which query endpoint variant to hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum QueryKind {
    /// `query/`, returning live records only.
    Query,
    /// `queryAll/`, which includes soft-deleted and archived records.
    QueryAll,
}

impl QueryKind {
    pub(crate) fn path(self) -> &'static str {
        match self {
            Self::Query => "query/",
            Self::QueryAll => "queryAll/",
        }
    }
}

/// The typed view of an accumulated query result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryResult {
    /// Records in server order, concatenated page by page.
    pub records: Vec<Value>,
    /// True when the follower stopped at its page bound or cycle guard
    /// with a cursor still outstanding.
    pub has_more: bool,
}

impl From<&ApiResult> for QueryResult {
    fn from(result: &ApiResult) -> Self {
        let records = match result.body.get("records") {
            Some(Value::Array(records)) => records.clone(),
            _ => Vec::new(),
        };
        Self {
            records,
            has_more: result.body.contains_key(CURSOR_KEY),
        }
    }
}

#[derive(Serialize)]
struct QueryString<'a> {
    q: &'a str,
}

/// URL-encode a SOQL/SOSL string as the `q=` parameter.
pub(crate) fn encode_q(query: &str) -> Result<String, serde_urlencoded::ser::Error> {
    serde_urlencoded::to_string(QueryString { q: query })
}

pub(crate) struct PaginationFollower<'a> {
    dispatcher: &'a Dispatcher,
    max_pages: usize,
}

impl<'a> PaginationFollower<'a> {
    pub(crate) fn new(dispatcher: &'a Dispatcher, max_pages: usize) -> Self {
        Self {
            dispatcher,
            max_pages,
        }
    }

    /// Issue the query and follow every cursor, concatenating records in
    /// page order into the first page's result.
    ///
    /// A page that fails at the HTTP level becomes the whole result:
    /// callers never receive a truncated result set labelled as success.
    /// When the walk stops early the pending cursor is left in the merged
    /// body, so [`QueryResult::has_more`] reports it.
    pub(crate) async fn follow_all(&self, kind: QueryKind, query: &str) -> ApiResult {
        let encoded = match encode_q(query) {
            Ok(encoded) => encoded,
            Err(e) => return ApiResult::local_failure(&format!("unencodable query: {e}")),
        };
        let first_url = format!("{}?{}", kind.path(), encoded);

        let mut merged = self.dispatcher.dispatch(Method::GET, &first_url, None).await;
        if !merged.http_ok() {
            return merged;
        }

        let mut visited: HashSet<CursorUrl> = HashSet::new();
        let mut cursor = take_cursor(&mut merged);
        let mut pages = 1usize;

        while let Some(next) = cursor {
            if !visited.insert(next.clone()) {
                warn!(cursor = %next, "server repeated a page cursor, stopping");
                merged
                    .body
                    .insert(CURSOR_KEY.to_string(), Value::String(next.take()));
                break;
            }
            if pages >= self.max_pages {
                warn!(max_pages = self.max_pages, "page bound reached with a cursor pending");
                merged
                    .body
                    .insert(CURSOR_KEY.to_string(), Value::String(next.take()));
                break;
            }

            // The cursor is fetched verbatim, not by re-issuing the query.
            let mut page = self
                .dispatcher
                .dispatch(Method::GET, next.as_str(), None)
                .await;
            if !page.http_ok() {
                return page;
            }
            pages += 1;

            cursor = take_cursor(&mut page);
            append_records(&mut merged, &mut page);
        }

        debug!(pages, "query pagination complete");
        merged
    }
}

/// Remove and return the page's cursor, but only when the page actually
/// carried records; an empty page ends the walk.
fn take_cursor(page: &mut ApiResult) -> Option<CursorUrl> {
    let has_records = matches!(page.body.get("records"), Some(Value::Array(r)) if !r.is_empty());
    if !has_records {
        page.body.remove(CURSOR_KEY);
        return None;
    }
    match page.body.remove(CURSOR_KEY) {
        Some(Value::String(url)) if !url.is_empty() => Some(CursorUrl::new(url)),
        _ => None,
    }
}

fn append_records(merged: &mut ApiResult, page: &mut ApiResult) {
    let extra = match page.body.remove("records") {
        Some(Value::Array(records)) => records,
        _ => return,
    };
    match merged.body.get_mut("records") {
        Some(Value::Array(records)) => records.extend(extra),
        _ => {
            merged
                .body
                .insert("records".to_string(), Value::Array(extra));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Operation;
    use serde_json::json;

    fn page(body: Value) -> ApiResult {
        ApiResult {
            success: true,
            operation: Operation::None,
            http_status: 200,
            message_string: String::new(),
            body: body.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn cursor_is_taken_only_when_records_are_present() {
        let mut with = page(json!({"records": [1], "nextRecordsUrl": "/p2"}));
        assert_eq!(take_cursor(&mut with).unwrap().as_str(), "/p2");
        assert!(!with.body.contains_key("nextRecordsUrl"));

        let mut empty = page(json!({"records": [], "nextRecordsUrl": "/p2"}));
        assert!(take_cursor(&mut empty).is_none());
    }

    #[test]
    fn records_concatenate_in_page_order() {
        let mut merged = page(json!({"records": [1, 2], "done": false}));
        let mut next = page(json!({"records": [3]}));
        append_records(&mut merged, &mut next);
        assert_eq!(merged.body.get("records"), Some(&json!([1, 2, 3])));
    }

    #[test]
    fn query_result_view_reads_the_merged_body() {
        let complete = page(json!({"records": [1], "totalSize": 1}));
        let view = QueryResult::from(&complete);
        assert_eq!(view.records, vec![json!(1)]);
        assert!(!view.has_more);

        let partial = page(json!({"records": [1], "nextRecordsUrl": "/p2"}));
        assert!(QueryResult::from(&partial).has_more);
    }
}
