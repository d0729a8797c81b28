//! Client library for the Salesforce REST API.
//!
//! Every call returns a uniform [`ApiResult`] regardless of which HTTP
//! status Salesforce answered with; callers branch on `success` and
//! `http_status` instead of catching errors. Expired access tokens are
//! refreshed transparently (one refresh shared across concurrent callers)
//! and paginated query results can be followed to completion with a
//! bounded, cycle-safe cursor walk.
//!
//! ```no_run
//! use sforce::config::Config;
//! use sforce::Salesforce;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     api_domain: "na1.salesforce.com".to_string(),
//!     consumer_token: "client id".to_string(),
//!     consumer_secret: "client secret".to_string(),
//!     access_token: Some("00D...".to_string()),
//!     refresh_token: Some("5Ae...".to_string()),
//!     ..Config::default()
//! };
//! let sf = Salesforce::build(config).connect().await?;
//! let result = sf.query_follow_next("SELECT Id, Name FROM Account").await;
//! assert!(result.http_ok());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod token;
pub mod types;

mod client;
mod dispatch;
mod pagination;
mod response;

pub use client::{Salesforce, SalesforceBuilder};
pub use pagination::QueryResult;
pub use response::{ApiResult, Operation};
