use aliri_braid::braid;

/// Base URL for object and query operations, e.g.
/// `https://na1.salesforce.com/services/data/v37.0/`
#[braid(serde)]
pub struct InstanceUrl;

/// OAuth2 token endpoint URL, e.g.
/// `https://login.salesforce.com/services/oauth2/token`
#[braid(serde)]
pub struct TokenUrl;

/// Opaque next-page cursor returned by a query endpoint as
/// `nextRecordsUrl`. Only meaningful as the input to the next page fetch.
#[braid(serde)]
pub struct CursorUrl;
