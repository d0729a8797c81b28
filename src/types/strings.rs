use aliri_braid::braid;

/// API name of an sObject type, e.g. `Account` or `My_Object__c`.
#[braid(serde)]
pub struct SObjectType;

/// Salesforce record identifier (15 or 18 character form).
#[braid(serde)]
pub struct SObjectId;
