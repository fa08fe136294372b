#![forbid(unsafe_code)]

//! The parts of a SAML 2.0 response a relying party acts on.

use chrono::{DateTime, Utc};
use samlkoll_core::ns;
use serde::{Deserialize, Serialize};

/// A `<samlp:Response>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: String,
    pub issue_instant: DateTime<Utc>,
    pub destination: Option<String>,
    pub in_response_to: Option<String>,
    pub issuer: Option<String>,
    pub status: Status,
    pub assertions: Vec<Assertion>,
    /// Number of `<EncryptedAssertion>` children (not decrypted).
    pub encrypted_assertions: usize,
    /// A `<ds:Signature>` is a direct child of the response.
    pub has_signature: bool,
}

/// `<samlp:Status>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub code: String,
    pub second_level_code: Option<String>,
    pub message: Option<String>,
}

impl Status {
    pub fn is_success(&self) -> bool {
        self.code == ns::STATUS_SUCCESS
    }
}

/// A `<saml:Assertion>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Assertion {
    pub id: String,
    pub issue_instant: DateTime<Utc>,
    pub issuer: String,
    pub subject: Option<Subject>,
    pub conditions: Option<Conditions>,
    pub authn_statements: Vec<AuthnStatement>,
    pub attributes: Vec<Attribute>,
    pub has_signature: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub name_id: Option<NameId>,
    pub confirmations: Vec<SubjectConfirmation>,
}

/// A `<saml:NameID>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameId {
    pub value: String,
    /// Absent means `unspecified`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_qualifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sp_name_qualifier: Option<String>,
}

impl NameId {
    /// The format URI, `unspecified` when the attribute is absent.
    pub fn effective_format(&self) -> &str {
        self.format.as_deref().unwrap_or(ns::NAMEID_UNSPECIFIED)
    }
}

/// A `<saml:SubjectConfirmation>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectConfirmation {
    pub method: String,
    pub data: Option<SubjectConfirmationData>,
}

/// A `<saml:SubjectConfirmationData>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectConfirmationData {
    pub recipient: Option<String>,
    pub not_before: Option<DateTime<Utc>>,
    pub not_on_or_after: Option<DateTime<Utc>>,
    pub in_response_to: Option<String>,
    pub address: Option<String>,
}

/// A `<saml:Conditions>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions {
    pub not_before: Option<DateTime<Utc>>,
    pub not_on_or_after: Option<DateTime<Utc>>,
    /// One audience list per `<AudienceRestriction>`.
    pub audience_restrictions: Vec<Vec<String>>,
    pub one_time_use: bool,
}

/// A `<saml:AuthnStatement>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthnStatement {
    pub authn_instant: DateTime<Utc>,
    pub session_index: Option<String>,
    pub session_not_on_or_after: Option<DateTime<Utc>>,
}

/// A `<saml:Attribute>` with its text values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub values: Vec<String>,
}
