#![forbid(unsafe_code)]

//! The outcome of a successful validation.

use crate::model::NameId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The subject a validated response vouches for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedPrincipal {
    pub name_id: NameId,
    /// Attribute values by attribute `Name`, merged across assertions.
    pub attributes: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_index: Option<String>,
    pub issuer: String,
    pub assertion_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authn_instant: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_not_on_or_after: Option<DateTime<Utc>>,
}

impl AuthenticatedPrincipal {
    pub fn attribute(&self, name: &str) -> Option<&[String]> {
        self.attributes.get(name).map(Vec::as_slice)
    }

    pub fn first_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name)?.first().map(String::as_str)
    }
}
