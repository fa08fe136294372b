#![forbid(unsafe_code)]

//! Validation failures and configuration errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a response was refused.
///
/// Serializes as a snake_case string (`"signature_invalid"`), which is the
/// machine-readable form callers log or return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Required signature elements are missing or the signature uses an
    /// unsupported construction.
    MalformedSignature,
    /// Digest or signature mismatch, or no trusted key verified it.
    SignatureInvalid,
    Expired,
    NotYetValid,
    AudienceMismatch,
    NoValidConfirmation,
    FormatMismatch,
    QualifierMismatch,
    ReplayDetected,
    /// The response is not a well-formed, successful SAML response from the
    /// expected issuer.
    MalformedResponse,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedSignature => "malformed_signature",
            Self::SignatureInvalid => "signature_invalid",
            Self::Expired => "expired",
            Self::NotYetValid => "not_yet_valid",
            Self::AudienceMismatch => "audience_mismatch",
            Self::NoValidConfirmation => "no_valid_confirmation",
            Self::FormatMismatch => "format_mismatch",
            Self::QualifierMismatch => "qualifier_mismatch",
            Self::ReplayDetected => "replay_detected",
            Self::MalformedResponse => "malformed_response",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A refused response: the kind of failure plus a human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{kind}: {detail}")]
pub struct ValidationFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl ValidationFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn malformed_response(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::MalformedResponse, detail)
    }

    pub fn signature_invalid(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::SignatureInvalid, detail)
    }

    /// Map an error raised while processing a signature.
    ///
    /// Document-level problems (unparseable XML, ambiguous IDs, a reference
    /// to anything but the signed element) make the whole response
    /// malformed. Missing or unsupported signature parts make the signature
    /// malformed. Everything else means the signature could not be trusted.
    pub fn from_signature_error(err: samlkoll_core::Error) -> Self {
        use samlkoll_core::Error as E;
        let kind = match &err {
            E::XmlParse(_) | E::XmlStructure(_) | E::DuplicateId(_) => {
                FailureKind::MalformedResponse
            }
            e if e.is_structural() => FailureKind::MalformedSignature,
            _ => FailureKind::SignatureInvalid,
        };
        Self::new(kind, err.to_string())
    }
}

/// Errors raised while building a configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("NameID policy format must not be empty")]
    EmptyFormat,

    #[error("identity provider issuer must not be empty")]
    EmptyIssuer,

    #[error("service provider audience must not be empty")]
    EmptyAudience,

    #[error("assertion consumer service URL must not be empty")]
    EmptyAcsUrl,

    #[error("no trusted signing credentials configured")]
    NoTrustedCredentials,

    #[error("invalid trusted certificate: {0}")]
    InvalidCertificate(String),

    #[error("clock skew must not be negative")]
    NegativeSkew,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::NoValidConfirmation).unwrap();
        assert_eq!(json, "\"no_valid_confirmation\"");
        let back: FailureKind = serde_json::from_str("\"replay_detected\"").unwrap();
        assert_eq!(back, FailureKind::ReplayDetected);
        assert_eq!(FailureKind::NotYetValid.to_string(), "not_yet_valid");
    }

    #[test]
    fn failure_display_carries_kind_and_detail() {
        let f = ValidationFailure::new(FailureKind::Expired, "too late");
        assert_eq!(f.to_string(), "expired: too late");
    }

    #[test]
    fn signature_errors_are_classified() {
        use samlkoll_core::Error as E;
        let kind = |e| ValidationFailure::from_signature_error(e).kind;
        assert_eq!(kind(E::DuplicateId("a".into())), FailureKind::MalformedResponse);
        assert_eq!(kind(E::XmlStructure("x".into())), FailureKind::MalformedResponse);
        assert_eq!(kind(E::MissingElement("SignatureValue".into())), FailureKind::MalformedSignature);
        assert_eq!(kind(E::UnsupportedAlgorithm("x".into())), FailureKind::MalformedSignature);
        assert_eq!(kind(E::KeyNotFound("k".into())), FailureKind::SignatureInvalid);
        assert_eq!(kind(E::DisallowedAlgorithm("sha1".into())), FailureKind::SignatureInvalid);
        assert_eq!(kind(E::Certificate("expired".into())), FailureKind::SignatureInvalid);
    }
}
