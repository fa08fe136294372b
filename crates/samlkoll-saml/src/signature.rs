#![forbid(unsafe_code)]

//! Signatures on a SAML response.
//!
//! The `<ds:Signature>` that is a direct child of the Response and of each
//! Assertion is verified against the trust configuration. Signatures
//! anywhere else are not looked at.

use crate::config::TrustConfiguration;
use crate::error::ValidationFailure;
use chrono::{DateTime, Utc};
use samlkoll_core::ns;
use samlkoll_dsig::{verify_signature, DsigContext, VerifyResult};
use samlkoll_xml::document::{build_id_map_with, child_elements, is_element};

/// Which parts of a response carry a verified signature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureReport {
    pub response_signed: bool,
    /// IDs of assertions carrying their own verified signature.
    pub signed_assertions: Vec<String>,
    /// Names of the trusted keys that verified, in document order.
    pub key_names: Vec<String>,
}

/// Verify the signatures of a response using the system clock for
/// certificate validity.
pub fn verify(
    document_bytes: &[u8],
    trust: &TrustConfiguration,
) -> Result<SignatureReport, ValidationFailure> {
    verify_at(document_bytes, trust, Utc::now())
}

/// Verify the signatures of a response, judging certificates at `now`.
pub fn verify_at(
    document_bytes: &[u8],
    trust: &TrustConfiguration,
    now: DateTime<Utc>,
) -> Result<SignatureReport, ValidationFailure> {
    let doc = crate::parse::parse_document(document_bytes)?;
    verify_document(&doc, trust, now)
}

pub(crate) fn dsig_context(
    trust: &TrustConfiguration,
    now: DateTime<Utc>,
) -> Result<DsigContext, ValidationFailure> {
    let at = samlkoll_keys::x509::datetime_from_unix(now.timestamp())
        .map_err(ValidationFailure::from_signature_error)?;
    Ok(DsigContext::new(trust.keys_manager().clone())
        .with_allow_sha1(trust.allow_sha1())
        .with_verification_time(at))
}

/// Verify the signatures of an already parsed response.
///
/// Policy: every signature present must verify; the response or else every
/// assertion must be signed; with `require_signed_assertions` every
/// assertion must be signed whatever the response carries.
pub fn verify_document(
    doc: &roxmltree::Document<'_>,
    trust: &TrustConfiguration,
    now: DateTime<Utc>,
) -> Result<SignatureReport, ValidationFailure> {
    let root = doc.root_element();
    if !is_element(&root, ns::SAMLP, ns::saml::RESPONSE) {
        return Err(ValidationFailure::malformed_response(
            "document element is not a samlp:Response",
        ));
    }
    build_id_map_with(doc, &[ns::attr::ID, "Id"])
        .map_err(ValidationFailure::from_signature_error)?;

    let ctx = dsig_context(trust, now)?;
    let mut report = SignatureReport::default();

    if let Some(key_name) = verify_child_signature(&ctx, doc, root)? {
        report.response_signed = true;
        report.key_names.extend(key_name);
    }

    let mut unsigned = Vec::new();
    for assertion in child_elements(root, ns::SAML, ns::saml::ASSERTION) {
        let id = assertion.attribute(ns::attr::ID).unwrap_or_default().to_owned();
        match verify_child_signature(&ctx, doc, assertion)? {
            Some(key_name) => {
                report.signed_assertions.push(id);
                report.key_names.extend(key_name);
            }
            None => unsigned.push(id),
        }
    }

    if trust.require_signed_assertions() && !unsigned.is_empty() {
        return Err(ValidationFailure::signature_invalid(format!(
            "assertion(s) not signed: {}",
            unsigned.join(", ")
        )));
    }
    if !report.response_signed && (!unsigned.is_empty() || report.signed_assertions.is_empty()) {
        return Err(ValidationFailure::signature_invalid(if unsigned.is_empty() {
            "response is not signed".to_owned()
        } else {
            format!("neither the response nor assertion(s) {} are signed", unsigned.join(", "))
        }));
    }
    Ok(report)
}

/// Verify the signature directly under `element`, if there is one.
///
/// `Ok(None)` when unsigned, `Ok(Some(key_name))` when verified.
fn verify_child_signature<'a, 'input>(
    ctx: &DsigContext,
    doc: &'a roxmltree::Document<'input>,
    element: roxmltree::Node<'a, 'input>,
) -> Result<Option<Option<String>>, ValidationFailure> {
    let mut signatures = child_elements(element, ns::DSIG, ns::node::SIGNATURE);
    let Some(sig) = signatures.next() else {
        return Ok(None);
    };
    if signatures.next().is_some() {
        return Err(ValidationFailure::new(
            crate::FailureKind::MalformedSignature,
            format!("{} carries more than one Signature", element.tag_name().name()),
        ));
    }
    match verify_signature(ctx, doc, sig).map_err(ValidationFailure::from_signature_error)? {
        VerifyResult::Valid { key_name, .. } => Ok(Some(key_name)),
        VerifyResult::Invalid { reason } => Err(ValidationFailure::signature_invalid(format!(
            "{} signature: {reason}",
            element.tag_name().name()
        ))),
    }
}
