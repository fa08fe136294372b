#![forbid(unsafe_code)]

//! `<ds:KeyInfo>` processing.
//!
//! KeyInfo content comes from the signer and is never trusted on its own.
//! It is read into hints, and the hints select among the keys the
//! relying party already trusts.

use crate::manager::KeysManager;
use crate::x509::{self, CertValidationConfig};
use base64::Engine;
use der::{Decode, Encode};
use samlkoll_core::{ns, Error};
use samlkoll_crypto::SigningKey;
use samlkoll_xml::document::{child_elements, element_text, find_child_element};
use x509_cert::Certificate;

/// What a `<KeyInfo>` element says about the signing key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyInfoHints {
    pub key_names: Vec<String>,
    /// DER of every `<X509Certificate>`, in document order.
    pub certificates: Vec<Vec<u8>>,
    /// An inline `<KeyValue>` was present (and ignored).
    pub has_key_value: bool,
}

impl KeyInfoHints {
    pub fn is_empty(&self) -> bool {
        self.key_names.is_empty() && self.certificates.is_empty() && !self.has_key_value
    }
}

/// A key that may have produced a signature.
#[derive(Debug, Clone)]
pub struct CandidateKey {
    pub name: Option<String>,
    pub key: SigningKey,
}

/// Read the hints out of a `<ds:KeyInfo>` element.
pub fn read_key_info(key_info: roxmltree::Node<'_, '_>) -> Result<KeyInfoHints, Error> {
    let mut hints = KeyInfoHints::default();
    for child in key_info.children().filter(|c| c.is_element()) {
        if child.tag_name().namespace() != Some(ns::DSIG) {
            continue;
        }
        match child.tag_name().name() {
            ns::node::KEY_NAME => {
                let name = element_text(child);
                if !name.is_empty() {
                    hints.key_names.push(name);
                }
            }
            ns::node::KEY_VALUE => hints.has_key_value = true,
            ns::node::X509_DATA => {
                for cert in child_elements(child, ns::DSIG, ns::node::X509_CERTIFICATE) {
                    hints.certificates.push(decode_base64(&element_text(cert))?);
                }
            }
            _ => {}
        }
    }
    Ok(hints)
}

/// Read hints from the `<KeyInfo>` child of a `<Signature>`, if any.
pub fn read_signature_key_info(signature: roxmltree::Node<'_, '_>) -> Result<KeyInfoHints, Error> {
    match find_child_element(signature, ns::DSIG, ns::node::KEY_INFO) {
        Some(ki) => read_key_info(ki),
        None => Ok(KeyInfoHints::default()),
    }
}

/// Turn KeyInfo hints into the trusted keys worth trying, best first.
///
/// 1. An embedded certificate that is trusted as-is, or chains to a trusted
///    CA, yields exactly its own key.
/// 2. Otherwise `<KeyName>` values are looked up in the manager.
/// 3. Otherwise every verifying key of the manager is a candidate.
pub fn resolve_candidates(
    hints: &KeyInfoHints,
    manager: &KeysManager,
    verification_time: Option<der::DateTime>,
) -> Result<Vec<CandidateKey>, Error> {
    if let Some(candidate) = trusted_embedded_certificate(hints, manager, verification_time)? {
        return Ok(vec![candidate]);
    }

    let named: Vec<CandidateKey> = hints
        .key_names
        .iter()
        .filter_map(|n| manager.find_by_name(n))
        .filter(|k| k.can_verify())
        .map(|k| CandidateKey {
            name: k.name.clone(),
            key: k.to_verifying_key(),
        })
        .collect();
    if !named.is_empty() {
        return Ok(named);
    }

    let all: Vec<CandidateKey> = manager
        .verifying_keys()
        .map(|k| CandidateKey {
            name: k.name.clone(),
            key: k.to_verifying_key(),
        })
        .collect();
    if all.is_empty() {
        return Err(Error::KeyNotFound("no trusted verification key".into()));
    }
    Ok(all)
}

fn trusted_embedded_certificate(
    hints: &KeyInfoHints,
    manager: &KeysManager,
    verification_time: Option<der::DateTime>,
) -> Result<Option<CandidateKey>, Error> {
    if hints.certificates.is_empty() {
        return Ok(None);
    }
    let parsed: Vec<ParsedCert> = hints
        .certificates
        .iter()
        .filter_map(|der| {
            Certificate::from_der(der).ok().map(|cert| ParsedCert {
                cert,
                der: der.as_slice(),
            })
        })
        .collect();
    if parsed.is_empty() {
        return Ok(None);
    }
    let leaf = &parsed[find_leaf_cert(&parsed)];

    if let Some(key) = manager.find_by_certificate(leaf.der) {
        if manager.is_trusted_cert(leaf.der) && key.can_verify() {
            return Ok(Some(CandidateKey {
                name: key.name.clone(),
                key: key.to_verifying_key(),
            }));
        }
    }

    let others: Vec<Vec<u8>> = parsed
        .iter()
        .filter(|p| p.der != leaf.der)
        .map(|p| p.der.to_vec())
        .collect();
    let config = CertValidationConfig {
        trusted_certs: manager.trusted_certs(),
        untrusted_certs: manager.untrusted_certs(),
        verification_time,
        skip_time_checks: false,
    };
    if x509::validate_cert_chain(leaf.der, &others, &config).is_err() {
        return Ok(None);
    }
    let key = crate::loader::load_x509_cert_der(leaf.der)?;
    Ok(Some(CandidateKey {
        name: key.name.clone(),
        key: key.to_verifying_key(),
    }))
}

struct ParsedCert<'a> {
    cert: Certificate,
    der: &'a [u8],
}

impl ParsedCert<'_> {
    fn subject_der(&self) -> Vec<u8> {
        self.cert.tbs_certificate.subject.to_der().unwrap_or_default()
    }

    fn issuer_der(&self) -> Vec<u8> {
        self.cert.tbs_certificate.issuer.to_der().unwrap_or_default()
    }
}

/// Pick the end-entity certificate out of an unordered `<X509Data>`.
///
/// Prefers a non-CA cert that issued nothing else in the set, then any cert
/// that issued nothing else, then the first one.
fn find_leaf_cert(certs: &[ParsedCert<'_>]) -> usize {
    if certs.len() <= 1 {
        return 0;
    }
    let issuers: Vec<Vec<u8>> = certs.iter().map(ParsedCert::issuer_der).collect();
    let issued_other: Vec<bool> = certs
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let subject = c.subject_der();
            issuers
                .iter()
                .enumerate()
                .any(|(j, iss)| i != j && *iss == subject)
        })
        .collect();

    (0..certs.len())
        .find(|&i| !issued_other[i] && !x509::is_ca(&certs[i].cert))
        .or_else(|| (0..certs.len()).find(|&i| !issued_other[i]))
        .unwrap_or(0)
}

fn decode_base64(text: &str) -> Result<Vec<u8>, Error> {
    let clean: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(clean)
        .map_err(|e| Error::Base64(format!("X509Certificate: {e}")))
}
