#![forbid(unsafe_code)]

//! XML-DSig signature verification.
//!
//! Processing order:
//! 1. Read `<SignedInfo>`: CanonicalizationMethod, SignatureMethod
//! 2. Check the single `<Reference>` points at the signature's parent
//! 3. Run the transforms, compute the digest, compare
//! 4. Resolve candidate keys from `<KeyInfo>` and the keys manager
//! 5. Canonicalize `<SignedInfo>`
//! 6. Verify `<SignatureValue>`

use crate::context::DsigContext;
use base64::Engine;
use samlkoll_c14n::C14nMode;
use samlkoll_core::{algorithm, ns, Error};
use samlkoll_crypto::digest;
use samlkoll_keys::keyinfo;
use samlkoll_transforms::{c14n::inclusive_prefixes, TransformData, TransformPipeline};
use samlkoll_xml::document::{build_id_map_with, child_elements, element_text, find_child_element};
use samlkoll_xml::{reference, NodeSet};
use std::collections::HashMap;

/// Result of signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    /// Signature is valid.
    Valid {
        /// Name of the trusted key that verified the signature.
        key_name: Option<String>,
        /// ID of the element the signature covers.
        signed_id: String,
    },
    /// Signature is invalid.
    Invalid { reason: String },
}

impl VerifyResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyResult::Valid { .. })
    }
}

/// The parts of `<SignedInfo>` both verification and signing need.
pub(crate) struct SignedInfo<'a, 'input> {
    pub node: roxmltree::Node<'a, 'input>,
    pub c14n_mode: C14nMode,
    pub inclusive_prefixes: Vec<String>,
    pub signature_method: &'a str,
    pub references: Vec<roxmltree::Node<'a, 'input>>,
}

impl SignedInfo<'_, '_> {
    /// Canonical form of `<SignedInfo>`, the octets the signature covers.
    pub fn canonicalize(&self, doc: &roxmltree::Document<'_>) -> Result<Vec<u8>, Error> {
        samlkoll_c14n::canonicalize_doc(
            doc,
            self.c14n_mode,
            Some(&NodeSet::tree_without_comments(self.node)),
            &self.inclusive_prefixes,
        )
    }
}

pub(crate) fn read_signed_info<'a, 'input>(
    sig_node: roxmltree::Node<'a, 'input>,
) -> Result<SignedInfo<'a, 'input>, Error> {
    let node = find_child_element(sig_node, ns::DSIG, ns::node::SIGNED_INFO)
        .ok_or_else(|| Error::MissingElement("SignedInfo".into()))?;

    let c14n_method = find_child_element(node, ns::DSIG, ns::node::CANONICALIZATION_METHOD)
        .ok_or_else(|| Error::MissingElement("CanonicalizationMethod".into()))?;
    let c14n_uri = c14n_method
        .attribute(ns::attr::ALGORITHM)
        .ok_or_else(|| Error::MissingAttribute("Algorithm on CanonicalizationMethod".into()))?;
    let c14n_mode = C14nMode::from_uri(c14n_uri)
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("C14N: {c14n_uri}")))?;

    let signature_method = find_child_element(node, ns::DSIG, ns::node::SIGNATURE_METHOD)
        .ok_or_else(|| Error::MissingElement("SignatureMethod".into()))?
        .attribute(ns::attr::ALGORITHM)
        .ok_or_else(|| Error::MissingAttribute("Algorithm on SignatureMethod".into()))?;

    Ok(SignedInfo {
        node,
        c14n_mode,
        inclusive_prefixes: inclusive_prefixes(c14n_method),
        signature_method,
        references: child_elements(node, ns::DSIG, ns::node::REFERENCE).collect(),
    })
}

/// Digest of what a `<Reference>` points at, after its transforms.
pub(crate) struct ReferenceDigest<'a, 'input> {
    pub id: String,
    pub target: roxmltree::Node<'a, 'input>,
    pub digest_uri: &'a str,
    pub computed: Vec<u8>,
}

pub(crate) fn compute_reference_digest<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
    id_map: &HashMap<String, roxmltree::NodeId>,
    reference_node: roxmltree::Node<'a, 'input>,
    sig_node: roxmltree::Node<'a, 'input>,
) -> Result<ReferenceDigest<'a, 'input>, Error> {
    let uri = reference_node
        .attribute(ns::attr::URI)
        .ok_or_else(|| Error::MissingAttribute("URI on Reference".into()))?;
    let id = reference::parse_same_document_ref(uri)
        .ok_or_else(|| Error::InvalidUri(format!("not a same-document ID reference: {uri:?}")))?;
    let target = reference::resolve_id(doc, id_map, id)?;

    let digest_uri = find_child_element(reference_node, ns::DSIG, ns::node::DIGEST_METHOD)
        .ok_or_else(|| Error::MissingElement("DigestMethod".into()))?
        .attribute(ns::attr::ALGORITHM)
        .ok_or_else(|| Error::MissingAttribute("Algorithm on DigestMethod".into()))?;

    let pipeline = match find_child_element(reference_node, ns::DSIG, ns::node::TRANSFORMS) {
        Some(transforms) => TransformPipeline::from_transforms_node(transforms, sig_node)?,
        None => TransformPipeline::new(),
    };
    let data = pipeline.execute(
        doc,
        TransformData::Xml {
            node_set: NodeSet::tree_without_comments(target),
        },
    )?;
    let bytes = data.to_binary(doc)?;
    let computed = digest::digest(digest_uri, &bytes)?;

    Ok(ReferenceDigest {
        id: id.to_owned(),
        target,
        digest_uri,
        computed,
    })
}

pub(crate) fn decode_base64(node: roxmltree::Node<'_, '_>, what: &str) -> Result<Vec<u8>, Error> {
    let clean: String = element_text(node)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    base64::engine::general_purpose::STANDARD
        .decode(clean)
        .map_err(|e| Error::Base64(format!("{what}: {e}")))
}

fn check_algorithm_allowed(ctx: &DsigContext, uri: &str) -> Result<(), Error> {
    if !ctx.allow_sha1 && algorithm::is_sha1(uri) {
        return Err(Error::DisallowedAlgorithm(uri.to_owned()));
    }
    Ok(())
}

/// Verify one enveloped `<Signature>` element of a parsed document.
///
/// The signature must carry exactly one `<Reference>`, and its URI must be
/// `#ID` of the element that directly contains the `<Signature>`. Structural
/// problems (including ID values used twice) are returned as `Err`; a
/// well-formed signature that does not verify is `Ok(Invalid)`.
pub fn verify_signature<'a, 'input>(
    ctx: &DsigContext,
    doc: &'a roxmltree::Document<'input>,
    sig_node: roxmltree::Node<'a, 'input>,
) -> Result<VerifyResult, Error> {
    let id_map = build_id_map_with(doc, &ctx.id_attr_names())?;

    let parent = sig_node
        .parent_element()
        .ok_or_else(|| Error::XmlStructure("Signature has no parent element".into()))?;

    let signed_info = read_signed_info(sig_node)?;
    check_algorithm_allowed(ctx, signed_info.signature_method)?;

    let reference_node = match signed_info.references.as_slice() {
        [only] => *only,
        refs => {
            return Err(Error::XmlStructure(format!(
                "expected exactly one Reference, found {}",
                refs.len()
            )))
        }
    };

    let reference = compute_reference_digest(doc, &id_map, reference_node, sig_node)?;
    if reference.target.id() != parent.id() {
        return Err(Error::XmlStructure(format!(
            "Reference #{} does not point at the signed element",
            reference.id
        )));
    }
    check_algorithm_allowed(ctx, reference.digest_uri)?;

    let digest_value = find_child_element(reference_node, ns::DSIG, ns::node::DIGEST_VALUE)
        .ok_or_else(|| Error::MissingElement("DigestValue".into()))?;
    let expected = decode_base64(digest_value, "DigestValue")?;
    if !digest::constant_time_eq(&expected, &reference.computed) {
        return Ok(VerifyResult::Invalid {
            reason: format!("digest mismatch for #{}", reference.id),
        });
    }

    let hints = keyinfo::read_signature_key_info(sig_node)?;
    let candidates =
        keyinfo::resolve_candidates(&hints, &ctx.keys_manager, ctx.verification_time)?;

    let signed_octets = signed_info.canonicalize(doc)?;

    let sig_value_node = find_child_element(sig_node, ns::DSIG, ns::node::SIGNATURE_VALUE)
        .ok_or_else(|| Error::MissingElement("SignatureValue".into()))?;
    let sig_value = decode_base64(sig_value_node, "SignatureValue")?;
    if sig_value.is_empty() {
        return Err(Error::MissingElement("SignatureValue is empty".into()));
    }

    let sig_alg = samlkoll_crypto::sign::from_uri(signed_info.signature_method)?;
    let mut last_error = None;
    for candidate in &candidates {
        match sig_alg.verify(&candidate.key, &signed_octets, &sig_value) {
            Ok(true) => {
                return Ok(VerifyResult::Valid {
                    key_name: candidate.name.clone(),
                    signed_id: reference.id,
                })
            }
            Ok(false) => {}
            // Key of another type, or a signature the key cannot parse.
            Err(e) => last_error = Some(e),
        }
    }

    let mut reason = format!(
        "signature does not verify with any of {} trusted key(s)",
        candidates.len()
    );
    if let Some(e) = last_error {
        reason.push_str(&format!(" (last error: {e})"));
    }
    Ok(VerifyResult::Invalid { reason })
}

/// Verify the signature that is a direct child of the document element.
pub fn verify(ctx: &DsigContext, xml: &str) -> Result<VerifyResult, Error> {
    let doc = samlkoll_xml::parse(xml)?;
    let sig_node = find_child_element(doc.root_element(), ns::DSIG, ns::node::SIGNATURE)
        .ok_or_else(|| Error::MissingElement("Signature".into()))?;
    verify_signature(ctx, &doc, sig_node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sign::sign;
    use samlkoll_keys::{Key, KeyData, KeyUsage, KeysManager};

    fn key(seed: u8, name: &str) -> Key {
        let sk = p256::ecdsa::SigningKey::from_slice(&[seed; 32]).unwrap();
        let public = *sk.verifying_key();
        Key::new(
            KeyData::EcP256 {
                private: Some(sk),
                public,
            },
            KeyUsage::Any,
        )
        .with_name(name)
    }

    fn public_only(k: &Key) -> Key {
        let KeyData::EcP256 { public, .. } = &k.data else {
            unreachable!()
        };
        let mut out = Key::new(
            KeyData::EcP256 {
                private: None,
                public: *public,
            },
            KeyUsage::Verify,
        );
        out.name = k.name.clone();
        out
    }

    const TEMPLATE: &str = r##"<doc:Root xmlns:doc="urn:doc" ID="r1"><doc:Value>42</doc:Value><ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:SignedInfo><ds:CanonicalizationMethod Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"/><ds:SignatureMethod Algorithm="http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256"/><ds:Reference URI="#r1"><ds:Transforms><ds:Transform Algorithm="http://www.w3.org/2000/09/xmldsig#enveloped-signature"/><ds:Transform Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"/></ds:Transforms><ds:DigestMethod Algorithm="http://www.w3.org/2001/04/xmlenc#sha256"/><ds:DigestValue></ds:DigestValue></ds:Reference></ds:SignedInfo><ds:SignatureValue></ds:SignatureValue><ds:KeyInfo><ds:KeyName>signer</ds:KeyName></ds:KeyInfo></ds:Signature></doc:Root>"##;

    fn signed(template: &str) -> String {
        let mut mgr = KeysManager::new();
        mgr.add_key(key(5, "signer"));
        sign(&DsigContext::new(mgr), template).unwrap()
    }

    fn verifier(seed: u8) -> DsigContext {
        let mut mgr = KeysManager::new();
        mgr.add_key(public_only(&key(seed, "signer")));
        DsigContext::new(mgr)
    }

    #[test]
    fn valid_signature() {
        let xml = signed(TEMPLATE);
        let result = verify(&verifier(5), &xml).unwrap();
        assert_eq!(
            result,
            VerifyResult::Valid {
                key_name: Some("signer".into()),
                signed_id: "r1".into()
            }
        );
    }

    #[test]
    fn tampered_content_fails_digest() {
        let xml = signed(TEMPLATE).replace(">42<", ">43<");
        let result = verify(&verifier(5), &xml).unwrap();
        assert!(matches!(result, VerifyResult::Invalid { ref reason } if reason.contains("digest")));
    }

    #[test]
    fn wrong_key_is_invalid() {
        let xml = signed(TEMPLATE);
        assert!(!verify(&verifier(6), &xml).unwrap().is_valid());
    }

    #[test]
    fn reference_must_point_at_parent() {
        let template = TEMPLATE
            .replace(r##"URI="#r1""##, r##"URI="#v1""##)
            .replace("<doc:Value>", r#"<doc:Value ID="v1">"#);
        let xml = signed(&template);
        assert!(matches!(
            verify(&verifier(5), &xml),
            Err(Error::XmlStructure(_))
        ));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let xml = signed(TEMPLATE).replace("<doc:Value>", r#"<doc:Value ID="r1">"#);
        assert!(matches!(
            verify(&verifier(5), &xml),
            Err(Error::DuplicateId(_))
        ));
    }

    #[test]
    fn sha1_needs_opt_in() {
        let template = TEMPLATE.replace(
            "http://www.w3.org/2001/04/xmlenc#sha256",
            "http://www.w3.org/2000/09/xmldsig#sha1",
        );
        let xml = signed(&template);
        assert!(matches!(
            verify(&verifier(5), &xml),
            Err(Error::DisallowedAlgorithm(_))
        ));
        assert!(verify(&verifier(5).with_allow_sha1(true), &xml)
            .unwrap()
            .is_valid());
    }

    #[test]
    fn missing_signature_value_is_structural() {
        let xml = signed(TEMPLATE);
        let start = xml.find("<ds:SignatureValue>").unwrap();
        let end = xml.find("</ds:SignatureValue>").unwrap() + "</ds:SignatureValue>".len();
        let stripped = format!("{}{}", &xml[..start], &xml[end..]);
        assert!(matches!(
            verify(&verifier(5), &stripped),
            Err(Error::MissingElement(_))
        ));
    }

    #[test]
    fn two_references_rejected() {
        let xml = signed(TEMPLATE);
        let start = xml.find("<ds:Reference ").unwrap();
        let end = xml.find("</ds:Reference>").unwrap() + "</ds:Reference>".len();
        let doubled = format!("{}{}{}", &xml[..end], &xml[start..end], &xml[end..]);
        assert!(matches!(
            verify(&verifier(5), &doubled),
            Err(Error::XmlStructure(_))
        ));
    }
}
