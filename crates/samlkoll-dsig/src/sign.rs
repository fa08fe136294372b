#![forbid(unsafe_code)]

//! XML-DSig signature creation.
//!
//! Signs an XML template whose `<Signature>` elements carry empty
//! `<DigestValue>` and `<SignatureValue>` elements. Signatures are filled
//! innermost first, so an outer signature covers inner ones that are
//! already complete.

use crate::context::DsigContext;
use crate::verify::{compute_reference_digest, read_signed_info};
use base64::Engine;
use samlkoll_core::{ns, Error};
use samlkoll_crypto::SigningKey;
use samlkoll_xml::document::{build_id_map_with, element_text, find_child_element, is_element};
use samlkoll_xml::qname::{element_qname, start_tag};
use std::ops::Range;

/// Sign every unsigned `<Signature>` of an XML template.
///
/// The signing key is the manager key named by the signature's
/// `<KeyInfo><KeyName>` when it has private material, otherwise the first
/// private key of the manager.
pub fn sign(ctx: &DsigContext, template_xml: &str) -> Result<String, Error> {
    let mut xml = template_xml.to_owned();
    {
        let doc = samlkoll_xml::parse(&xml)?;
        if !doc.descendants().any(|n| is_signature(&n)) {
            return Err(Error::MissingElement("Signature".into()));
        }
    }
    while let Some(index) = next_unsigned(&xml)? {
        xml = fill_digests(ctx, &xml, index)?;
        xml = fill_signature_value(ctx, &xml, index)?;
    }
    Ok(xml)
}

fn is_signature(node: &roxmltree::Node<'_, '_>) -> bool {
    is_element(node, ns::DSIG, ns::node::SIGNATURE)
}

fn nth_signature<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
    index: usize,
) -> Result<roxmltree::Node<'a, 'input>, Error> {
    doc.descendants()
        .filter(is_signature)
        .nth(index)
        .ok_or_else(|| Error::MissingElement(format!("Signature #{index}")))
}

fn is_unsigned(sig: roxmltree::Node<'_, '_>) -> Result<bool, Error> {
    let value = find_child_element(sig, ns::DSIG, ns::node::SIGNATURE_VALUE)
        .ok_or_else(|| Error::MissingElement("SignatureValue".into()))?;
    Ok(element_text(value).is_empty())
}

/// Position (among all signatures) of an unsigned signature whose signed
/// element contains no other unsigned signature.
fn next_unsigned(xml: &str) -> Result<Option<usize>, Error> {
    let doc = samlkoll_xml::parse(xml)?;
    let mut unsigned = Vec::new();
    for (i, sig) in doc.descendants().filter(is_signature).enumerate() {
        if is_unsigned(sig)? {
            unsigned.push((i, sig));
        }
    }
    for (i, sig) in &unsigned {
        let Some(parent) = sig.parent_element() else {
            continue;
        };
        let encloses_other = unsigned
            .iter()
            .any(|(j, other)| j != i && other.ancestors().any(|a| a.id() == parent.id()));
        if !encloses_other {
            return Ok(Some(*i));
        }
    }
    Ok(None)
}

fn fill_digests(ctx: &DsigContext, xml: &str, index: usize) -> Result<String, Error> {
    let doc = samlkoll_xml::parse(xml)?;
    let id_map = build_id_map_with(&doc, &ctx.id_attr_names())?;
    let sig = nth_signature(&doc, index)?;
    let signed_info = read_signed_info(sig)?;

    let mut edits = Vec::new();
    for reference in &signed_info.references {
        let digest_value = find_child_element(*reference, ns::DSIG, ns::node::DIGEST_VALUE)
            .ok_or_else(|| Error::MissingElement("DigestValue".into()))?;
        if !element_text(digest_value).is_empty() {
            continue;
        }
        let digest = compute_reference_digest(&doc, &id_map, *reference, sig)?;
        edits.push(replace_text(digest_value, &encode(&digest.computed)));
    }
    Ok(apply_edits(xml, edits))
}

fn fill_signature_value(ctx: &DsigContext, xml: &str, index: usize) -> Result<String, Error> {
    let doc = samlkoll_xml::parse(xml)?;
    let sig = nth_signature(&doc, index)?;
    let signed_info = read_signed_info(sig)?;
    let octets = signed_info.canonicalize(&doc)?;

    let key = signing_key(ctx, sig)?;
    let alg = samlkoll_crypto::sign::from_uri(signed_info.signature_method)?;
    let signature = alg.sign(&key, &octets)?;

    let value = find_child_element(sig, ns::DSIG, ns::node::SIGNATURE_VALUE)
        .ok_or_else(|| Error::MissingElement("SignatureValue".into()))?;
    Ok(apply_edits(xml, vec![replace_text(value, &encode(&signature))]))
}

fn signing_key(ctx: &DsigContext, sig: roxmltree::Node<'_, '_>) -> Result<SigningKey, Error> {
    let hints = samlkoll_keys::keyinfo::read_signature_key_info(sig)?;
    let named = hints
        .key_names
        .iter()
        .filter_map(|n| ctx.keys_manager.find_by_name(n))
        .find(|k| k.has_private());
    named
        .or_else(|| ctx.keys_manager.keys().find(|k| k.has_private()))
        .map(|k| k.to_signing_key())
        .ok_or_else(|| Error::KeyNotFound("no private key to sign with".into()))
}

fn encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// An edit replacing an element with the same element holding `text`.
fn replace_text(node: roxmltree::Node<'_, '_>, text: &str) -> (Range<usize>, String) {
    let open = start_tag(&node);
    let open = open.strip_suffix('/').unwrap_or(open);
    let qname = element_qname(&node);
    (node.range(), format!("{open}>{text}</{qname}>"))
}

fn apply_edits(xml: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(r, _)| std::cmp::Reverse(r.start));
    let mut out = xml.to_owned();
    for (range, replacement) in edits {
        out.replace_range(range, &replacement);
    }
    out
}
