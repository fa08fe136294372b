#![forbid(unsafe_code)]

//! Inclusive Canonical XML 1.1 (C14N 1.1).
//!
//! Algorithm URI: `http://www.w3.org/2006/12/xml-c14n11`
//! With comments: `http://www.w3.org/2006/12/xml-c14n11#WithComments`
//!
//! Identical to C14N 1.0 except for document subsets: only `xml:lang` and
//! `xml:space` are inherited by the apex from omitted ancestors. `xml:base`
//! fix-up is not performed; SAML messages do not use it.

use crate::inclusive::C14nContext;
use samlkoll_core::Error;
use samlkoll_xml::NodeSet;
use std::collections::BTreeMap;

/// Canonicalize using Inclusive C14N 1.1.
pub fn canonicalize(
    doc: &roxmltree::Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
) -> Result<Vec<u8>, Error> {
    let mut output = Vec::new();
    let ctx = C14nContext {
        with_comments,
        node_set,
        inherit_xml_attrs: false,
    };
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new());
    Ok(output)
}
