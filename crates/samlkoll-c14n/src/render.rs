#![forbid(unsafe_code)]

//! Shared rendering utilities for C14N output.

use crate::escape;
use roxmltree::{Node, NodeType};
use samlkoll_core::ns;
use samlkoll_xml::qname;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A namespace declaration to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    /// The prefix ("" for default namespace).
    pub prefix: String,
    /// The namespace URI.
    pub uri: String,
}

impl NsDecl {
    pub fn write(&self, out: &mut Vec<u8>) {
        if self.prefix.is_empty() {
            out.extend_from_slice(b" xmlns=\"");
        } else {
            out.extend_from_slice(b" xmlns:");
            out.extend_from_slice(self.prefix.as_bytes());
            out.extend_from_slice(b"=\"");
        }
        escape::write_attr(out, &self.uri);
        out.push(b'"');
    }
}

impl Ord for NsDecl {
    // Default namespace first, then by prefix.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.prefix.is_empty(), other.prefix.is_empty()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => self.prefix.cmp(&other.prefix),
        }
    }
}

impl PartialOrd for NsDecl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An attribute to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// The namespace URI of the attribute ("" for no namespace).
    pub ns_uri: String,
    pub local_name: String,
    /// The qualified name as written (prefix:local or just local).
    pub qualified_name: String,
    pub value: String,
}

impl Attr {
    pub fn prefix(&self) -> &str {
        qname::prefix_of(&self.qualified_name)
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        out.push(b' ');
        out.extend_from_slice(self.qualified_name.as_bytes());
        out.extend_from_slice(b"=\"");
        escape::write_attr(out, &self.value);
        out.push(b'"');
    }
}

impl Ord for Attr {
    // Unqualified attributes first, then by (namespace URI, local name).
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.ns_uri.is_empty(), other.ns_uri.is_empty()) {
            (true, true) => self.local_name.cmp(&other.local_name),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self
                .ns_uri
                .cmp(&other.ns_uri)
                .then(self.local_name.cmp(&other.local_name)),
        }
    }
}

impl PartialOrd for Attr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Collect an element's attributes with the prefixes the author used.
pub fn collect_attrs(node: &Node<'_, '_>) -> Vec<Attr> {
    let qnames = qname::attribute_qnames(node);
    node.attributes()
        .enumerate()
        .map(|(i, attr)| {
            let ns_uri = attr.namespace().unwrap_or("");
            let qualified_name = match qnames.get(i) {
                Some(q) if q.ends_with(attr.name()) => (*q).to_owned(),
                _ if ns_uri == ns::XML => format!("xml:{}", attr.name()),
                _ => attr.name().to_owned(),
            };
            Attr {
                ns_uri: ns_uri.to_owned(),
                local_name: attr.name().to_owned(),
                qualified_name,
                value: attr.value().to_owned(),
            }
        })
        .collect()
}

/// All namespace bindings in scope at an element, keyed by prefix.
///
/// The `xml` prefix and default-namespace undeclarations are left out; they
/// are never rendered as declarations.
pub fn inscope_namespaces(node: &Node<'_, '_>) -> BTreeMap<String, String> {
    node.namespaces()
        .filter(|n| n.name() != Some("xml") && !n.uri().is_empty())
        .map(|n| (n.name().unwrap_or("").to_owned(), n.uri().to_owned()))
        .collect()
}

/// Write the element start tag `<qname decls attrs>`.
pub fn write_start_tag(out: &mut Vec<u8>, qname: &str, decls: &[NsDecl], attrs: &[Attr]) {
    out.push(b'<');
    out.extend_from_slice(qname.as_bytes());
    for d in decls {
        d.write(out);
    }
    for a in attrs {
        a.write(out);
    }
    out.push(b'>');
}

pub fn write_end_tag(out: &mut Vec<u8>, qname: &str) {
    out.extend_from_slice(b"</");
    out.extend_from_slice(qname.as_bytes());
    out.push(b'>');
}

/// Render a non-element leaf node (text, comment, PI) if it is visible.
///
/// Comments and PIs outside the document element are separated from it by
/// a line feed.
pub fn write_leaf(out: &mut Vec<u8>, node: &Node<'_, '_>, with_comments: bool) {
    match node.node_type() {
        NodeType::Text => escape::write_text(out, node.text().unwrap_or("")),
        NodeType::Comment if with_comments => {
            let top = at_document_level(node);
            if top && node.prev_siblings().skip(1).any(|s| s.is_element()) {
                out.push(b'\n');
            }
            out.extend_from_slice(b"<!--");
            out.extend_from_slice(node.text().unwrap_or("").as_bytes());
            out.extend_from_slice(b"-->");
            if top && node.next_siblings().skip(1).any(|s| s.is_element()) {
                out.push(b'\n');
            }
        }
        NodeType::PI => {
            let Some(pi) = node.pi() else { return };
            let top = at_document_level(node);
            if top && node.prev_siblings().skip(1).any(|s| s.is_element()) {
                out.push(b'\n');
            }
            out.extend_from_slice(b"<?");
            out.extend_from_slice(pi.target.as_bytes());
            if let Some(value) = pi.value.filter(|v| !v.is_empty()) {
                out.push(b' ');
                escape::write_pi(out, value);
            }
            out.extend_from_slice(b"?>");
            if top && node.next_siblings().skip(1).any(|s| s.is_element()) {
                out.push(b'\n');
            }
        }
        _ => {}
    }
}

fn at_document_level(node: &Node<'_, '_>) -> bool {
    node.parent()
        .is_some_and(|p| p.node_type() == NodeType::Root)
}
