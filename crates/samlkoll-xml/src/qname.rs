#![forbid(unsafe_code)]

//! Qualified names as written in the source text.
//!
//! roxmltree resolves prefixes to namespace URIs and keeps only the
//! resolved form. Canonical XML must reproduce the prefixes the author
//! used, so they are recovered here by lexing the element's start tag out
//! of [`roxmltree::Document::input_text`].

use roxmltree::Node;

/// The start tag of an element, from `<` up to (excluding) the closing `>`.
pub fn start_tag<'input>(node: &Node<'_, 'input>) -> &'input str {
    let text = node.document().input_text();
    let tail = &text[node.range().start..];
    // Attribute values may contain `>`; skip quoted runs.
    let mut quote: Option<u8> = None;
    for (i, b) in tail.bytes().enumerate() {
        match (quote, b) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, b'"') | (None, b'\'') => quote = Some(b),
            (None, b'>') => return &tail[..i],
            _ => {}
        }
    }
    tail
}

fn is_name_end(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'/' || b == b'>' || b == b'='
}

/// The element's qualified name as written (`saml:Assertion`, `Response`).
pub fn element_qname<'input>(node: &Node<'_, 'input>) -> &'input str {
    let tag = start_tag(node);
    let body = tag.strip_prefix('<').unwrap_or(tag);
    let end = body.bytes().position(is_name_end).unwrap_or(body.len());
    &body[..end]
}

/// The element's prefix, `""` when unprefixed.
pub fn element_prefix<'input>(node: &Node<'_, 'input>) -> &'input str {
    match element_qname(node).split_once(':') {
        Some((prefix, _)) => prefix,
        None => "",
    }
}

/// Qualified names of the element's attributes, in document order,
/// skipping namespace declarations.
///
/// The result lines up index-for-index with `node.attributes()`.
pub fn attribute_qnames<'input>(node: &Node<'_, 'input>) -> Vec<&'input str> {
    let tag = start_tag(node);
    let bytes = tag.as_bytes();
    let mut names = Vec::new();
    let mut i = 1 + element_qname(node).len();
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] == b'/' {
            break;
        }
        let start = i;
        while i < bytes.len() && !is_name_end(bytes[i]) {
            i += 1;
        }
        let name = &tag[start..i];
        while i < bytes.len() && bytes[i] != b'"' && bytes[i] != b'\'' {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        let q = bytes[i];
        i += 1;
        while i < bytes.len() && bytes[i] != q {
            i += 1;
        }
        i += 1;
        if name != "xmlns" && !name.starts_with("xmlns:") {
            names.push(name);
        }
    }
    names
}

/// Prefix of a qualified name, `""` when unprefixed.
pub fn prefix_of(qname: &str) -> &str {
    qname.split_once(':').map(|(p, _)| p).unwrap_or("")
}
