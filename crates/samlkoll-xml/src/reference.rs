#![forbid(unsafe_code)]

//! Same-document references for XML-DSig processing.
//!
//! Only the bare-name form `#id` is supported, which is the only form the
//! SAML signature profile permits.

use samlkoll_core::Error;
use std::collections::HashMap;

/// Parse a same-document reference (e.g., `#foo` → `foo`).
pub fn parse_same_document_ref(uri: &str) -> Option<&str> {
    uri.strip_prefix('#').filter(|id| !id.is_empty())
}

/// Resolve an ID value in a parsed document using a pre-built ID map.
pub fn resolve_id<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
    id_map: &HashMap<String, roxmltree::NodeId>,
    id: &str,
) -> Result<roxmltree::Node<'a, 'input>, Error> {
    id_map
        .get(id)
        .and_then(|nid| doc.get_node(*nid))
        .ok_or_else(|| Error::InvalidUri(format!("ID not found: {id}")))
}

/// Check if `ancestor` is an ancestor-or-self of `node`.
pub fn is_ancestor_or_self(
    ancestor: roxmltree::Node<'_, '_>,
    node: roxmltree::Node<'_, '_>,
) -> bool {
    node.ancestors().any(|n| n.id() == ancestor.id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::build_id_map_with;

    #[test]
    fn same_document_ref() {
        assert_eq!(parse_same_document_ref("#_abc"), Some("_abc"));
        assert_eq!(parse_same_document_ref("#"), None);
        assert_eq!(parse_same_document_ref(""), None);
        assert_eq!(parse_same_document_ref("http://x/#a"), None);
    }

    #[test]
    fn resolve_and_ancestry() {
        let doc = crate::parse(r#"<r ID="top"><a ID="in"/></r>"#).unwrap();
        let map = build_id_map_with(&doc, &["ID"]).unwrap();
        let top = resolve_id(&doc, &map, "top").unwrap();
        let inner = resolve_id(&doc, &map, "in").unwrap();
        assert!(is_ancestor_or_self(top, inner));
        assert!(is_ancestor_or_self(inner, inner));
        assert!(!is_ancestor_or_self(inner, top));
        assert!(matches!(
            resolve_id(&doc, &map, "nope"),
            Err(Error::InvalidUri(_))
        ));
    }
}
