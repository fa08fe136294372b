#![forbid(unsafe_code)]

//! ID maps and element lookups over a parsed roxmltree document.

use samlkoll_core::Error;
use std::collections::HashMap;

/// Build an ID map over the given attribute names, failing on duplicates.
pub fn build_id_map_with(
    doc: &roxmltree::Document<'_>,
    attr_names: &[&str],
) -> Result<HashMap<String, roxmltree::NodeId>, Error> {
    let mut map = HashMap::new();
    for node in doc.descendants().filter(|n| n.is_element()) {
        for attr in node.attributes() {
            if attr.namespace().is_some() || !attr_names.contains(&attr.name()) {
                continue;
            }
            if map.insert(attr.value().to_owned(), node.id()).is_some() {
                return Err(Error::DuplicateId(attr.value().to_owned()));
            }
        }
    }
    Ok(map)
}

/// True if `node` is an element with the given namespace and local name.
pub fn is_element(node: &roxmltree::Node<'_, '_>, ns: &str, local_name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local_name
        && node.tag_name().namespace().unwrap_or("") == ns
}

/// Find the first child element with the given namespace and local name.
pub fn find_child_element<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    ns: &str,
    local_name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    node.children().find(|c| is_element(c, ns, local_name))
}

/// Iterate over the child elements with the given namespace and local name.
pub fn child_elements<'a, 'input: 'a>(
    node: roxmltree::Node<'a, 'input>,
    ns: &'a str,
    local_name: &'a str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> + 'a {
    node.children().filter(move |c| is_element(c, ns, local_name))
}

/// Concatenated text content of an element, trimmed.
pub fn element_text(node: roxmltree::Node<'_, '_>) -> String {
    let mut out = String::new();
    for d in node.descendants().filter(|d| d.is_text()) {
        if let Some(t) = d.text() {
            out.push_str(t);
        }
    }
    out.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_map_finds_saml_and_dsig_ids() {
        let xml = r#"<r ID="_a"><s Id="sig"/><t id="lower"/></r>"#;
        let doc = crate::parse(xml).unwrap();
        let map = build_id_map_with(&doc, &["ID", "Id"]).unwrap();
        assert!(map.contains_key("_a"));
        assert!(map.contains_key("sig"));
        assert!(!map.contains_key("lower"));
    }

    #[test]
    fn duplicate_id_is_an_error() {
        let xml = r#"<r><a ID="_x"/><b ID="_x"/></r>"#;
        let doc = crate::parse(xml).unwrap();
        match build_id_map_with(&doc, &["ID"]) {
            Err(Error::DuplicateId(id)) => assert_eq!(id, "_x"),
            other => panic!("expected DuplicateId, got {other:?}"),
        }
    }

    #[test]
    fn child_lookup_respects_namespace() {
        let xml = r#"<r xmlns:a="urn:a" xmlns:b="urn:b"><b:x>no</b:x><a:x> yes </a:x></r>"#;
        let doc = crate::parse(xml).unwrap();
        let x = find_child_element(doc.root_element(), "urn:a", "x").unwrap();
        assert_eq!(element_text(x), "yes");
        assert_eq!(child_elements(doc.root_element(), "urn:b", "x").count(), 1);
    }
}
