#![forbid(unsafe_code)]

//! Inclusive Canonical XML 1.0 (C14N 1.0).
//!
//! Algorithm URI: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315`
//! With comments: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments`
//!
//! The canonical form:
//! - Outputs namespace declarations sorted by prefix (default first)
//! - Outputs attributes sorted by (namespace-URI, local-name)
//! - Escapes text and attribute values per C14N rules
//! - Optionally preserves or strips comments
//! - Supports document-subset canonicalization via NodeSet

use crate::render::{self, Attr, NsDecl};
use roxmltree::{Node, NodeType};
use samlkoll_core::{ns, Error};
use samlkoll_xml::{qname, NodeSet};
use std::collections::BTreeMap;

/// Canonicalize a document using Inclusive C14N 1.0.
pub fn canonicalize(
    doc: &roxmltree::Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
) -> Result<Vec<u8>, Error> {
    let mut output = Vec::new();
    let ctx = C14nContext {
        with_comments,
        node_set,
        inherit_xml_attrs: true,
    };
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new());
    Ok(output)
}

pub(crate) struct C14nContext<'a> {
    pub(crate) with_comments: bool,
    pub(crate) node_set: Option<&'a NodeSet>,
    /// C14N 1.0 copies `xml:*` attributes from omitted ancestors onto the
    /// apex of a subset; 1.1 restricts that to `xml:lang` and `xml:space`.
    pub(crate) inherit_xml_attrs: bool,
}

impl C14nContext<'_> {
    fn is_visible(&self, node: &Node<'_, '_>) -> bool {
        self.node_set.map_or(true, |ns| ns.contains(node))
    }

    pub(crate) fn process_node(
        &self,
        node: Node<'_, '_>,
        output: &mut Vec<u8>,
        inherited_ns: &BTreeMap<String, String>,
    ) {
        match node.node_type() {
            NodeType::Root => {
                for child in node.children() {
                    self.process_node(child, output, inherited_ns);
                }
            }
            NodeType::Element => self.process_element(node, output, inherited_ns),
            _ => {
                if self.is_visible(&node) {
                    render::write_leaf(output, &node, self.with_comments);
                }
            }
        }
    }

    fn process_element(
        &self,
        node: Node<'_, '_>,
        output: &mut Vec<u8>,
        inherited_ns: &BTreeMap<String, String>,
    ) {
        if !self.is_visible(&node) {
            // Omitted element: its visible descendants are still rendered,
            // measured against the nearest rendered ancestor.
            for child in node.children() {
                self.process_node(child, output, inherited_ns);
            }
            return;
        }

        let current_ns = render::inscope_namespaces(&node);

        let mut ns_decls: Vec<NsDecl> = current_ns
            .iter()
            .filter(|(prefix, uri)| inherited_ns.get(*prefix) != Some(*uri))
            .map(|(prefix, uri)| NsDecl {
                prefix: prefix.clone(),
                uri: uri.clone(),
            })
            .collect();

        // The nearest rendered ancestor had a default namespace that is no
        // longer in scope here.
        if inherited_ns.get("").is_some_and(|d| !d.is_empty()) && !current_ns.contains_key("") {
            ns_decls.push(NsDecl {
                prefix: String::new(),
                uri: String::new(),
            });
        }
        ns_decls.sort();

        let mut attrs = render::collect_attrs(&node);
        if self.node_set.is_some() {
            let parent_omitted = node
                .parent()
                .map_or(true, |p| !p.is_element() || !self.is_visible(&p));
            if parent_omitted {
                let extra = self.inherited_xml_attrs(&node, &attrs);
                attrs.extend(extra);
            }
        }
        attrs.sort();

        let elem_name = qname::element_qname(&node);
        render::write_start_tag(output, elem_name, &ns_decls, &attrs);

        let mut child_ns = inherited_ns.clone();
        child_ns.remove("");
        child_ns.extend(current_ns);

        for child in node.children() {
            self.process_node(child, output, &child_ns);
        }

        render::write_end_tag(output, elem_name);
    }

    /// `xml:*` attributes declared on omitted ancestors, nearest first,
    /// minus those the element already carries.
    fn inherited_xml_attrs(&self, node: &Node<'_, '_>, existing: &[Attr]) -> Vec<Attr> {
        let mut inherited: BTreeMap<&str, &str> = BTreeMap::new();
        for ancestor in node.ancestors().skip(1).filter(|a| a.is_element()) {
            for attr in ancestor.attributes() {
                if attr.namespace() != Some(ns::XML) {
                    continue;
                }
                if !self.inherit_xml_attrs && !matches!(attr.name(), "lang" | "space") {
                    continue;
                }
                inherited.entry(attr.name()).or_insert(attr.value());
            }
        }

        inherited
            .into_iter()
            .filter(|(name, _)| {
                !existing
                    .iter()
                    .any(|a| a.ns_uri == ns::XML && a.local_name == *name)
            })
            .map(|(name, value)| Attr {
                ns_uri: ns::XML.to_owned(),
                local_name: name.to_owned(),
                qualified_name: format!("xml:{name}"),
                value: value.to_owned(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c14n(xml: &str) -> String {
        let doc = samlkoll_xml::parse(xml).unwrap();
        String::from_utf8(canonicalize(&doc, false, None).unwrap()).unwrap()
    }

    #[test]
    fn attributes_sorted_and_empty_elements_expanded() {
        assert_eq!(
            c14n(r#"<root><a b="1" a="2"/></root>"#),
            r#"<root><a a="2" b="1"></a></root>"#
        );
    }

    #[test]
    fn namespaced_attribute_order() {
        let xml = r#"<e xmlns:b="http://b" xmlns:a="http://a" b:attr="1" a:attr="2" attr="3"/>"#;
        assert_eq!(
            c14n(xml),
            r#"<e xmlns:a="http://a" xmlns:b="http://b" attr="3" a:attr="2" b:attr="1"></e>"#
        );
    }

    #[test]
    fn redundant_declarations_dropped() {
        let xml = r#"<a xmlns:p="urn:p"><p:b xmlns:p="urn:p"/></a>"#;
        assert_eq!(c14n(xml), r#"<a xmlns:p="urn:p"><p:b></p:b></a>"#);
    }

    #[test]
    fn text_escaping() {
        assert_eq!(
            c14n("<root>a &amp; b &lt; c &gt; d</root>"),
            "<root>a &amp; b &lt; c &gt; d</root>"
        );
        assert_eq!(c14n("<r><![CDATA[x<y]]></r>"), "<r>x&lt;y</r>");
    }

    #[test]
    fn subset_apex_carries_all_inscope_namespaces() {
        let xml = concat!(
            r#"<n0:local xmlns:n0="foo:bar" xmlns:n3="ftp://example.org">"#,
            r#"<n1:elem2 xmlns:n1="http://example.net" xml:lang="en">"#,
            r#"<n3:stuff xmlns:n3="ftp://example.org"/></n1:elem2></n0:local>"#
        );
        let doc = samlkoll_xml::parse(xml).unwrap();
        let elem2 = doc
            .descendants()
            .find(|n| n.tag_name().name() == "elem2")
            .unwrap();
        let set = NodeSet::tree_without_comments(elem2);
        let out = canonicalize(&doc, false, Some(&set)).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            concat!(
                r#"<n1:elem2 xmlns:n0="foo:bar" xmlns:n1="http://example.net" "#,
                r#"xmlns:n3="ftp://example.org" xml:lang="en">"#,
                r#"<n3:stuff></n3:stuff></n1:elem2>"#
            )
        );
    }

    #[test]
    fn subset_apex_inherits_xml_attrs() {
        let xml = r#"<a xml:lang="sv"><b/></a>"#;
        let doc = samlkoll_xml::parse(xml).unwrap();
        let b = doc.root_element().first_child().unwrap();
        let set = NodeSet::tree_without_comments(b);
        let out = canonicalize(&doc, false, Some(&set)).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), r#"<b xml:lang="sv"></b>"#);
    }
}
