#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 (exc-C14N).
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//! With comments: `http://www.w3.org/2001/10/xml-exc-c14n#WithComments`
//!
//! Only "visibly utilized" namespace declarations are output. A namespace
//! is visibly utilized if its prefix is used by the element's tag name or
//! by one of its attributes. Prefixes named in the InclusiveNamespaces
//! PrefixList are treated the inclusive way instead.
//!
//! This is the canonicalization SAML signatures use in practice.

use crate::render::{self, NsDecl};
use roxmltree::{Node, NodeType};
use samlkoll_core::Error;
use samlkoll_xml::{qname, NodeSet};
use std::collections::{BTreeMap, BTreeSet};

/// Canonicalize using Exclusive C14N 1.0.
pub fn canonicalize(
    doc: &roxmltree::Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let inclusive_prefixes = inclusive_prefixes
        .iter()
        .map(|p| {
            if p == "#default" {
                String::new()
            } else {
                p.clone()
            }
        })
        .collect();
    let ctx = ExcC14nContext {
        with_comments,
        node_set,
        inclusive_prefixes,
    };
    let mut output = Vec::new();
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new());
    Ok(output)
}

struct ExcC14nContext<'a> {
    with_comments: bool,
    node_set: Option<&'a NodeSet>,
    /// PrefixList entries, `#default` mapped to "".
    inclusive_prefixes: BTreeSet<String>,
}

impl ExcC14nContext<'_> {
    fn is_visible(&self, node: &Node<'_, '_>) -> bool {
        self.node_set.map_or(true, |ns| ns.contains(node))
    }

    fn process_node(
        &self,
        node: Node<'_, '_>,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) {
        match node.node_type() {
            NodeType::Root => {
                for child in node.children() {
                    self.process_node(child, output, rendered_ns);
                }
            }
            NodeType::Element => self.process_element(node, output, rendered_ns),
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
        rendered_ns: &BTreeMap<String, String>,
    ) {
        if !self.is_visible(&node) {
            for child in node.children() {
                self.process_node(child, output, rendered_ns);
            }
            return;
        }

        let attrs = {
            let mut a = render::collect_attrs(&node);
            a.sort();
            a
        };

        let mut utilized: BTreeSet<&str> = BTreeSet::new();
        utilized.insert(qname::element_prefix(&node));
        for attr in &attrs {
            let p = attr.prefix();
            if !p.is_empty() && p != "xml" {
                utilized.insert(p);
            }
        }
        for p in &self.inclusive_prefixes {
            utilized.insert(p.as_str());
        }

        let inscope = render::inscope_namespaces(&node);

        let mut ns_decls: Vec<NsDecl> = Vec::new();
        for prefix in utilized {
            match inscope.get(prefix) {
                Some(uri) if rendered_ns.get(prefix) != Some(uri) => ns_decls.push(NsDecl {
                    prefix: prefix.to_owned(),
                    uri: uri.clone(),
                }),
                Some(_) => {}
                // An unprefixed element outside any namespace, below a
                // rendered default namespace.
                None if prefix.is_empty() => {
                    if rendered_ns.get("").is_some_and(|d| !d.is_empty()) {
                        ns_decls.push(NsDecl {
                            prefix: String::new(),
                            uri: String::new(),
                        });
                    }
                }
                None => {}
            }
        }
        ns_decls.sort();

        let elem_name = qname::element_qname(&node);
        render::write_start_tag(output, elem_name, &ns_decls, &attrs);

        let mut child_rendered = rendered_ns.clone();
        for d in ns_decls {
            child_rendered.insert(d.prefix, d.uri);
        }

        for child in node.children() {
            self.process_node(child, output, &child_rendered);
        }

        render::write_end_tag(output, elem_name);
    }
}
