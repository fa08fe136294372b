#![forbid(unsafe_code)]

//! Canonicalization as a transform.

use crate::pipeline::{Transform, TransformData};
use samlkoll_c14n::C14nMode;
use samlkoll_core::{ns, Error};
use samlkoll_xml::document::find_child_element;

/// A canonicalization transform.
pub struct C14nTransform {
    mode: C14nMode,
    inclusive_prefixes: Vec<String>,
}

impl C14nTransform {
    pub fn new(mode: C14nMode, inclusive_prefixes: Vec<String>) -> Self {
        Self {
            mode,
            inclusive_prefixes,
        }
    }

    /// Build from a `<Transform>` or `<CanonicalizationMethod>` element,
    /// picking up an `<ec:InclusiveNamespaces PrefixList>` child.
    pub fn from_node(mode: C14nMode, method: roxmltree::Node<'_, '_>) -> Self {
        let prefixes = if mode.is_exclusive() {
            inclusive_prefixes(method)
        } else {
            Vec::new()
        };
        Self::new(mode, prefixes)
    }

    pub fn mode(&self) -> C14nMode {
        self.mode
    }
}

/// The whitespace-separated PrefixList of an InclusiveNamespaces child.
pub fn inclusive_prefixes(method: roxmltree::Node<'_, '_>) -> Vec<String> {
    find_child_element(method, ns::EXC_C14N, ns::node::INCLUSIVE_NAMESPACES)
        .and_then(|n| n.attribute(ns::attr::PREFIX_LIST))
        .map(|list| list.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default()
}

impl Transform for C14nTransform {
    fn uri(&self) -> &str {
        self.mode.uri()
    }

    fn execute(
        &self,
        doc: &roxmltree::Document<'_>,
        input: TransformData,
    ) -> Result<TransformData, Error> {
        match input {
            TransformData::Xml { node_set } => {
                let bytes = samlkoll_c14n::canonicalize_doc(
                    doc,
                    self.mode,
                    Some(&node_set),
                    &self.inclusive_prefixes,
                )?;
                Ok(TransformData::Binary(bytes))
            }
            TransformData::Binary(_) => Err(Error::Transform(
                "canonicalization after canonicalization".into(),
            )),
        }
    }
}
