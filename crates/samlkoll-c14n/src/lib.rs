#![forbid(unsafe_code)]

//! Canonical XML for signed SAML messages.
//!
//! Three families are supported, each with and without comments:
//! Canonical XML 1.0, Canonical XML 1.1 and Exclusive Canonical XML 1.0.
//! SAML signatures almost always name the exclusive form.

pub mod escape;
pub mod exclusive;
pub mod inclusive;
pub mod inclusive11;
pub mod render;

use samlkoll_core::{algorithm, Error};
use samlkoll_xml::NodeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum C14nMode {
    Inclusive,
    InclusiveWithComments,
    Inclusive11,
    Inclusive11WithComments,
    Exclusive,
    ExclusiveWithComments,
}

const MODES: [(C14nMode, &str); 6] = [
    (C14nMode::Inclusive, algorithm::C14N),
    (C14nMode::InclusiveWithComments, algorithm::C14N_WITH_COMMENTS),
    (C14nMode::Inclusive11, algorithm::C14N11),
    (C14nMode::Inclusive11WithComments, algorithm::C14N11_WITH_COMMENTS),
    (C14nMode::Exclusive, algorithm::EXC_C14N),
    (C14nMode::ExclusiveWithComments, algorithm::EXC_C14N_WITH_COMMENTS),
];

impl C14nMode {
    pub fn uri(&self) -> &'static str {
        MODES
            .iter()
            .find(|(m, _)| m == self)
            .map_or(algorithm::C14N, |(_, uri)| *uri)
    }

    /// The mode named by an `Algorithm` URI, if it is a C14N algorithm.
    pub fn from_uri(uri: &str) -> Option<Self> {
        MODES.iter().find(|(_, u)| *u == uri).map(|(m, _)| *m)
    }

    pub fn with_comments(&self) -> bool {
        self.uri().ends_with("WithComments")
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self, Self::Exclusive | Self::ExclusiveWithComments)
    }
}

/// Parse `xml` and canonicalize it.
pub fn canonicalize(
    xml: &str,
    mode: C14nMode,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let doc = samlkoll_xml::parse(xml)?;
    canonicalize_doc(&doc, mode, node_set, inclusive_prefixes)
}

/// Canonicalize a parsed document, or the part of it in `node_set`.
///
/// `inclusive_prefixes` is the exclusive-mode `InclusiveNamespaces`
/// PrefixList and is ignored by the inclusive modes.
pub fn canonicalize_doc(
    doc: &roxmltree::Document<'_>,
    mode: C14nMode,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let comments = mode.with_comments();
    match mode {
        C14nMode::Exclusive | C14nMode::ExclusiveWithComments => {
            exclusive::canonicalize(doc, comments, node_set, inclusive_prefixes)
        }
        C14nMode::Inclusive11 | C14nMode::Inclusive11WithComments => {
            inclusive11::canonicalize(doc, comments, node_set)
        }
        C14nMode::Inclusive | C14nMode::InclusiveWithComments => {
            inclusive::canonicalize(doc, comments, node_set)
        }
    }
}
