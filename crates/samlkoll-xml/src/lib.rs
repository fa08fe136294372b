#![forbid(unsafe_code)]

//! XML document helpers for samlkoll.
//!
//! Provides a thin layer over `roxmltree`: a strict ID map, the `NodeSet`
//! used by canonicalization and transforms, recovery of qualified names
//! from the source text, and same-document reference resolution.

pub mod document;
pub mod nodeset;
pub mod qname;
pub mod reference;

pub use nodeset::NodeSet;

/// Return the roxmltree parsing options used for every untrusted input.
///
/// DTDs are refused. A SAML message has no business carrying one, and
/// refusing them removes entity-expansion tricks from the attack surface.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: false,
        ..roxmltree::ParsingOptions::default()
    }
}

/// Parse text with [`parsing_options`], mapping the error into the crate error.
pub fn parse(text: &str) -> Result<roxmltree::Document<'_>, samlkoll_core::Error> {
    roxmltree::Document::parse_with_options(text, parsing_options())
        .map_err(|e| samlkoll_core::Error::XmlParse(e.to_string()))
}
