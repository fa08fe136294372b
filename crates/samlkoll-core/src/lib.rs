#![forbid(unsafe_code)]

//! Core types for the samlkoll SAML2 relying-party library.
//!
//! Shared by every crate in the workspace: the error enum, algorithm URI
//! constants, and XML namespace / element name constants for XML-DSig and
//! SAML 2.0.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, Result};
