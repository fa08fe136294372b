#![forbid(unsafe_code)]

//! XML Digital Signature (XML-DSig) implementation.
//!
//! Verifies enveloped signatures the way the SAML signature profile allows
//! them, and fills in signature templates.

pub mod context;
pub mod sign;
pub mod verify;

pub use context::DsigContext;
pub use verify::{verify_signature, VerifyResult};
