#![forbid(unsafe_code)]

//! SAML 2.0 relying-party response validation.
//!
//! Most users need only [`saml`]: build a [`TrustConfiguration`], wrap it
//! in a [`ResponseValidator`] and call [`ResponseValidator::validate`] with
//! the decoded response. The lower layers are re-exported for callers that
//! verify XML signatures outside of SAML.

pub use samlkoll_c14n as c14n;
pub use samlkoll_core as core;
pub use samlkoll_crypto as crypto;
pub use samlkoll_dsig as dsig;
pub use samlkoll_keys as keys;
pub use samlkoll_saml as saml;
pub use samlkoll_transforms as transforms;
pub use samlkoll_xml as xml;

pub use samlkoll_saml::{
    AuthenticatedPrincipal, FailureKind, NameIdPolicy, ResponseValidator, TrustConfiguration,
    ValidationFailure, ValidationResult,
};
