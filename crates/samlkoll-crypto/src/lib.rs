#![forbid(unsafe_code)]

//! Cryptographic algorithm implementations for samlkoll.
//!
//! Digests and signature algorithms are looked up by the URI that appears
//! in a `DigestMethod` or `SignatureMethod` element.

pub mod digest;
pub mod sign;

pub use self::digest::DigestMethod;
pub use sign::{SignatureAlgorithm, SigningKey};
