#![forbid(unsafe_code)]

//! Key management for samlkoll.
//!
//! Loads keys and certificates from PEM and DER, keeps the relying party's
//! trust store in a `KeysManager`, validates X.509 chains against it, and
//! turns a `<ds:KeyInfo>` element into the list of keys that may be tried.

pub mod key;
pub mod keyinfo;
pub mod loader;
pub mod manager;
pub mod x509;

pub use key::{Key, KeyData, KeyUsage};
pub use manager::KeysManager;
