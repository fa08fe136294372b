#![forbid(unsafe_code)]

//! Key manager with named key store and trust anchors.

use crate::key::Key;
use samlkoll_core::Error;

/// Holds the verification keys and trusted certificates of a relying party.
#[derive(Debug, Clone, Default)]
pub struct KeysManager {
    keys: Vec<Key>,
    /// Trusted certificates (DER-encoded). Both pinned signing certs and CAs.
    trusted_certs: Vec<Vec<u8>>,
    /// Untrusted intermediate certificates (DER-encoded).
    untrusted_certs: Vec<Vec<u8>>,
}

impl KeysManager {
    /// Create an empty keys manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key to the manager.
    pub fn add_key(&mut self, key: Key) {
        self.keys.push(key);
    }

    /// Add a trusted certificate and the key it carries.
    ///
    /// The key is named after the certificate subject unless it already has
    /// a name.
    pub fn add_trusted_cert_key(&mut self, der: Vec<u8>) -> Result<(), Error> {
        let key = crate::loader::load_x509_cert_der(&der)?;
        self.trusted_certs.push(der);
        self.keys.push(key);
        Ok(())
    }

    /// Find a key by name.
    pub fn find_by_name(&self, name: &str) -> Option<&Key> {
        self.keys.iter().find(|k| k.name.as_deref() == Some(name))
    }

    /// Find the key taken from exactly this certificate.
    pub fn find_by_certificate(&self, der: &[u8]) -> Option<&Key> {
        self.keys.iter().find(|k| k.certificate() == Some(der))
    }

    /// Iterator over all keys.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.keys.iter()
    }

    /// Iterator over the keys usable for verification.
    pub fn verifying_keys(&self) -> impl Iterator<Item = &Key> {
        self.keys.iter().filter(|k| k.can_verify())
    }

    /// Get the first key available (for simple single-key scenarios).
    pub fn first_key(&self) -> Result<&Key, Error> {
        self.keys
            .first()
            .ok_or_else(|| Error::KeyNotFound("no keys in manager".into()))
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Add a trusted certificate (DER-encoded) without registering its key.
    pub fn add_trusted_cert(&mut self, der: Vec<u8>) {
        self.trusted_certs.push(der);
    }

    /// Add an untrusted intermediate certificate (DER-encoded).
    pub fn add_untrusted_cert(&mut self, der: Vec<u8>) {
        self.untrusted_certs.push(der);
    }

    /// Get the trusted certificates.
    pub fn trusted_certs(&self) -> &[Vec<u8>] {
        &self.trusted_certs
    }

    /// Get the untrusted intermediate certificates.
    pub fn untrusted_certs(&self) -> &[Vec<u8>] {
        &self.untrusted_certs
    }

    pub fn has_trusted_certs(&self) -> bool {
        !self.trusted_certs.is_empty()
    }

    /// Whether `der` is byte-for-byte one of the trusted certificates.
    pub fn is_trusted_cert(&self, der: &[u8]) -> bool {
        self.trusted_certs.iter().any(|c| c.as_slice() == der)
    }
}
