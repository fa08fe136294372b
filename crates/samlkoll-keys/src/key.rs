#![forbid(unsafe_code)]

//! Key types and data structures.

use samlkoll_crypto::SigningKey;

/// Usage flags for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
    Sign,
    Verify,
    Any,
}

/// The underlying key data.
#[derive(Clone)]
pub enum KeyData {
    Rsa {
        private: Option<rsa::RsaPrivateKey>,
        public: rsa::RsaPublicKey,
    },
    EcP256 {
        private: Option<p256::ecdsa::SigningKey>,
        public: p256::ecdsa::VerifyingKey,
    },
    EcP384 {
        private: Option<p384::ecdsa::SigningKey>,
        public: p384::ecdsa::VerifyingKey,
    },
}

impl std::fmt::Debug for KeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (kind, private) = match self {
            Self::Rsa { private, .. } => ("RSA", private.is_some()),
            Self::EcP256 { private, .. } => ("EC P-256", private.is_some()),
            Self::EcP384 { private, .. } => ("EC P-384", private.is_some()),
        };
        if private {
            write!(f, "{kind} private+public key")
        } else {
            write!(f, "{kind} public key")
        }
    }
}

/// A named key with associated data.
#[derive(Debug, Clone)]
pub struct Key {
    /// Optional name for `<KeyName>` lookup.
    pub name: Option<String>,
    pub data: KeyData,
    pub usage: KeyUsage,
    /// X.509 certificate chain (DER-encoded), leaf first.
    pub x509_chain: Vec<Vec<u8>>,
}

impl Key {
    pub fn new(data: KeyData, usage: KeyUsage) -> Self {
        Self {
            name: None,
            data,
            usage,
            x509_chain: Vec::new(),
        }
    }

    /// Set the key name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach the certificate this key was taken from.
    pub fn with_certificate(mut self, der: Vec<u8>) -> Self {
        self.x509_chain.insert(0, der);
        self
    }

    /// The leaf certificate, if the key came from one.
    pub fn certificate(&self) -> Option<&[u8]> {
        self.x509_chain.first().map(Vec::as_slice)
    }

    pub fn has_private(&self) -> bool {
        matches!(
            &self.data,
            KeyData::Rsa { private: Some(_), .. }
                | KeyData::EcP256 { private: Some(_), .. }
                | KeyData::EcP384 { private: Some(_), .. }
        )
    }

    /// Whether the key may be used to verify signatures.
    pub fn can_verify(&self) -> bool {
        matches!(self.usage, KeyUsage::Verify | KeyUsage::Any)
    }

    /// Convert to a `SigningKey` for use with crypto algorithms.
    ///
    /// Private material is preferred when present, so the same key can sign
    /// and verify.
    pub fn to_signing_key(&self) -> SigningKey {
        match &self.data {
            KeyData::Rsa { private: Some(pk), .. } => SigningKey::Rsa(pk.clone()),
            KeyData::Rsa { public, .. } => SigningKey::RsaPublic(public.clone()),
            KeyData::EcP256 { private: Some(sk), .. } => SigningKey::EcP256(sk.clone()),
            KeyData::EcP256 { public, .. } => SigningKey::EcP256Public(*public),
            KeyData::EcP384 { private: Some(sk), .. } => SigningKey::EcP384(sk.clone()),
            KeyData::EcP384 { public, .. } => SigningKey::EcP384Public(*public),
        }
    }

    /// Convert to a verification-only `SigningKey`.
    pub fn to_verifying_key(&self) -> SigningKey {
        self.to_signing_key().to_public()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ec_key() -> Key {
        let sk = p256::ecdsa::SigningKey::from_slice(&[3u8; 32]).unwrap();
        let public = *sk.verifying_key();
        Key::new(
            KeyData::EcP256 {
                private: Some(sk),
                public,
            },
            KeyUsage::Any,
        )
    }

    #[test]
    fn private_preferred_for_signing() {
        let key = ec_key();
        assert!(key.has_private());
        assert!(key.to_signing_key().has_private());
        assert!(!key.to_verifying_key().has_private());
    }

    #[test]
    fn naming_and_certificate() {
        let key = ec_key().with_name("idp").with_certificate(vec![1, 2, 3]);
        assert_eq!(key.name.as_deref(), Some("idp"));
        assert_eq!(key.certificate(), Some(&[1u8, 2, 3][..]));
        assert_eq!(format!("{:?}", key.data), "EC P-256 private+public key");
    }

    #[test]
    fn sign_only_key_cannot_verify() {
        let mut key = ec_key();
        key.usage = KeyUsage::Sign;
        assert!(!key.can_verify());
    }
}
