#![forbid(unsafe_code)]

//! Signature algorithm implementations (RSA PKCS#1 v1.5, RSA-PSS, ECDSA).
//!
//! ECDSA keys pick the curve; the URI picks the hash. The message is hashed
//! here and handed to the curve as a prehash, so `ecdsa-sha384` over a P-256
//! key means what it says.

use samlkoll_core::{algorithm, Error};
use signature::hazmat::{PrehashSigner, PrehashVerifier};
use signature::SignatureEncoding;

/// Key material for signature operations.
#[derive(Clone)]
pub enum SigningKey {
    Rsa(rsa::RsaPrivateKey),
    RsaPublic(rsa::RsaPublicKey),
    EcP256(p256::ecdsa::SigningKey),
    EcP256Public(p256::ecdsa::VerifyingKey),
    EcP384(p384::ecdsa::SigningKey),
    EcP384Public(p384::ecdsa::VerifyingKey),
}

impl SigningKey {
    /// The verification half of this key.
    pub fn to_public(&self) -> SigningKey {
        match self {
            SigningKey::Rsa(k) => SigningKey::RsaPublic(k.to_public_key()),
            SigningKey::EcP256(k) => SigningKey::EcP256Public(*k.verifying_key()),
            SigningKey::EcP384(k) => SigningKey::EcP384Public(*k.verifying_key()),
            public => public.clone(),
        }
    }

    pub fn has_private(&self) -> bool {
        matches!(
            self,
            SigningKey::Rsa(_) | SigningKey::EcP256(_) | SigningKey::EcP384(_)
        )
    }

    /// Short algorithm family name, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            SigningKey::Rsa(_) | SigningKey::RsaPublic(_) => "RSA",
            SigningKey::EcP256(_) | SigningKey::EcP256Public(_) => "EC P-256",
            SigningKey::EcP384(_) | SigningKey::EcP384Public(_) => "EC P-384",
        }
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SigningKey({}, {})",
            self.kind(),
            if self.has_private() { "private" } else { "public" }
        )
    }
}

/// Trait for signature algorithms.
pub trait SignatureAlgorithm: Send {
    fn uri(&self) -> &'static str;
    fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>, Error>;
    /// `Ok(false)` when the signature does not match; `Err` when the key
    /// cannot be used with this algorithm or the signature is malformed.
    fn verify(&self, key: &SigningKey, data: &[u8], signature: &[u8]) -> Result<bool, Error>;
}

/// Create a signature algorithm from its URI.
pub fn from_uri(uri: &str) -> Result<Box<dyn SignatureAlgorithm>, Error> {
    use HashType::*;
    let alg: Box<dyn SignatureAlgorithm> = match uri {
        algorithm::RSA_SHA1 => Box::new(RsaPkcs1v15 { uri: algorithm::RSA_SHA1, hash: Sha1 }),
        algorithm::RSA_SHA224 => Box::new(RsaPkcs1v15 { uri: algorithm::RSA_SHA224, hash: Sha224 }),
        algorithm::RSA_SHA256 => Box::new(RsaPkcs1v15 { uri: algorithm::RSA_SHA256, hash: Sha256 }),
        algorithm::RSA_SHA384 => Box::new(RsaPkcs1v15 { uri: algorithm::RSA_SHA384, hash: Sha384 }),
        algorithm::RSA_SHA512 => Box::new(RsaPkcs1v15 { uri: algorithm::RSA_SHA512, hash: Sha512 }),

        algorithm::RSA_PSS_SHA256 => Box::new(RsaPss { uri: algorithm::RSA_PSS_SHA256, hash: Sha256 }),
        algorithm::RSA_PSS_SHA384 => Box::new(RsaPss { uri: algorithm::RSA_PSS_SHA384, hash: Sha384 }),
        algorithm::RSA_PSS_SHA512 => Box::new(RsaPss { uri: algorithm::RSA_PSS_SHA512, hash: Sha512 }),

        algorithm::ECDSA_SHA1 => Box::new(Ecdsa { uri: algorithm::ECDSA_SHA1, hash: Sha1 }),
        algorithm::ECDSA_SHA256 => Box::new(Ecdsa { uri: algorithm::ECDSA_SHA256, hash: Sha256 }),
        algorithm::ECDSA_SHA384 => Box::new(Ecdsa { uri: algorithm::ECDSA_SHA384, hash: Sha384 }),
        algorithm::ECDSA_SHA512 => Box::new(Ecdsa { uri: algorithm::ECDSA_SHA512, hash: Sha512 }),

        _ => return Err(Error::UnsupportedAlgorithm(format!("signature algorithm: {uri}"))),
    };
    Ok(alg)
}

#[derive(Debug, Clone, Copy)]
enum HashType { Sha1, Sha224, Sha256, Sha384, Sha512 }

impl HashType {
    fn digest_uri(self) -> &'static str {
        match self {
            HashType::Sha1 => algorithm::SHA1,
            HashType::Sha224 => algorithm::SHA224,
            HashType::Sha256 => algorithm::SHA256,
            HashType::Sha384 => algorithm::SHA384,
            HashType::Sha512 => algorithm::SHA512,
        }
    }
}

fn rsa_public(key: &SigningKey) -> Result<rsa::RsaPublicKey, Error> {
    match key {
        SigningKey::Rsa(pk) => Ok(pk.to_public_key()),
        SigningKey::RsaPublic(pk) => Ok(pk.clone()),
        other => Err(Error::Key(format!("RSA key required, got {}", other.kind()))),
    }
}

// ── RSA PKCS#1 v1.5 ─────────────────────────────────────────────────

struct RsaPkcs1v15 { uri: &'static str, hash: HashType }

impl SignatureAlgorithm for RsaPkcs1v15 {
    fn uri(&self) -> &'static str { self.uri }

    fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>, Error> {
        use signature::Signer;
        let SigningKey::Rsa(private_key) = key else {
            return Err(Error::Key("RSA private key required".into()));
        };
        macro_rules! do_sign {
            ($hasher:ty) => {{
                let sk = rsa::pkcs1v15::SigningKey::<$hasher>::new(private_key.clone());
                let sig = sk
                    .try_sign(data)
                    .map_err(|e| Error::Crypto(format!("RSA signing failed: {e}")))?;
                Ok(sig.to_vec())
            }};
        }
        match self.hash {
            HashType::Sha1 => do_sign!(sha1::Sha1),
            HashType::Sha224 => do_sign!(sha2::Sha224),
            HashType::Sha256 => do_sign!(sha2::Sha256),
            HashType::Sha384 => do_sign!(sha2::Sha384),
            HashType::Sha512 => do_sign!(sha2::Sha512),
        }
    }

    fn verify(&self, key: &SigningKey, data: &[u8], sig_bytes: &[u8]) -> Result<bool, Error> {
        use signature::Verifier;
        let public_key = rsa_public(key)?;
        let sig = rsa::pkcs1v15::Signature::try_from(sig_bytes)
            .map_err(|e| Error::Crypto(format!("invalid RSA signature: {e}")))?;
        macro_rules! do_verify {
            ($hasher:ty) => {{
                let vk = rsa::pkcs1v15::VerifyingKey::<$hasher>::new(public_key);
                Ok(vk.verify(data, &sig).is_ok())
            }};
        }
        match self.hash {
            HashType::Sha1 => do_verify!(sha1::Sha1),
            HashType::Sha224 => do_verify!(sha2::Sha224),
            HashType::Sha256 => do_verify!(sha2::Sha256),
            HashType::Sha384 => do_verify!(sha2::Sha384),
            HashType::Sha512 => do_verify!(sha2::Sha512),
        }
    }
}

// ── RSA-PSS ──────────────────────────────────────────────────────────

struct RsaPss { uri: &'static str, hash: HashType }

impl SignatureAlgorithm for RsaPss {
    fn uri(&self) -> &'static str { self.uri }

    fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>, Error> {
        use signature::RandomizedSigner;
        let SigningKey::Rsa(private_key) = key else {
            return Err(Error::Key("RSA private key required for PSS".into()));
        };
        let mut rng = rand::thread_rng();
        macro_rules! do_sign {
            ($hasher:ty) => {{
                let sk = rsa::pss::SigningKey::<$hasher>::new(private_key.clone());
                let sig = sk
                    .try_sign_with_rng(&mut rng, data)
                    .map_err(|e| Error::Crypto(format!("RSA-PSS signing failed: {e}")))?;
                Ok(sig.to_vec())
            }};
        }
        match self.hash {
            HashType::Sha256 => do_sign!(sha2::Sha256),
            HashType::Sha384 => do_sign!(sha2::Sha384),
            HashType::Sha512 => do_sign!(sha2::Sha512),
            other => Err(Error::UnsupportedAlgorithm(format!("RSA-PSS with {other:?}"))),
        }
    }

    fn verify(&self, key: &SigningKey, data: &[u8], sig_bytes: &[u8]) -> Result<bool, Error> {
        use signature::Verifier;
        let public_key = rsa_public(key)?;
        let sig = rsa::pss::Signature::try_from(sig_bytes)
            .map_err(|e| Error::Crypto(format!("invalid RSA-PSS signature: {e}")))?;
        macro_rules! do_verify {
            ($hasher:ty) => {{
                let vk = rsa::pss::VerifyingKey::<$hasher>::new(public_key);
                Ok(vk.verify(data, &sig).is_ok())
            }};
        }
        match self.hash {
            HashType::Sha256 => do_verify!(sha2::Sha256),
            HashType::Sha384 => do_verify!(sha2::Sha384),
            HashType::Sha512 => do_verify!(sha2::Sha512),
            other => Err(Error::UnsupportedAlgorithm(format!("RSA-PSS with {other:?}"))),
        }
    }
}

// ── ECDSA ────────────────────────────────────────────────────────────

struct Ecdsa { uri: &'static str, hash: HashType }

/// Convert XML-DSig ECDSA r||s to a typed Signature for P-256.
pub fn xmldsig_to_p256(rs: &[u8]) -> Result<p256::ecdsa::Signature, Error> {
    if rs.len() != 64 {
        return Err(Error::Crypto(format!("P-256 signature must be 64 bytes, got {}", rs.len())));
    }
    p256::ecdsa::Signature::from_slice(rs)
        .map_err(|e| Error::Crypto(format!("invalid P-256 signature: {e}")))
}

/// Convert XML-DSig ECDSA r||s to a typed Signature for P-384.
pub fn xmldsig_to_p384(rs: &[u8]) -> Result<p384::ecdsa::Signature, Error> {
    if rs.len() != 96 {
        return Err(Error::Crypto(format!("P-384 signature must be 96 bytes, got {}", rs.len())));
    }
    p384::ecdsa::Signature::from_slice(rs)
        .map_err(|e| Error::Crypto(format!("invalid P-384 signature: {e}")))
}

impl SignatureAlgorithm for Ecdsa {
    fn uri(&self) -> &'static str { self.uri }

    fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>, Error> {
        let prehash = crate::digest::digest(self.hash.digest_uri(), data)?;
        // to_bytes() is already the fixed-width r||s form XML-DSig wants.
        match key {
            SigningKey::EcP256(sk) => {
                let sig: p256::ecdsa::Signature = sk
                    .sign_prehash(&prehash)
                    .map_err(|e| Error::Crypto(format!("P-256 signing failed: {e}")))?;
                Ok(sig.to_bytes().to_vec())
            }
            SigningKey::EcP384(sk) => {
                let sig: p384::ecdsa::Signature = sk
                    .sign_prehash(&prehash)
                    .map_err(|e| Error::Crypto(format!("P-384 signing failed: {e}")))?;
                Ok(sig.to_bytes().to_vec())
            }
            other => Err(Error::Key(format!("EC private key required, got {other:?}"))),
        }
    }

    fn verify(&self, key: &SigningKey, data: &[u8], sig_bytes: &[u8]) -> Result<bool, Error> {
        let prehash = crate::digest::digest(self.hash.digest_uri(), data)?;
        match key.to_public() {
            SigningKey::EcP256Public(vk) => {
                let sig = xmldsig_to_p256(sig_bytes)?;
                Ok(vk.verify_prehash(&prehash, &sig).is_ok())
            }
            SigningKey::EcP384Public(vk) => {
                let sig = xmldsig_to_p384(sig_bytes)?;
                Ok(vk.verify_prehash(&prehash, &sig).is_ok())
            }
            other => Err(Error::Key(format!("EC key required, got {}", other.kind()))),
        }
    }
}
