#![forbid(unsafe_code)]

//! X.509 certificate chain validation.
//!
//! Validates a leaf certificate against trusted anchors, optionally through
//! intermediates. Validity periods are checked at a caller-supplied instant
//! so that a message is judged at the time the caller says it is now.

use der::{Decode, Encode};
use samlkoll_core::Error;
use x509_cert::Certificate;

/// Configuration for X.509 certificate chain validation.
pub struct CertValidationConfig<'a> {
    /// Trusted anchors (DER-encoded). An anchor is trusted as-is.
    pub trusted_certs: &'a [Vec<u8>],
    /// Untrusted intermediate certificates (DER-encoded).
    pub untrusted_certs: &'a [Vec<u8>],
    /// Verification instant; the system clock when `None`.
    pub verification_time: Option<der::DateTime>,
    /// Skip validity period checks.
    pub skip_time_checks: bool,
}

const MAX_CHAIN_DEPTH: usize = 10;

/// Validate a certificate chain from a leaf cert to a trusted anchor.
///
/// `additional_certs` are extra certificates carried next to the leaf
/// (the rest of an `<X509Data>`); they are never trusted on their own.
pub fn validate_cert_chain(
    leaf_der: &[u8],
    additional_certs: &[Vec<u8>],
    config: &CertValidationConfig<'_>,
) -> Result<(), Error> {
    let leaf = Certificate::from_der(leaf_der)
        .map_err(|e| Error::Certificate(format!("failed to parse leaf certificate: {e}")))?;

    let available: Vec<(Certificate, &[u8])> = additional_certs
        .iter()
        .chain(config.untrusted_certs.iter())
        .filter(|der| der.as_slice() != leaf_der)
        .filter_map(|der| Certificate::from_der(der).ok().map(|c| (c, der.as_slice())))
        .collect();

    let trusted: Vec<(Certificate, &[u8])> = config
        .trusted_certs
        .iter()
        .filter_map(|der| Certificate::from_der(der).ok().map(|c| (c, der.as_slice())))
        .collect();

    if trusted.is_empty() {
        return Err(Error::Certificate(
            "no trusted certificates available".into(),
        ));
    }

    let verif_time = if config.skip_time_checks {
        None
    } else {
        Some(resolve_verification_time(config.verification_time)?)
    };

    if let Some(t) = &verif_time {
        check_cert_time_validity(&leaf, t)?;
    }

    // A leaf that is itself an anchor needs nothing more.
    if trusted.iter().any(|(_, der)| *der == leaf_der) {
        return Ok(());
    }

    let mut current = leaf;
    let mut visited: Vec<&[u8]> = vec![leaf_der];

    for _ in 0..MAX_CHAIN_DEPTH {
        let issuer_der = current
            .tbs_certificate
            .issuer
            .to_der()
            .map_err(|e| Error::Certificate(format!("failed to encode issuer: {e}")))?;

        for (tc, _) in &trusted {
            if subject_der(tc) == issuer_der
                && is_ca(tc)
                && verify_cert_signature(&current, &tc.tbs_certificate.subject_public_key_info)
                    .is_ok()
            {
                if let Some(t) = &verif_time {
                    check_cert_time_validity(tc, t)?;
                }
                return Ok(());
            }
        }

        let next = available.iter().find(|(ic, ic_der)| {
            !visited.contains(ic_der)
                && subject_der(ic) == issuer_der
                && is_ca(ic)
                && verify_cert_signature(&current, &ic.tbs_certificate.subject_public_key_info)
                    .is_ok()
        });

        match next {
            Some((ic, ic_der)) => {
                if let Some(t) = &verif_time {
                    check_cert_time_validity(ic, t)?;
                }
                visited.push(ic_der);
                current = ic.clone();
            }
            None => {
                return Err(Error::Certificate(
                    "certificate does not chain to a trusted anchor".into(),
                ))
            }
        }
    }

    Err(Error::Certificate("certificate chain too long".into()))
}

/// Human-readable subject of a DER certificate (RFC 4514 form).
pub fn subject_name(cert_der: &[u8]) -> Result<String, Error> {
    let cert = Certificate::from_der(cert_der)
        .map_err(|e| Error::Certificate(format!("failed to parse certificate: {e}")))?;
    Ok(cert.tbs_certificate.subject.to_string())
}

fn subject_der(cert: &Certificate) -> Vec<u8> {
    cert.tbs_certificate.subject.to_der().unwrap_or_default()
}

/// True if the certificate carries BasicConstraints with cA=true.
pub fn is_ca(cert: &Certificate) -> bool {
    use x509_cert::ext::pkix::BasicConstraints;
    let bc_oid = der::oid::ObjectIdentifier::new_unwrap("2.5.29.19");
    cert.tbs_certificate
        .extensions
        .iter()
        .flatten()
        .find(|ext| ext.extn_id == bc_oid)
        .and_then(|ext| BasicConstraints::from_der(ext.extn_value.as_bytes()).ok())
        .is_some_and(|bc| bc.ca)
}

/// Convert a Unix timestamp (seconds) to a `der::DateTime`.
pub fn datetime_from_unix(secs: i64) -> Result<der::DateTime, Error> {
    let secs = u64::try_from(secs)
        .map_err(|_| Error::Certificate(format!("time before 1970: {secs}")))?;
    der::DateTime::from_unix_duration(std::time::Duration::from_secs(secs))
        .map_err(|e| Error::Certificate(format!("time conversion error: {e}")))
}

fn resolve_verification_time(time: Option<der::DateTime>) -> Result<der::DateTime, Error> {
    if let Some(t) = time {
        return Ok(t);
    }
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| Error::Certificate(format!("system time error: {e}")))?;
    der::DateTime::from_unix_duration(now)
        .map_err(|e| Error::Certificate(format!("time conversion error: {e}")))
}

/// Check if a certificate is valid at the given time.
pub fn check_cert_time_validity(
    cert: &Certificate,
    verif_time: &der::DateTime,
) -> Result<(), Error> {
    let not_before = cert.tbs_certificate.validity.not_before.to_date_time();
    let not_after = cert.tbs_certificate.validity.not_after.to_date_time();

    if *verif_time < not_before {
        return Err(Error::Certificate(format!(
            "certificate is not yet valid (notBefore: {not_before})"
        )));
    }
    if *verif_time > not_after {
        return Err(Error::Certificate(format!(
            "certificate has expired (notAfter: {not_after})"
        )));
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum CertHash { Sha1, Sha256, Sha384, Sha512 }

/// Verify a certificate's signature using the issuer's SPKI.
fn verify_cert_signature(
    cert: &Certificate,
    issuer_spki: &spki::SubjectPublicKeyInfoOwned,
) -> Result<(), Error> {
    const SHA1_RSA: &str = "1.2.840.113549.1.1.5";
    const SHA256_RSA: &str = "1.2.840.113549.1.1.11";
    const SHA384_RSA: &str = "1.2.840.113549.1.1.12";
    const SHA512_RSA: &str = "1.2.840.113549.1.1.13";
    const ECDSA_SHA1: &str = "1.2.840.10045.4.1";
    const ECDSA_SHA256: &str = "1.2.840.10045.4.3.2";
    const ECDSA_SHA384: &str = "1.2.840.10045.4.3.3";
    const ECDSA_SHA512: &str = "1.2.840.10045.4.3.4";

    let tbs_der = cert
        .tbs_certificate
        .to_der()
        .map_err(|e| Error::Certificate(format!("failed to encode TBS: {e}")))?;
    let sig_bytes = cert
        .signature
        .as_bytes()
        .ok_or_else(|| Error::Certificate("no signature bytes".into()))?;
    let spki_der = issuer_spki
        .to_der()
        .map_err(|e| Error::Certificate(format!("failed to encode issuer SPKI: {e}")))?;

    let oid = cert.signature_algorithm.oid.to_string();
    match oid.as_str() {
        SHA1_RSA => verify_rsa_signature::<sha1::Sha1>(&spki_der, &tbs_der, sig_bytes),
        SHA256_RSA => verify_rsa_signature::<sha2::Sha256>(&spki_der, &tbs_der, sig_bytes),
        SHA384_RSA => verify_rsa_signature::<sha2::Sha384>(&spki_der, &tbs_der, sig_bytes),
        SHA512_RSA => verify_rsa_signature::<sha2::Sha512>(&spki_der, &tbs_der, sig_bytes),
        ECDSA_SHA1 => verify_ecdsa_signature(&spki_der, &tbs_der, sig_bytes, CertHash::Sha1),
        ECDSA_SHA256 => verify_ecdsa_signature(&spki_der, &tbs_der, sig_bytes, CertHash::Sha256),
        ECDSA_SHA384 => verify_ecdsa_signature(&spki_der, &tbs_der, sig_bytes, CertHash::Sha384),
        ECDSA_SHA512 => verify_ecdsa_signature(&spki_der, &tbs_der, sig_bytes, CertHash::Sha512),
        _ => Err(Error::Certificate(format!(
            "unsupported certificate signature algorithm: {oid}"
        ))),
    }
}

/// Verify an RSA PKCS#1 v1.5 certificate signature.
fn verify_rsa_signature<D>(
    issuer_spki_der: &[u8],
    tbs_der: &[u8],
    signature: &[u8],
) -> Result<(), Error>
where
    D: digest::Digest + digest::const_oid::AssociatedOid,
    rsa::pkcs1v15::VerifyingKey<D>: signature::Verifier<rsa::pkcs1v15::Signature>,
{
    use signature::Verifier;
    use spki::DecodePublicKey;

    let public_key = rsa::RsaPublicKey::from_public_key_der(issuer_spki_der)
        .map_err(|e| Error::Certificate(format!("invalid RSA public key: {e}")))?;
    let verifying_key = rsa::pkcs1v15::VerifyingKey::<D>::new(public_key);
    let sig = rsa::pkcs1v15::Signature::try_from(signature)
        .map_err(|e| Error::Certificate(format!("invalid RSA signature: {e}")))?;
    verifying_key
        .verify(tbs_der, &sig)
        .map_err(|e| Error::Certificate(format!("certificate signature verification failed: {e}")))
}

/// Verify a DER-encoded ECDSA certificate signature; the curve comes from
/// the issuer key, the hash from the signature algorithm.
fn verify_ecdsa_signature(
    issuer_spki_der: &[u8],
    tbs_der: &[u8],
    signature: &[u8],
    hash: CertHash,
) -> Result<(), Error> {
    use signature::hazmat::PrehashVerifier;
    use spki::DecodePublicKey;

    let prehash = match hash {
        CertHash::Sha1 => <sha1::Sha1 as digest::Digest>::digest(tbs_der).to_vec(),
        CertHash::Sha256 => <sha2::Sha256 as digest::Digest>::digest(tbs_der).to_vec(),
        CertHash::Sha384 => <sha2::Sha384 as digest::Digest>::digest(tbs_der).to_vec(),
        CertHash::Sha512 => <sha2::Sha512 as digest::Digest>::digest(tbs_der).to_vec(),
    };

    if let Ok(vk) = p256::ecdsa::VerifyingKey::from_public_key_der(issuer_spki_der) {
        let sig = p256::ecdsa::Signature::from_der(signature)
            .map_err(|e| Error::Certificate(format!("invalid P-256 signature: {e}")))?;
        return vk
            .verify_prehash(&prehash, &sig)
            .map_err(|e| Error::Certificate(format!("certificate signature verification failed: {e}")));
    }
    if let Ok(vk) = p384::ecdsa::VerifyingKey::from_public_key_der(issuer_spki_der) {
        let sig = p384::ecdsa::Signature::from_der(signature)
            .map_err(|e| Error::Certificate(format!("invalid P-384 signature: {e}")))?;
        return vk
            .verify_prehash(&prehash, &sig)
            .map_err(|e| Error::Certificate(format!("certificate signature verification failed: {e}")));
    }
    Err(Error::Certificate("unsupported EC issuer key".into()))
}
