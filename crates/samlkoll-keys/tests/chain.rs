//! X.509 chain validation and KeyInfo resolution against real certificates.

use samlkoll_keys::keyinfo::{resolve_candidates, KeyInfoHints};
use samlkoll_keys::loader::{certificate_der_from_pem, load_private_key_pem};
use samlkoll_keys::x509::{datetime_from_unix, validate_cert_chain, CertValidationConfig};
use samlkoll_keys::KeysManager;

const CA_CERT: &str = include_str!("../../samlkoll-saml/tests/fixtures/ca-cert.pem");
const LEAF_CERT: &str = include_str!("../../samlkoll-saml/tests/fixtures/leaf-cert.pem");
const IDP_CERT: &str = include_str!("../../samlkoll-saml/tests/fixtures/idp-cert.pem");
const ROGUE_CERT: &str = include_str!("../../samlkoll-saml/tests/fixtures/rogue-cert.pem");
const RSA_CERT: &str = include_str!("../../samlkoll-saml/tests/fixtures/rsa-cert.pem");
const LEAF_KEY: &str = include_str!("../../samlkoll-saml/tests/fixtures/leaf-key.pem");

// 2030-06-01T12:00:00Z
const NOW: i64 = 1_906_545_600;

fn der(pem: &str) -> Vec<u8> {
    certificate_der_from_pem(pem.as_bytes()).unwrap()
}

fn config(trusted: &[Vec<u8>], at: i64) -> CertValidationConfig<'_> {
    CertValidationConfig {
        trusted_certs: trusted,
        untrusted_certs: &[],
        verification_time: Some(datetime_from_unix(at).unwrap()),
        skip_time_checks: false,
    }
}

#[test]
fn leaf_chains_to_trusted_ca() {
    let trusted = vec![der(CA_CERT)];
    validate_cert_chain(&der(LEAF_CERT), &[], &config(&trusted, NOW)).unwrap();
}

#[test]
fn pinned_self_signed_cert_is_trusted() {
    let trusted = vec![der(IDP_CERT), der(RSA_CERT)];
    validate_cert_chain(&der(IDP_CERT), &[], &config(&trusted, NOW)).unwrap();
    validate_cert_chain(&der(RSA_CERT), &[], &config(&trusted, NOW)).unwrap();
}

#[test]
fn rogue_cert_does_not_chain() {
    let trusted = vec![der(CA_CERT), der(IDP_CERT)];
    assert!(validate_cert_chain(&der(ROGUE_CERT), &[], &config(&trusted, NOW)).is_err());
}

#[test]
fn leaf_does_not_chain_to_unrelated_anchor() {
    let trusted = vec![der(IDP_CERT)];
    assert!(validate_cert_chain(&der(LEAF_CERT), &[], &config(&trusted, NOW)).is_err());
}

#[test]
fn not_yet_valid_certificate_rejected() {
    let trusted = vec![der(CA_CERT)];
    // 2020-01-01, before the fixtures' notBefore.
    assert!(validate_cert_chain(&der(LEAF_CERT), &[], &config(&trusted, 1_577_836_800)).is_err());
}

#[test]
fn chained_embedded_certificate_is_the_only_candidate() {
    let mut mgr = KeysManager::new();
    mgr.add_trusted_cert_key(der(CA_CERT)).unwrap();
    mgr.add_trusted_cert_key(der(IDP_CERT)).unwrap();
    let hints = KeyInfoHints {
        certificates: vec![der(LEAF_CERT)],
        ..Default::default()
    };
    let at = Some(datetime_from_unix(NOW).unwrap());
    let candidates = resolve_candidates(&hints, &mgr, at).unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(
        candidates[0].name.as_deref(),
        Some("CN=signing.idp.example.org")
    );

    // The candidate is the public half of the leaf's private key.
    let private = load_private_key_pem(LEAF_KEY.as_bytes()).unwrap();
    let alg = samlkoll_crypto::sign::from_uri(samlkoll_core::algorithm::ECDSA_SHA256).unwrap();
    let sig = alg.sign(&private.to_signing_key(), b"payload").unwrap();
    assert!(alg.verify(&candidates[0].key, b"payload", &sig).unwrap());
}

#[test]
fn untrusted_embedded_certificate_falls_back_to_trusted_keys() {
    let mut mgr = KeysManager::new();
    mgr.add_trusted_cert_key(der(IDP_CERT)).unwrap();
    let hints = KeyInfoHints {
        certificates: vec![der(ROGUE_CERT)],
        ..Default::default()
    };
    let at = Some(datetime_from_unix(NOW).unwrap());
    let candidates = resolve_candidates(&hints, &mgr, at).unwrap();
    assert_eq!(candidates.len(), 1);
    let name = candidates[0].name.as_deref().unwrap();
    assert!(name.contains("CN=idp.example.org"), "{name}");
}
