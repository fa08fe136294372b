#![forbid(unsafe_code)]

//! Algorithm URI constants for XML-DSig as profiled by SAML 2.0.
//!
//! Each constant is the canonical URI string that appears in `Algorithm`
//! attributes. Only algorithms a SAML relying party is expected to meet are
//! listed; anything else is rejected as unsupported.

// ── Canonicalization ─────────────────────────────────────────────────

pub const C14N: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
pub const C14N_WITH_COMMENTS: &str =
    "http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments";
pub const C14N11: &str = "http://www.w3.org/2006/12/xml-c14n11";
pub const C14N11_WITH_COMMENTS: &str = "http://www.w3.org/2006/12/xml-c14n11#WithComments";
pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
pub const EXC_C14N_WITH_COMMENTS: &str = "http://www.w3.org/2001/10/xml-exc-c14n#WithComments";

// ── Digest algorithms ────────────────────────────────────────────────

pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
pub const SHA224: &str = "http://www.w3.org/2001/04/xmldsig-more#sha224";
pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
pub const SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#sha384";
pub const SHA512: &str = "http://www.w3.org/2001/04/xmlenc#sha512";

// ── RSA signature algorithms ─────────────────────────────────────────

pub const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
pub const RSA_SHA224: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha224";
pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
pub const RSA_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384";
pub const RSA_SHA512: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512";

// ── RSA-PSS signature algorithms ─────────────────────────────────────

pub const RSA_PSS_SHA256: &str = "http://www.w3.org/2007/05/xmldsig-more#sha256-rsa-MGF1";
pub const RSA_PSS_SHA384: &str = "http://www.w3.org/2007/05/xmldsig-more#sha384-rsa-MGF1";
pub const RSA_PSS_SHA512: &str = "http://www.w3.org/2007/05/xmldsig-more#sha512-rsa-MGF1";

// ── ECDSA signature algorithms ───────────────────────────────────────

pub const ECDSA_SHA1: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha1";
pub const ECDSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256";
pub const ECDSA_SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha384";
pub const ECDSA_SHA512: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha512";

// ── Transform algorithms ─────────────────────────────────────────────

pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

/// Returns true for digest and signature URIs built on SHA-1.
pub fn is_sha1(uri: &str) -> bool {
    matches!(uri, SHA1 | RSA_SHA1 | ECDSA_SHA1)
}

/// Returns true for any of the canonicalization URIs above.
pub fn is_c14n(uri: &str) -> bool {
    matches!(
        uri,
        C14N | C14N_WITH_COMMENTS
            | C14N11
            | C14N11_WITH_COMMENTS
            | EXC_C14N
            | EXC_C14N_WITH_COMMENTS
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha1_family() {
        assert!(is_sha1(SHA1));
        assert!(is_sha1(RSA_SHA1));
        assert!(is_sha1(ECDSA_SHA1));
        assert!(!is_sha1(SHA256));
        assert!(!is_sha1(RSA_SHA256));
    }

    #[test]
    fn c14n_family() {
        assert!(is_c14n(EXC_C14N));
        assert!(is_c14n(C14N11_WITH_COMMENTS));
        assert!(!is_c14n(ENVELOPED_SIGNATURE));
    }
}
