#![forbid(unsafe_code)]

/// Errors produced by the XML security layers of samlkoll.
///
/// The SAML layer maps these onto its own failure taxonomy; see
/// `samlkoll_saml::FailureKind`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("invalid XML structure: {0}")]
    XmlStructure(String),

    #[error("duplicate ID attribute value: {0}")]
    DuplicateId(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("algorithm not allowed: {0}")]
    DisallowedAlgorithm(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("digest mismatch for reference: {0}")]
    DigestMismatch(String),

    #[error("canonicalization error: {0}")]
    Canonicalization(String),

    #[error("transform error: {0}")]
    Transform(String),

    #[error("base64 decode error: {0}")]
    Base64(String),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("missing required element: {0}")]
    MissingElement(String),

    #[error("missing required attribute: {0}")]
    MissingAttribute(String),

    #[error("invalid URI reference: {0}")]
    InvalidUri(String),

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors caused by the shape of the signed document rather
    /// than by cryptographic failure.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::XmlParse(_)
                | Error::XmlStructure(_)
                | Error::DuplicateId(_)
                | Error::UnsupportedAlgorithm(_)
                | Error::Transform(_)
                | Error::Canonicalization(_)
                | Error::Base64(_)
                | Error::MissingElement(_)
                | Error::MissingAttribute(_)
                | Error::InvalidUri(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
