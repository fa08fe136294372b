#![forbid(unsafe_code)]

//! Relying-party configuration: what to trust and what to ask for.
//!
//! Both types are immutable once built. Construction validates the input,
//! so a value that exists is always usable.

use crate::error::ConfigError;
use chrono::Duration;
use samlkoll_core::ns;
use samlkoll_keys::{loader, Key, KeysManager};

/// Constraints the relying party places on the returned NameID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameIdPolicy {
    format: String,
    sp_name_qualifier: Option<String>,
    allow_create: bool,
}

impl NameIdPolicy {
    /// Build a policy. The format must contain non-whitespace text.
    pub fn new(
        format: impl Into<String>,
        sp_name_qualifier: Option<String>,
        allow_create: bool,
    ) -> Result<Self, ConfigError> {
        let format = format.into();
        if format.trim().is_empty() {
            return Err(ConfigError::EmptyFormat);
        }
        Ok(Self {
            format,
            sp_name_qualifier,
            allow_create,
        })
    }

    /// A policy with only a format; `allow_create` defaults to true.
    pub fn with_format(format: impl Into<String>) -> Result<Self, ConfigError> {
        Self::new(format, None, true)
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn sp_name_qualifier(&self) -> Option<&str> {
        self.sp_name_qualifier.as_deref()
    }

    /// Whether the IdP may create a new identifier for the subject.
    ///
    /// Sent with the request; a response is not checked against it.
    pub fn allow_create(&self) -> bool {
        self.allow_create
    }

    /// True when any NameID format is acceptable.
    pub fn is_unspecified(&self) -> bool {
        let f = self.format.trim();
        f == ns::NAMEID_UNSPECIFIED || f == "unspecified"
    }
}

/// Default tolerance between the IdP's clock and ours.
pub const DEFAULT_CLOCK_SKEW_SECS: i64 = 300;

/// What the relying party trusts and expects from its identity provider.
#[derive(Debug, Clone)]
pub struct TrustConfiguration {
    idp_entity_id: String,
    sp_entity_id: String,
    acs_url: String,
    clock_skew: Duration,
    require_signed_assertions: bool,
    allow_sha1: bool,
    keys: KeysManager,
}

impl TrustConfiguration {
    /// Build a configuration trusting the given DER certificates.
    ///
    /// A certificate may be the IdP's own signing certificate or a CA that
    /// issued it.
    pub fn new(
        idp_entity_id: impl Into<String>,
        sp_entity_id: impl Into<String>,
        acs_url: impl Into<String>,
        trusted_certificates: Vec<Vec<u8>>,
    ) -> Result<Self, ConfigError> {
        let idp_entity_id = non_empty(idp_entity_id.into(), ConfigError::EmptyIssuer)?;
        let sp_entity_id = non_empty(sp_entity_id.into(), ConfigError::EmptyAudience)?;
        let acs_url = non_empty(acs_url.into(), ConfigError::EmptyAcsUrl)?;
        if trusted_certificates.is_empty() {
            return Err(ConfigError::NoTrustedCredentials);
        }

        let mut keys = KeysManager::new();
        for der in trusted_certificates {
            keys.add_trusted_cert_key(der)
                .map_err(|e| ConfigError::InvalidCertificate(e.to_string()))?;
        }

        Ok(Self {
            idp_entity_id,
            sp_entity_id,
            acs_url,
            clock_skew: Duration::seconds(DEFAULT_CLOCK_SKEW_SECS),
            require_signed_assertions: false,
            allow_sha1: false,
            keys,
        })
    }

    /// Build a configuration from a PEM bundle of trusted certificates.
    pub fn from_pem(
        idp_entity_id: impl Into<String>,
        sp_entity_id: impl Into<String>,
        acs_url: impl Into<String>,
        certificates_pem: &str,
    ) -> Result<Self, ConfigError> {
        let certs = loader::certificates_from_pem_bundle(certificates_pem.as_bytes())
            .map_err(|e| ConfigError::InvalidCertificate(e.to_string()))?;
        Self::new(idp_entity_id, sp_entity_id, acs_url, certs)
    }

    pub fn with_clock_skew(mut self, skew: Duration) -> Result<Self, ConfigError> {
        if skew < Duration::zero() {
            return Err(ConfigError::NegativeSkew);
        }
        self.clock_skew = skew;
        Ok(self)
    }

    /// Require every assertion to carry its own signature, even inside a
    /// signed response.
    pub fn with_require_signed_assertions(mut self, require: bool) -> Self {
        self.require_signed_assertions = require;
        self
    }

    /// Accept SHA-1 digests and signatures.
    pub fn with_allow_sha1(mut self, allow: bool) -> Self {
        self.allow_sha1 = allow;
        self
    }

    /// Also trust a bare public key, looked up by `<KeyName>` or tried
    /// when nothing else matches.
    pub fn with_trusted_key(mut self, key: Key) -> Self {
        self.keys.add_key(key);
        self
    }

    /// Make an intermediate CA available for chain building. It is not
    /// trusted by itself.
    pub fn with_intermediate_certificate(mut self, der: Vec<u8>) -> Self {
        self.keys.add_untrusted_cert(der);
        self
    }

    pub fn idp_entity_id(&self) -> &str {
        &self.idp_entity_id
    }

    /// The SP entity ID, expected in `<Audience>`.
    pub fn sp_entity_id(&self) -> &str {
        &self.sp_entity_id
    }

    /// The assertion consumer service URL, expected as `Recipient` and
    /// `Destination`.
    pub fn acs_url(&self) -> &str {
        &self.acs_url
    }

    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    pub fn require_signed_assertions(&self) -> bool {
        self.require_signed_assertions
    }

    pub fn allow_sha1(&self) -> bool {
        self.allow_sha1
    }

    pub fn keys_manager(&self) -> &KeysManager {
        &self.keys
    }
}

fn non_empty(value: String, err: ConfigError) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        Err(err)
    } else {
        Ok(value)
    }
}
