#![allow(dead_code)]

//! Builds and signs SAML responses for the integration tests.

use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use samlkoll_core::{algorithm, ns};
use samlkoll_dsig::DsigContext;
use samlkoll_keys::{loader, KeysManager};
use samlkoll_saml::{NameIdPolicy, TrustConfiguration};

pub const IDP: &str = "https://idp.example.org";
pub const SP: &str = "https://sp.example.com";
pub const ACS: &str = "https://sp.example.com/acs";
pub const REQUEST_ID: &str = "_req-8d1c";

pub const IDP_CERT: &str = include_str!("../fixtures/idp-cert.pem");
pub const IDP_KEY: &str = include_str!("../fixtures/idp-key.pem");
pub const CA_CERT: &str = include_str!("../fixtures/ca-cert.pem");
pub const LEAF_CERT: &str = include_str!("../fixtures/leaf-cert.pem");
pub const LEAF_KEY: &str = include_str!("../fixtures/leaf-key.pem");
pub const ROGUE_CERT: &str = include_str!("../fixtures/rogue-cert.pem");
pub const ROGUE_KEY: &str = include_str!("../fixtures/rogue-key.pem");
pub const RSA_CERT: &str = include_str!("../fixtures/rsa-cert.pem");
pub const RSA_KEY: &str = include_str!("../fixtures/rsa-key.pem");

/// 2030-06-01T12:00:00Z, inside every fixture certificate's validity.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap()
}

pub fn trust_pem(pem: &str) -> TrustConfiguration {
    TrustConfiguration::from_pem(IDP, SP, ACS, pem).unwrap()
}

pub fn trust() -> TrustConfiguration {
    trust_pem(IDP_CERT)
}

pub fn persistent_policy() -> NameIdPolicy {
    NameIdPolicy::new(ns::NAMEID_PERSISTENT, Some(SP.to_owned()), true).unwrap()
}

/// Private keys the builder signs with, named `idp`, `leaf`, `rogue`, `rsa`.
pub fn signing_keys() -> KeysManager {
    let mut keys = KeysManager::new();
    for (name, pem) in [
        ("idp", IDP_KEY),
        ("leaf", LEAF_KEY),
        ("rogue", ROGUE_KEY),
        ("rsa", RSA_KEY),
    ] {
        keys.add_key(loader::load_private_key_pem(pem.as_bytes()).unwrap().with_name(name));
    }
    keys
}

/// How one element gets signed.
#[derive(Debug, Clone)]
pub struct Signer {
    pub key_name: &'static str,
    pub signature_method: &'static str,
    pub digest_method: &'static str,
    /// PEM certificate to carry in `<ds:X509Certificate>`.
    pub certificate: Option<&'static str>,
}

impl Signer {
    pub fn ecdsa(key_name: &'static str) -> Self {
        Self {
            key_name,
            signature_method: algorithm::ECDSA_SHA256,
            digest_method: algorithm::SHA256,
            certificate: None,
        }
    }

    pub fn rsa() -> Self {
        Self {
            key_name: "rsa",
            signature_method: algorithm::RSA_SHA256,
            digest_method: algorithm::SHA256,
            certificate: None,
        }
    }

    pub fn with_certificate(mut self, pem: &'static str) -> Self {
        self.certificate = Some(pem);
        self
    }

    fn template(&self, id: &str) -> String {
        let x509 = match self.certificate {
            Some(pem) => {
                let der = loader::certificate_der_from_pem(pem.as_bytes()).unwrap();
                format!(
                    "<ds:X509Data><ds:X509Certificate>{}</ds:X509Certificate></ds:X509Data>",
                    base64::engine::general_purpose::STANDARD.encode(der)
                )
            }
            None => String::new(),
        };
        format!(
            r##"<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:SignedInfo><ds:CanonicalizationMethod Algorithm="{c14n}"/><ds:SignatureMethod Algorithm="{sm}"/><ds:Reference URI="#{id}"><ds:Transforms><ds:Transform Algorithm="{env}"/><ds:Transform Algorithm="{c14n}"/></ds:Transforms><ds:DigestMethod Algorithm="{dm}"/><ds:DigestValue></ds:DigestValue></ds:Reference></ds:SignedInfo><ds:SignatureValue></ds:SignatureValue><ds:KeyInfo><ds:KeyName>{name}</ds:KeyName>{x509}</ds:KeyInfo></ds:Signature>"##,
            c14n = algorithm::EXC_C14N,
            env = algorithm::ENVELOPED_SIGNATURE,
            sm = self.signature_method,
            dm = self.digest_method,
            name = self.key_name,
        )
    }
}

/// An assertion appended after the main one, sharing its subject and
/// validity window.
#[derive(Debug, Clone)]
pub struct ExtraAssertion {
    pub id: String,
    pub audience: String,
    pub recipient: String,
    pub attributes: Vec<(&'static str, &'static str)>,
}

impl ExtraAssertion {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.into(),
            audience: SP.into(),
            recipient: ACS.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: &'static str, value: &'static str) -> Self {
        self.attributes.push((name, value));
        self
    }
}

/// A response valid at [`now`] for [`trust`]: one assertion plus any
/// `extra_assertions`.
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    pub response_id: String,
    pub assertion_id: String,
    pub issuer: String,
    pub destination: Option<String>,
    pub in_response_to: Option<String>,
    pub status: String,
    pub recipient: String,
    pub audience: String,
    pub name_id: String,
    pub name_id_format: String,
    pub sp_name_qualifier: String,
    pub not_before: String,
    pub not_on_or_after: String,
    pub sign_response: Option<Signer>,
    pub sign_assertion: Option<Signer>,
    pub extra_assertions: Vec<ExtraAssertion>,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self {
            response_id: "_resp-1".into(),
            assertion_id: "_assert-1".into(),
            issuer: IDP.into(),
            destination: Some(ACS.into()),
            in_response_to: Some(REQUEST_ID.into()),
            status: ns::STATUS_SUCCESS.into(),
            recipient: ACS.into(),
            audience: SP.into(),
            name_id: "user-1".into(),
            name_id_format: ns::NAMEID_PERSISTENT.into(),
            sp_name_qualifier: SP.into(),
            not_before: "2030-06-01T11:55:00Z".into(),
            not_on_or_after: "2030-06-01T12:05:00Z".into(),
            sign_response: Some(Signer::ecdsa("idp")),
            sign_assertion: None,
            extra_assertions: Vec::new(),
        }
    }

    pub fn unsolicited(mut self) -> Self {
        self.in_response_to = None;
        self
    }

    pub fn assertion_signed_by(mut self, signer: Signer) -> Self {
        self.sign_response = None;
        self.sign_assertion = Some(signer);
        self
    }

    pub fn with_assertion(mut self, extra: ExtraAssertion) -> Self {
        self.extra_assertions.push(extra);
        self
    }

    fn in_response_to_attr(&self) -> String {
        self.in_response_to
            .as_ref()
            .map(|r| format!(r#" InResponseTo="{r}""#))
            .unwrap_or_default()
    }

    fn subject_and_conditions(&self, recipient: &str, audience: &str) -> String {
        format!(
            r#"<saml:Subject><saml:NameID Format="{format}" SPNameQualifier="{qualifier}">{name_id}</saml:NameID><saml:SubjectConfirmation Method="urn:oasis:names:tc:SAML:2.0:cm:bearer"><saml:SubjectConfirmationData Recipient="{recipient}" NotOnOrAfter="{noa}"{irt}/></saml:SubjectConfirmation></saml:Subject><saml:Conditions NotBefore="{nb}" NotOnOrAfter="{noa}"><saml:AudienceRestriction><saml:Audience>{audience}</saml:Audience></saml:AudienceRestriction></saml:Conditions>"#,
            format = self.name_id_format,
            qualifier = self.sp_name_qualifier,
            name_id = self.name_id,
            irt = self.in_response_to_attr(),
            nb = self.not_before,
            noa = self.not_on_or_after,
        )
    }

    fn extra_assertion(&self, extra: &ExtraAssertion) -> String {
        let attributes: String = extra
            .attributes
            .iter()
            .map(|(name, value)| {
                format!(
                    r#"<saml:Attribute Name="{name}"><saml:AttributeValue>{value}</saml:AttributeValue></saml:Attribute>"#
                )
            })
            .collect();
        format!(
            r#"<saml:Assertion ID="{id}" Version="2.0" IssueInstant="2030-06-01T11:59:00Z"><saml:Issuer>{issuer}</saml:Issuer>{subject}<saml:AttributeStatement>{attributes}</saml:AttributeStatement></saml:Assertion>"#,
            id = extra.id,
            issuer = self.issuer,
            subject = self.subject_and_conditions(&extra.recipient, &extra.audience),
        )
    }

    pub fn template(&self) -> String {
        let destination = self
            .destination
            .as_ref()
            .map(|d| format!(r#" Destination="{d}""#))
            .unwrap_or_default();
        let in_response_to = self.in_response_to_attr();
        let response_sig = self
            .sign_response
            .as_ref()
            .map(|s| s.template(&self.response_id))
            .unwrap_or_default();
        let assertion_sig = self
            .sign_assertion
            .as_ref()
            .map(|s| s.template(&self.assertion_id))
            .unwrap_or_default();
        let extra: String = self
            .extra_assertions
            .iter()
            .map(|e| self.extra_assertion(e))
            .collect();

        format!(
            r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="{rid}" Version="2.0" IssueInstant="2030-06-01T11:59:00Z"{destination}{in_response_to}><saml:Issuer>{issuer}</saml:Issuer>{response_sig}<samlp:Status><samlp:StatusCode Value="{status}"/></samlp:Status><saml:Assertion ID="{aid}" Version="2.0" IssueInstant="2030-06-01T11:59:00Z"><saml:Issuer>{issuer}</saml:Issuer>{assertion_sig}{subject}<saml:AuthnStatement AuthnInstant="2030-06-01T11:58:30Z" SessionIndex="_sess-1"/><saml:AttributeStatement><saml:Attribute Name="mail"><saml:AttributeValue>user1@example.org</saml:AttributeValue></saml:Attribute><saml:Attribute Name="groups"><saml:AttributeValue>staff</saml:AttributeValue><saml:AttributeValue>admins</saml:AttributeValue></saml:Attribute></saml:AttributeStatement></saml:Assertion>{extra}</samlp:Response>"#,
            rid = self.response_id,
            aid = self.assertion_id,
            issuer = self.issuer,
            status = self.status,
            subject = self.subject_and_conditions(&self.recipient, &self.audience),
        )
    }

    /// The signed response text.
    pub fn build(&self) -> String {
        let template = self.template();
        if self.sign_response.is_none() && self.sign_assertion.is_none() {
            return template;
        }
        let ctx = DsigContext::new(signing_keys()).with_allow_sha1(true);
        samlkoll_dsig::sign::sign(&ctx, &template).unwrap()
    }
}

/// Insert `markup` right after the response `<Issuer>`.
pub fn insert_after_issuer(xml: &str, markup: &str) -> String {
    let end = xml.find("</saml:Issuer>").unwrap() + "</saml:Issuer>".len();
    format!("{}{markup}{}", &xml[..end], &xml[end..])
}

/// Remove the first `<ds:SignatureValue>` element, content and all.
pub fn strip_signature_value(xml: &str) -> String {
    let start = xml.find("<ds:SignatureValue>").unwrap();
    let end_tag = "</ds:SignatureValue>";
    let end = xml[start..].find(end_tag).unwrap() + start + end_tag.len();
    format!("{}{}", &xml[..start], &xml[end..])
}
