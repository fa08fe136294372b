#![forbid(unsafe_code)]

//! The response validation pipeline.
//!
//! A response moves through the stages of [`ValidationStage`] in order and
//! stops at the first failure. Nothing about the subject is returned unless
//! every stage passed.

use crate::conditions::check_conditions;
use crate::config::{NameIdPolicy, TrustConfiguration};
use crate::confirmation::check_confirmation;
use crate::error::{FailureKind, ValidationFailure};
use crate::model::{Assertion, Response};
use crate::name_id::match_policy;
use crate::parse::{parse_document, parse_response};
use crate::principal::AuthenticatedPrincipal;
use crate::replay::{InMemoryReplayCache, ReplayCache};
use crate::signature::verify_document;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of [`ResponseValidator::validate`].
pub type ValidationResult = Result<AuthenticatedPrincipal, ValidationFailure>;

/// How far a response got. A rejected response is reported by the
/// [`ValidationFailure`] of its result; the stage says what had passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationStage {
    Received,
    Decoded,
    SignatureVerified,
    ConditionsChecked,
    ConfirmationChecked,
    PolicyMatched,
    Accepted,
}

impl ValidationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Decoded => "decoded",
            Self::SignatureVerified => "signature_verified",
            Self::ConditionsChecked => "conditions_checked",
            Self::ConfirmationChecked => "confirmation_checked",
            Self::PolicyMatched => "policy_matched",
            Self::Accepted => "accepted",
        }
    }
}

impl fmt::Display for ValidationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validates responses from one identity provider.
///
/// Holds immutable configuration and a shared replay cache, so one
/// validator can serve any number of threads.
#[derive(Clone)]
pub struct ResponseValidator {
    trust: TrustConfiguration,
    replay: Arc<dyn ReplayCache>,
}

impl fmt::Debug for ResponseValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseValidator")
            .field("trust", &self.trust)
            .finish_non_exhaustive()
    }
}

impl ResponseValidator {
    /// A validator with a process-local replay cache.
    pub fn new(trust: TrustConfiguration) -> Self {
        Self {
            trust,
            replay: Arc::new(InMemoryReplayCache::new()),
        }
    }

    /// Use a shared replay cache, e.g. one backed by an external store.
    pub fn with_replay_cache(mut self, cache: Arc<dyn ReplayCache>) -> Self {
        self.replay = cache;
        self
    }

    pub fn trust(&self) -> &TrustConfiguration {
        &self.trust
    }

    /// Validate a decoded response at the current time.
    pub fn validate_now(
        &self,
        response: &[u8],
        policy: &NameIdPolicy,
        in_response_to: Option<&str>,
    ) -> ValidationResult {
        self.validate(response, policy, in_response_to, Utc::now())
    }

    /// Validate a decoded (not base64) response.
    ///
    /// `in_response_to` is the ID of the request we sent, `None` for an
    /// IdP-initiated response.
    pub fn validate(
        &self,
        response: &[u8],
        policy: &NameIdPolicy,
        in_response_to: Option<&str>,
        now: DateTime<Utc>,
    ) -> ValidationResult {
        self.validate_staged(response, policy, in_response_to, now).1
    }

    /// Like [`validate`](Self::validate), also returning the last stage
    /// passed.
    pub fn validate_staged(
        &self,
        response: &[u8],
        policy: &NameIdPolicy,
        in_response_to: Option<&str>,
        now: DateTime<Utc>,
    ) -> (ValidationStage, ValidationResult) {
        let mut stage = ValidationStage::Received;
        let result = self.run(response, policy, in_response_to, now, &mut stage);
        match &result {
            Ok(principal) => info!(
                assertion_id = %principal.assertion_id,
                issuer = %principal.issuer,
                "SAML response accepted"
            ),
            Err(failure) => warn!(
                kind = %failure.kind,
                passed = %stage,
                detail = %failure.detail,
                "SAML response rejected"
            ),
        }
        (stage, result)
    }

    fn run(
        &self,
        bytes: &[u8],
        policy: &NameIdPolicy,
        in_response_to: Option<&str>,
        now: DateTime<Utc>,
        stage: &mut ValidationStage,
    ) -> ValidationResult {
        let doc = parse_document(bytes)?;
        let response = parse_response(&doc)?;
        self.check_envelope(&response, in_response_to)?;
        advance(stage, ValidationStage::Decoded);

        let report = verify_document(&doc, &self.trust, now)?;
        debug!(
            response_signed = report.response_signed,
            signed_assertions = report.signed_assertions.len(),
            keys = ?report.key_names,
            "signatures verified"
        );
        advance(stage, ValidationStage::SignatureVerified);

        for assertion in &response.assertions {
            check_conditions(assertion, now, &self.trust)?;
        }
        advance(stage, ValidationStage::ConditionsChecked);

        let mut expiries = Vec::with_capacity(response.assertions.len());
        for assertion in &response.assertions {
            let subject = assertion.subject.as_ref().ok_or_else(|| {
                ValidationFailure::malformed_response(format!(
                    "assertion {} has no Subject",
                    assertion.id
                ))
            })?;
            let confirmation = check_confirmation(
                &subject.confirmations,
                self.trust.acs_url(),
                in_response_to,
                now,
                self.trust.clock_skew(),
            )?;
            let confirmed_until = confirmation.data.as_ref().and_then(|d| d.not_on_or_after);
            let conditions_until = assertion.conditions.as_ref().and_then(|c| c.not_on_or_after);
            expiries.push(confirmed_until.max(conditions_until).unwrap_or(now));
        }
        advance(stage, ValidationStage::ConfirmationChecked);

        for assertion in &response.assertions {
            if let Some(name_id) = assertion.subject.as_ref().and_then(|s| s.name_id.as_ref()) {
                match_policy(name_id, policy)?;
            }
        }
        advance(stage, ValidationStage::PolicyMatched);

        let principal = build_principal(&response)?;

        let seen: Vec<(&str, DateTime<Utc>)> = response
            .assertions
            .iter()
            .zip(expiries)
            .map(|(assertion, until)| (assertion.id.as_str(), until + self.trust.clock_skew()))
            .collect();
        if let Err(id) = self.replay.check_and_insert_all(&seen, now) {
            return Err(ValidationFailure::new(
                FailureKind::ReplayDetected,
                format!("assertion {id} was already used"),
            ));
        }
        advance(stage, ValidationStage::Accepted);
        Ok(principal)
    }

    /// Checks on the response envelope that need no signature.
    fn check_envelope(
        &self,
        response: &Response,
        in_response_to: Option<&str>,
    ) -> Result<(), ValidationFailure> {
        if !response.status.is_success() {
            let status = &response.status;
            let mut detail = format!("status {}", status.code);
            if let Some(second) = &status.second_level_code {
                detail.push_str(&format!(" / {second}"));
            }
            if let Some(message) = &status.message {
                detail.push_str(&format!(": {message}"));
            }
            return Err(ValidationFailure::malformed_response(detail));
        }

        if let Some(destination) = &response.destination {
            if destination != self.trust.acs_url() {
                return Err(ValidationFailure::malformed_response(format!(
                    "Destination {destination} is not {}",
                    self.trust.acs_url()
                )));
            }
        }

        match (in_response_to, response.in_response_to.as_deref()) {
            (Some(expected), Some(got)) if expected != got => {
                return Err(ValidationFailure::new(
                    FailureKind::NoValidConfirmation,
                    format!("response InResponseTo {got} is not {expected}"),
                ));
            }
            (None, Some(got)) => {
                return Err(ValidationFailure::new(
                    FailureKind::NoValidConfirmation,
                    format!("response InResponseTo {got} but no request is pending"),
                ));
            }
            _ => {}
        }

        let expected_issuer = self.trust.idp_entity_id();
        if let Some(issuer) = &response.issuer {
            if issuer != expected_issuer {
                return Err(issuer_mismatch(issuer, expected_issuer));
            }
        }
        for assertion in &response.assertions {
            if assertion.issuer != expected_issuer {
                return Err(issuer_mismatch(&assertion.issuer, expected_issuer));
            }
        }

        if response.encrypted_assertions > 0 {
            return Err(ValidationFailure::malformed_response(
                "encrypted assertions are not supported",
            ));
        }
        if response.assertions.is_empty() {
            return Err(ValidationFailure::malformed_response(
                "response contains no assertion",
            ));
        }
        Ok(())
    }
}

fn advance(stage: &mut ValidationStage, next: ValidationStage) {
    debug!(from = %stage, to = %next, "validation stage passed");
    *stage = next;
}

fn issuer_mismatch(got: &str, expected: &str) -> ValidationFailure {
    ValidationFailure::malformed_response(format!("issuer mismatch: {got} is not {expected}"))
}

fn build_principal(response: &Response) -> Result<AuthenticatedPrincipal, ValidationFailure> {
    let first: &Assertion = response
        .assertions
        .first()
        .ok_or_else(|| ValidationFailure::malformed_response("response contains no assertion"))?;
    let name_id = first
        .subject
        .as_ref()
        .and_then(|s| s.name_id.clone())
        .ok_or_else(|| {
            ValidationFailure::malformed_response(format!("assertion {} has no NameID", first.id))
        })?;

    let mut attributes: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for attribute in response.assertions.iter().flat_map(|a| &a.attributes) {
        attributes
            .entry(attribute.name.clone())
            .or_default()
            .extend(attribute.values.iter().cloned());
    }

    let authn = first.authn_statements.first();
    Ok(AuthenticatedPrincipal {
        name_id,
        attributes,
        session_index: authn.and_then(|s| s.session_index.clone()),
        issuer: first.issuer.clone(),
        assertion_id: first.id.clone(),
        authn_instant: authn.map(|s| s.authn_instant),
        session_not_on_or_after: authn.and_then(|s| s.session_not_on_or_after),
    })
}
