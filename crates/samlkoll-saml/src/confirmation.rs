#![forbid(unsafe_code)]

//! Bearer subject confirmation.

use crate::error::{FailureKind, ValidationFailure};
use crate::model::SubjectConfirmation;
use chrono::{DateTime, Duration, Utc};
use samlkoll_core::ns;

/// Find a bearer confirmation that holds at `now`.
///
/// A confirmation holds when its `Recipient` equals `expected_recipient`
/// exactly, its `NotOnOrAfter` is present and not past (widened by `skew`),
/// its `NotBefore`, if any, has been reached, and its `InResponseTo`
/// matches the request we issued. For an unsolicited response
/// (`expected_in_response_to` is `None`) a confirmation must not name a
/// request. One holding confirmation is enough.
pub fn check_confirmation<'a>(
    confirmations: &'a [SubjectConfirmation],
    expected_recipient: &str,
    expected_in_response_to: Option<&str>,
    now: DateTime<Utc>,
    skew: Duration,
) -> Result<&'a SubjectConfirmation, ValidationFailure> {
    let mut reasons = Vec::with_capacity(confirmations.len());
    for (i, confirmation) in confirmations.iter().enumerate() {
        match check_one(
            confirmation,
            expected_recipient,
            expected_in_response_to,
            now,
            skew,
        ) {
            Ok(()) => return Ok(confirmation),
            Err(reason) => reasons.push(format!("confirmation {}: {reason}", i + 1)),
        }
    }

    let detail = if reasons.is_empty() {
        "subject has no SubjectConfirmation".to_owned()
    } else {
        reasons.join("; ")
    };
    Err(ValidationFailure::new(FailureKind::NoValidConfirmation, detail))
}

fn check_one(
    confirmation: &SubjectConfirmation,
    expected_recipient: &str,
    expected_in_response_to: Option<&str>,
    now: DateTime<Utc>,
    skew: Duration,
) -> Result<(), String> {
    if confirmation.method != ns::CM_BEARER {
        return Err(format!("method {} is not bearer", confirmation.method));
    }
    let data = confirmation
        .data
        .as_ref()
        .ok_or("no SubjectConfirmationData")?;

    match data.recipient.as_deref() {
        Some(r) if r == expected_recipient => {}
        Some(r) => return Err(format!("recipient {r} is not {expected_recipient}")),
        None => return Err("no Recipient".into()),
    }

    let noa = data.not_on_or_after.ok_or("no NotOnOrAfter")?;
    if now > noa + skew {
        return Err(format!("expired at {noa}"));
    }
    if let Some(nb) = data.not_before {
        if now < nb - skew {
            return Err(format!("not valid before {nb}"));
        }
    }

    match (expected_in_response_to, data.in_response_to.as_deref()) {
        (Some(expected), Some(got)) if expected == got => Ok(()),
        (Some(expected), Some(got)) => Err(format!("InResponseTo {got} is not {expected}")),
        (Some(expected), None) => Err(format!("no InResponseTo, expected {expected}")),
        (None, Some(got)) => Err(format!("InResponseTo {got} on an unsolicited response")),
        (None, None) => Ok(()),
    }
}
