#![forbid(unsafe_code)]

//! Assertion validity window and audience restriction.

use crate::config::TrustConfiguration;
use crate::error::{FailureKind, ValidationFailure};
use crate::model::Assertion;
use chrono::{DateTime, Duration, Utc};

/// Check the assertion's `<Conditions>` at `now`.
///
/// The accepted window is `[NotBefore - skew, NotOnOrAfter + skew]`, both
/// ends included. An assertion issued more than `skew` in the future is not
/// yet valid. Without any `<AudienceRestriction>` every audience is
/// accepted; otherwise the SP entity ID must appear in one of them.
pub fn check_conditions(
    assertion: &Assertion,
    now: DateTime<Utc>,
    trust: &TrustConfiguration,
) -> Result<(), ValidationFailure> {
    let skew = trust.clock_skew();

    if assertion.issue_instant > now + skew {
        return Err(ValidationFailure::new(
            FailureKind::NotYetValid,
            format!(
                "assertion {} issued in the future ({})",
                assertion.id, assertion.issue_instant
            ),
        ));
    }

    let Some(conditions) = &assertion.conditions else {
        return Ok(());
    };
    check_window(
        conditions.not_before,
        conditions.not_on_or_after,
        now,
        skew,
        &format!("assertion {}", assertion.id),
    )?;

    if !conditions.audience_restrictions.is_empty()
        && !conditions
            .audience_restrictions
            .iter()
            .any(|audiences| audiences.iter().any(|a| a == trust.sp_entity_id()))
    {
        return Err(ValidationFailure::new(
            FailureKind::AudienceMismatch,
            format!(
                "{} is not among the audiences {:?}",
                trust.sp_entity_id(),
                conditions.audience_restrictions
            ),
        ));
    }
    Ok(())
}

/// Check `now` against an optional `[not_before, not_on_or_after]` window
/// widened by `skew` on both sides.
pub(crate) fn check_window(
    not_before: Option<DateTime<Utc>>,
    not_on_or_after: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    skew: Duration,
    what: &str,
) -> Result<(), ValidationFailure> {
    if let Some(nb) = not_before {
        if now < nb - skew {
            return Err(ValidationFailure::new(
                FailureKind::NotYetValid,
                format!("{what} not valid before {nb}"),
            ));
        }
    }
    if let Some(noa) = not_on_or_after {
        if now > noa + skew {
            return Err(ValidationFailure::new(
                FailureKind::Expired,
                format!("{what} expired at {noa}"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Conditions;
    use chrono::TimeZone;

    fn t() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap()
    }

    fn assertion(audiences: Vec<Vec<String>>) -> Assertion {
        Assertion {
            id: "_a".into(),
            issue_instant: t(),
            issuer: "idp".into(),
            subject: None,
            conditions: Some(Conditions {
                not_before: Some(t() - Duration::minutes(5)),
                not_on_or_after: Some(t() + Duration::minutes(5)),
                audience_restrictions: audiences,
                one_time_use: false,
            }),
            authn_statements: vec![],
            attributes: vec![],
            has_signature: false,
        }
    }

    fn trust(skew: i64) -> TrustConfiguration {
        TrustConfiguration::from_pem(
            "idp",
            "https://sp.example.com",
            "https://sp.example.com/acs",
            include_str!("../tests/fixtures/idp-cert.pem"),
        )
        .unwrap()
        .with_clock_skew(Duration::seconds(skew))
        .unwrap()
    }

    #[test]
    fn window_is_closed_at_both_ends() {
        let skew = Duration::zero();
        let nb = Some(t() - Duration::minutes(5));
        let noa = Some(t() + Duration::minutes(5));
        for now in [t() - Duration::minutes(5), t(), t() + Duration::minutes(5)] {
            assert!(check_window(nb, noa, now, skew, "a").is_ok());
        }
    }

    #[test]
    fn one_second_past_expiry_without_skew() {
        let now = t() + Duration::minutes(5) + Duration::seconds(1);
        let err = check_window(None, Some(t() + Duration::minutes(5)), now, Duration::zero(), "a")
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::Expired);
    }

    #[test]
    fn skew_widens_both_sides() {
        let skew = Duration::seconds(30);
        let nb = Some(t());
        let noa = Some(t() + Duration::minutes(1));
        assert!(check_window(nb, noa, t() - Duration::seconds(30), skew, "a").is_ok());
        assert_eq!(
            check_window(nb, noa, t() - Duration::seconds(31), skew, "a")
                .unwrap_err()
                .kind,
            FailureKind::NotYetValid
        );
        assert!(check_window(nb, noa, t() + Duration::seconds(90), skew, "a").is_ok());
        assert_eq!(
            check_window(nb, noa, t() + Duration::seconds(91), skew, "a")
                .unwrap_err()
                .kind,
            FailureKind::Expired
        );
    }

    #[test]
    fn open_window_always_passes() {
        assert!(check_window(None, None, t(), Duration::zero(), "a").is_ok());
    }

    #[test]
    fn audience_must_match_one_restriction() {
        let trust = trust(0);
        let ok = assertion(vec![
            vec!["https://other.example.com".into()],
            vec!["https://sp.example.com".into()],
        ]);
        assert!(check_conditions(&ok, t(), &trust).is_ok());

        let bad = assertion(vec![vec!["https://other.example.com".into()]]);
        assert_eq!(
            check_conditions(&bad, t(), &trust).unwrap_err().kind,
            FailureKind::AudienceMismatch
        );
    }

    #[test]
    fn no_audience_restriction_accepts_any() {
        assert!(check_conditions(&assertion(vec![]), t(), &trust(0)).is_ok());
    }

    #[test]
    fn expired_assertion() {
        let a = assertion(vec![]);
        let late = t() + Duration::minutes(5) + Duration::seconds(1);
        assert_eq!(
            check_conditions(&a, late, &trust(0)).unwrap_err().kind,
            FailureKind::Expired
        );
        assert!(check_conditions(&a, late, &trust(1)).is_ok());
    }

    #[test]
    fn issued_in_the_future() {
        let mut a = assertion(vec![]);
        a.issue_instant = t() + Duration::minutes(10);
        a.conditions = None;
        assert_eq!(
            check_conditions(&a, t(), &trust(300)).unwrap_err().kind,
            FailureKind::NotYetValid
        );
    }
}
