#![forbid(unsafe_code)]

//! NameID policy matching.

use crate::config::NameIdPolicy;
use crate::error::{FailureKind, ValidationFailure};
use crate::model::NameId;

/// Check a returned NameID against the policy the request carried.
///
/// An `unspecified` policy accepts any NameID. Otherwise the formats must
/// be equal, a missing `Format` attribute counting as `unspecified`, and a
/// non-empty policy SP qualifier must equal the NameID's.
pub fn match_policy(name_id: &NameId, policy: &NameIdPolicy) -> Result<(), ValidationFailure> {
    if policy.is_unspecified() {
        return Ok(());
    }

    if name_id.effective_format() != policy.format() {
        return Err(ValidationFailure::new(
            FailureKind::FormatMismatch,
            format!(
                "NameID format {} is not {}",
                name_id.effective_format(),
                policy.format()
            ),
        ));
    }

    match policy.sp_name_qualifier().filter(|q| !q.is_empty()) {
        Some(expected) if name_id.sp_name_qualifier.as_deref() != Some(expected) => {
            Err(ValidationFailure::new(
                FailureKind::QualifierMismatch,
                format!(
                    "SPNameQualifier {} is not {expected}",
                    name_id.sp_name_qualifier.as_deref().unwrap_or("(absent)")
                ),
            ))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use samlkoll_core::ns;

    fn name_id(format: Option<&str>, qualifier: Option<&str>) -> NameId {
        NameId {
            value: "u-1234".into(),
            format: format.map(str::to_owned),
            name_qualifier: None,
            sp_name_qualifier: qualifier.map(str::to_owned),
        }
    }

    #[test]
    fn qualifier_mismatch() {
        let policy =
            NameIdPolicy::new(ns::NAMEID_PERSISTENT, Some("sp-qualifier".into()), true).unwrap();
        let err = match_policy(&name_id(Some(ns::NAMEID_PERSISTENT), Some("other")), &policy)
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::QualifierMismatch);

        let err =
            match_policy(&name_id(Some(ns::NAMEID_PERSISTENT), None), &policy).unwrap_err();
        assert_eq!(err.kind, FailureKind::QualifierMismatch);

        assert!(match_policy(
            &name_id(Some(ns::NAMEID_PERSISTENT), Some("sp-qualifier")),
            &policy
        )
        .is_ok());
    }

    #[test]
    fn unspecified_policy_matches_anything() {
        let policy = NameIdPolicy::with_format("unspecified").unwrap();
        assert!(match_policy(&name_id(Some(ns::NAMEID_TRANSIENT), None), &policy).is_ok());

        let policy =
            NameIdPolicy::new(ns::NAMEID_UNSPECIFIED, Some("sp-qualifier".into()), false).unwrap();
        assert!(match_policy(&name_id(Some(ns::NAMEID_EMAIL), Some("x")), &policy).is_ok());
    }

    #[test]
    fn format_mismatch() {
        let policy = NameIdPolicy::with_format(ns::NAMEID_PERSISTENT).unwrap();
        let err = match_policy(&name_id(Some(ns::NAMEID_TRANSIENT), None), &policy).unwrap_err();
        assert_eq!(err.kind, FailureKind::FormatMismatch);
    }

    #[test]
    fn absent_format_is_unspecified() {
        let policy = NameIdPolicy::with_format(ns::NAMEID_EMAIL).unwrap();
        let err = match_policy(&name_id(None, None), &policy).unwrap_err();
        assert_eq!(err.kind, FailureKind::FormatMismatch);
        assert!(err.detail.contains(ns::NAMEID_UNSPECIFIED));
    }

    #[test]
    fn empty_qualifier_is_not_checked() {
        let policy = NameIdPolicy::new(ns::NAMEID_PERSISTENT, Some(String::new()), true).unwrap();
        assert!(match_policy(&name_id(Some(ns::NAMEID_PERSISTENT), Some("any")), &policy).is_ok());
    }
}
