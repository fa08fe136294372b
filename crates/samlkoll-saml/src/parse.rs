#![forbid(unsafe_code)]

//! Reading a `<samlp:Response>` tree into the model.
//!
//! Only direct children are looked at (assertions are children of the
//! response, signatures children of what they sign), so the elements
//! read here are the ones whose signatures get checked.

use crate::error::ValidationFailure;
use crate::model::*;
use chrono::{DateTime, Utc};
use samlkoll_core::ns::{self, attr, saml};
use samlkoll_xml::document::{child_elements, element_text, find_child_element, is_element};
use roxmltree::Node;

type Result<T> = std::result::Result<T, ValidationFailure>;

fn malformed(detail: impl Into<String>) -> ValidationFailure {
    ValidationFailure::malformed_response(detail)
}

fn required_attr<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str> {
    node.attribute(name).ok_or_else(|| {
        malformed(format!(
            "{} is missing attribute {name}",
            node.tag_name().name()
        ))
    })
}

fn optional_string(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.attribute(name).map(str::to_owned)
}

/// Parse an `xs:dateTime` value.
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| malformed(format!("invalid dateTime {value:?}: {e}")))
}

fn optional_instant(node: Node<'_, '_>, name: &str) -> Result<Option<DateTime<Utc>>> {
    node.attribute(name).map(parse_instant).transpose()
}

fn has_signature(node: Node<'_, '_>) -> bool {
    find_child_element(node, ns::DSIG, ns::node::SIGNATURE).is_some()
}

fn issuer_of(node: Node<'_, '_>) -> Option<String> {
    find_child_element(node, ns::SAML, saml::ISSUER).map(element_text)
}

fn check_version(node: Node<'_, '_>) -> Result<()> {
    match required_attr(node, attr::VERSION)? {
        "2.0" => Ok(()),
        v => Err(malformed(format!("unsupported SAML version {v}"))),
    }
}

/// Parse response bytes into a tree.
pub fn parse_document(bytes: &[u8]) -> Result<roxmltree::Document<'_>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| malformed(format!("response is not UTF-8: {e}")))?;
    samlkoll_xml::parse(text).map_err(|e| malformed(e.to_string()))
}

/// Read the document element as a SAML response.
pub fn parse_response(doc: &roxmltree::Document<'_>) -> Result<Response> {
    let root = doc.root_element();
    if !is_element(&root, ns::SAMLP, saml::RESPONSE) {
        return Err(malformed(format!(
            "document element is {{{}}}{}, not a samlp:Response",
            root.tag_name().namespace().unwrap_or(""),
            root.tag_name().name()
        )));
    }
    check_version(root)?;

    let status_node = find_child_element(root, ns::SAMLP, saml::STATUS)
        .ok_or_else(|| malformed("Response has no Status"))?;

    Ok(Response {
        id: required_attr(root, attr::ID)?.to_owned(),
        issue_instant: parse_instant(required_attr(root, attr::ISSUE_INSTANT)?)?,
        destination: optional_string(root, attr::DESTINATION),
        in_response_to: optional_string(root, attr::IN_RESPONSE_TO),
        issuer: issuer_of(root),
        status: parse_status(status_node)?,
        assertions: child_elements(root, ns::SAML, saml::ASSERTION)
            .map(parse_assertion)
            .collect::<Result<_>>()?,
        encrypted_assertions: child_elements(root, ns::SAML, saml::ENCRYPTED_ASSERTION).count(),
        has_signature: has_signature(root),
    })
}

fn parse_status(node: Node<'_, '_>) -> Result<Status> {
    let code_node = find_child_element(node, ns::SAMLP, saml::STATUS_CODE)
        .ok_or_else(|| malformed("Status has no StatusCode"))?;
    Ok(Status {
        code: required_attr(code_node, attr::VALUE)?.to_owned(),
        second_level_code: find_child_element(code_node, ns::SAMLP, saml::STATUS_CODE)
            .and_then(|n| optional_string(n, attr::VALUE)),
        message: find_child_element(node, ns::SAMLP, saml::STATUS_MESSAGE).map(element_text),
    })
}

/// Read one `<saml:Assertion>` element.
pub fn parse_assertion(node: Node<'_, '_>) -> Result<Assertion> {
    check_version(node)?;
    let id = required_attr(node, attr::ID)?.to_owned();
    let issuer = issuer_of(node).ok_or_else(|| malformed(format!("assertion {id} has no Issuer")))?;

    let mut attributes = Vec::new();
    for statement in child_elements(node, ns::SAML, saml::ATTRIBUTE_STATEMENT) {
        for a in child_elements(statement, ns::SAML, saml::ATTRIBUTE) {
            attributes.push(Attribute {
                name: required_attr(a, attr::NAME)?.to_owned(),
                values: child_elements(a, ns::SAML, saml::ATTRIBUTE_VALUE)
                    .map(element_text)
                    .collect(),
            });
        }
    }

    Ok(Assertion {
        issue_instant: parse_instant(required_attr(node, attr::ISSUE_INSTANT)?)?,
        issuer,
        subject: find_child_element(node, ns::SAML, saml::SUBJECT)
            .map(parse_subject)
            .transpose()?,
        conditions: find_child_element(node, ns::SAML, saml::CONDITIONS)
            .map(parse_conditions)
            .transpose()?,
        authn_statements: child_elements(node, ns::SAML, saml::AUTHN_STATEMENT)
            .map(parse_authn_statement)
            .collect::<Result<_>>()?,
        attributes,
        has_signature: has_signature(node),
        id,
    })
}

fn parse_subject(node: Node<'_, '_>) -> Result<Subject> {
    Ok(Subject {
        name_id: find_child_element(node, ns::SAML, saml::NAME_ID).map(|n| NameId {
            value: element_text(n),
            format: optional_string(n, attr::FORMAT),
            name_qualifier: optional_string(n, attr::NAME_QUALIFIER),
            sp_name_qualifier: optional_string(n, attr::SP_NAME_QUALIFIER),
        }),
        confirmations: child_elements(node, ns::SAML, saml::SUBJECT_CONFIRMATION)
            .map(parse_confirmation)
            .collect::<Result<_>>()?,
    })
}

fn parse_confirmation(node: Node<'_, '_>) -> Result<SubjectConfirmation> {
    let data = match find_child_element(node, ns::SAML, saml::SUBJECT_CONFIRMATION_DATA) {
        Some(d) => Some(SubjectConfirmationData {
            recipient: optional_string(d, attr::RECIPIENT),
            not_before: optional_instant(d, attr::NOT_BEFORE)?,
            not_on_or_after: optional_instant(d, attr::NOT_ON_OR_AFTER)?,
            in_response_to: optional_string(d, attr::IN_RESPONSE_TO),
            address: optional_string(d, attr::ADDRESS),
        }),
        None => None,
    };
    Ok(SubjectConfirmation {
        method: required_attr(node, attr::METHOD)?.to_owned(),
        data,
    })
}

fn parse_conditions(node: Node<'_, '_>) -> Result<Conditions> {
    Ok(Conditions {
        not_before: optional_instant(node, attr::NOT_BEFORE)?,
        not_on_or_after: optional_instant(node, attr::NOT_ON_OR_AFTER)?,
        audience_restrictions: child_elements(node, ns::SAML, saml::AUDIENCE_RESTRICTION)
            .map(|r| {
                child_elements(r, ns::SAML, saml::AUDIENCE)
                    .map(element_text)
                    .collect()
            })
            .collect(),
        one_time_use: find_child_element(node, ns::SAML, saml::ONE_TIME_USE).is_some(),
    })
}

fn parse_authn_statement(node: Node<'_, '_>) -> Result<AuthnStatement> {
    Ok(AuthnStatement {
        authn_instant: parse_instant(required_attr(node, attr::AUTHN_INSTANT)?)?,
        session_index: optional_string(node, attr::SESSION_INDEX),
        session_not_on_or_after: optional_instant(node, attr::SESSION_NOT_ON_OR_AFTER)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use chrono::TimeZone;

    const RESPONSE: &str = r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_r" Version="2.0" IssueInstant="2030-06-01T11:59:00Z" Destination="https://sp.example.com/acs" InResponseTo="_req">
  <saml:Issuer>https://idp.example.org</saml:Issuer>
  <samlp:Status>
    <samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/>
  </samlp:Status>
  <saml:Assertion ID="_a" Version="2.0" IssueInstant="2030-06-01T11:59:00.123Z">
    <saml:Issuer>https://idp.example.org</saml:Issuer>
    <saml:Subject>
      <saml:NameID Format="urn:oasis:names:tc:SAML:2.0:nameid-format:persistent" SPNameQualifier="sp-qualifier">user-1</saml:NameID>
      <saml:SubjectConfirmation Method="urn:oasis:names:tc:SAML:2.0:cm:bearer">
        <saml:SubjectConfirmationData Recipient="https://sp.example.com/acs" NotOnOrAfter="2030-06-01T12:05:00Z" InResponseTo="_req"/>
      </saml:SubjectConfirmation>
    </saml:Subject>
    <saml:Conditions NotBefore="2030-06-01T11:55:00Z" NotOnOrAfter="2030-06-01T12:05:00Z">
      <saml:AudienceRestriction><saml:Audience>https://sp.example.com</saml:Audience></saml:AudienceRestriction>
      <saml:OneTimeUse/>
    </saml:Conditions>
    <saml:AuthnStatement AuthnInstant="2030-06-01T11:58:00Z" SessionIndex="s-1"/>
    <saml:AttributeStatement>
      <saml:Attribute Name="mail"><saml:AttributeValue>user@example.com</saml:AttributeValue></saml:Attribute>
      <saml:Attribute Name="role"><saml:AttributeValue>a</saml:AttributeValue><saml:AttributeValue>b</saml:AttributeValue></saml:Attribute>
    </saml:AttributeStatement>
  </saml:Assertion>
</samlp:Response>"#;

    #[test]
    fn parses_full_response() {
        let doc = samlkoll_xml::parse(RESPONSE).unwrap();
        let r = parse_response(&doc).unwrap();
        assert_eq!(r.id, "_r");
        assert_eq!(r.in_response_to.as_deref(), Some("_req"));
        assert_eq!(r.issuer.as_deref(), Some("https://idp.example.org"));
        assert!(r.status.is_success());
        assert!(!r.has_signature);
        assert_eq!(r.encrypted_assertions, 0);

        let a = &r.assertions[0];
        assert_eq!(a.id, "_a");
        let subject = a.subject.as_ref().unwrap();
        let name_id = subject.name_id.as_ref().unwrap();
        assert_eq!(name_id.value, "user-1");
        assert_eq!(name_id.sp_name_qualifier.as_deref(), Some("sp-qualifier"));
        assert_eq!(subject.confirmations[0].method, ns::CM_BEARER);
        let data = subject.confirmations[0].data.as_ref().unwrap();
        assert_eq!(
            data.not_on_or_after,
            Some(Utc.with_ymd_and_hms(2030, 6, 1, 12, 5, 0).unwrap())
        );

        let c = a.conditions.as_ref().unwrap();
        assert_eq!(c.audience_restrictions, vec![vec!["https://sp.example.com".to_string()]]);
        assert!(c.one_time_use);
        assert_eq!(a.authn_statements[0].session_index.as_deref(), Some("s-1"));
        assert_eq!(a.attributes[1].values, vec!["a", "b"]);
    }

    #[test]
    fn wrong_root_is_malformed() {
        let doc = samlkoll_xml::parse(r#"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion"/>"#).unwrap();
        assert_eq!(parse_response(&doc).unwrap_err().kind, FailureKind::MalformedResponse);
    }

    #[test]
    fn bad_instant_is_malformed() {
        let xml = RESPONSE.replace("2030-06-01T11:55:00Z", "yesterday");
        let doc = samlkoll_xml::parse(&xml).unwrap();
        let err = parse_response(&doc).unwrap_err();
        assert_eq!(err.kind, FailureKind::MalformedResponse);
        assert!(err.detail.contains("yesterday"));
    }

    #[test]
    fn missing_name_id_format_means_unspecified() {
        let xml = RESPONSE.replace(r#"Format="urn:oasis:names:tc:SAML:2.0:nameid-format:persistent" "#, "");
        let doc = samlkoll_xml::parse(&xml).unwrap();
        let r = parse_response(&doc).unwrap();
        let name_id = r.assertions[0].subject.as_ref().unwrap().name_id.clone().unwrap();
        assert_eq!(name_id.format, None);
        assert_eq!(name_id.effective_format(), ns::NAMEID_UNSPECIFIED);
    }
}
