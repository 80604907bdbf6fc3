//! Input rules for user fields
//!
//! Field constraints are declared on the request types with
//! `#[derive(Validate)]`; this module holds the custom rules and the mapping
//! of validation failures onto [`ApiError::Validation`].

use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::ApiError;

/// Emails are stored and matched trimmed and lower-cased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Run the declared rules on `value`
pub fn check<T: Validate>(value: &T) -> Result<(), ApiError> {
    value.validate().map_err(|errors| ApiError::Validation(describe(&errors)))
}

/// One line per failed rule, ordered by field name
fn describe(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| match err.message.as_deref() {
                Some(message) => message.to_string(),
                None => format!("{} is invalid ({})", field, err.code),
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Uppercase and lowercase letters plus a digit or special character
pub(crate) fn password_strength(password: &str) -> Result<(), ValidationError> {
    let has_upper = password.chars().any(char::is_uppercase);
    let has_lower = password.chars().any(char::is_lowercase);
    let has_digit_or_special = password
        .chars()
        .any(|c| c.is_ascii_digit() || !c.is_alphanumeric());

    if has_upper && has_lower && has_digit_or_special {
        Ok(())
    } else {
        Err(ValidationError::new("password_strength"))
    }
}

pub(crate) fn no_whitespace(value: &str) -> Result<(), ValidationError> {
    if value.chars().any(char::is_whitespace) {
        return Err(ValidationError::new("no_whitespace"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateUserRequest, UpdateUserRequest};
    use usergate_auth::Role;

    fn request() -> CreateUserRequest {
        CreateUserRequest {
            user_id: "user001".to_string(),
            name: Some("Alice".to_string()),
            email: "a@b.com".to_string(),
            password: "Secret123".to_string(),
            role: Role::User,
        }
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(check(&request()).is_ok());

        let mut special = request();
        special.password = "Secret!!".to_string();
        assert!(check(&special).is_ok());
    }

    #[test]
    fn test_email_rules() {
        for bad in ["", "a", "a@", "@b.com", "a b@c.com"] {
            let mut req = request();
            req.email = bad.to_string();
            assert!(
                matches!(check(&req), Err(ApiError::Validation(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_password_rules() {
        for bad in [
            "Sh0rt".to_string(),
            "alllowercase1".to_string(),
            "ALLUPPERCASE1".to_string(),
            "NoDigitsHere".to_string(),
            format!("Aa1{}", "x".repeat(30)),
        ] {
            let mut req = request();
            req.password = bad.clone();
            assert!(check(&req).is_err(), "{bad:?} should be rejected");
        }

        let mut req = request();
        req.password = "password".to_string();
        match check(&req) {
            Err(ApiError::Validation(message)) => assert_eq!(message, "password too weak"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_user_id_rules() {
        for bad in [String::new(), "   ".to_string(), "has space".to_string(), "x".repeat(65)] {
            let mut req = request();
            req.user_id = bad.clone();
            assert!(check(&req).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_name_length_matches_column() {
        let mut req = request();
        req.name = Some("n".repeat(256));
        assert!(check(&req).is_err());

        req.name = Some("n".repeat(255));
        assert!(check(&req).is_ok());
    }

    #[test]
    fn test_update_checks_only_present_fields() {
        assert!(check(&UpdateUserRequest::default()).is_ok());

        let weak = UpdateUserRequest {
            password: Some("weakpass".to_string()),
            ..Default::default()
        };
        assert!(check(&weak).is_err());

        let bad_email = UpdateUserRequest {
            email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        assert!(check(&bad_email).is_err());
    }

    #[test]
    fn test_errors_are_joined_per_field() {
        let mut req = request();
        req.email = "nope".to_string();
        req.password = "weakpass".to_string();

        match check(&req) {
            Err(ApiError::Validation(message)) => {
                assert_eq!(message, "email must be a valid email address; password too weak")
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
