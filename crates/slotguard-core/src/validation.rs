//! Input validation: account fields and the password policy.

use crate::error::ValidationError;

/// Minimum password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Symbols that satisfy the password policy's symbol requirement.
pub const PASSWORD_SYMBOLS: &str = "@$!%*?&";

/// Username length bounds (inclusive).
pub const USERNAME_LEN: (usize, usize) = (3, 20);

/// Maximum display name length, in characters.
pub const MAX_DISPLAY_NAME_LEN: usize = 50;

/// Validate an email address.
///
/// This is a structural check (one `@`, non-empty local part, dotted
/// domain, no whitespace), not a deliverability check.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }

    let (local, domain) = email.split_once('@').ok_or(ValidationError::InvalidEmail)?;
    if local.is_empty() || domain.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(ValidationError::InvalidEmail);
    }

    Ok(())
}

/// Derive a username from an email address: its local part.
pub fn username_from_email(email: &str) -> Result<String, ValidationError> {
    validate_email(email)?;
    email
        .split_once('@')
        .map(|(local, _)| local.to_string())
        .ok_or(ValidationError::InvalidEmail)
}

/// Validate a username chosen by an administrator: 3-20 characters from
/// `[A-Za-z0-9_]`.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if len < USERNAME_LEN.0 || len > USERNAME_LEN.1 {
        return Err(ValidationError::UsernameLength);
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ValidationError::UsernameCharset);
    }
    Ok(())
}

/// Check a new password against the policy.
///
/// At least eight characters, with at least one ASCII lowercase letter,
/// one uppercase letter, one digit and one of `@$!%*?&`.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LEN));
    }

    let checks: [(&'static str, fn(char) -> bool); 4] = [
        ("a lowercase letter", |c| c.is_ascii_lowercase()),
        ("an uppercase letter", |c| c.is_ascii_uppercase()),
        ("a digit", |c| c.is_ascii_digit()),
        ("a symbol (@$!%*?&)", |c| PASSWORD_SYMBOLS.contains(c)),
    ];

    for (what, check) in checks {
        if !password.chars().any(check) {
            return Err(ValidationError::PasswordMissingClass(what));
        }
    }

    Ok(())
}

/// Validate a new password and its confirmation together.
pub fn validate_new_password(password: &str, confirm: &str) -> Result<(), ValidationError> {
    validate_password(password)?;
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

/// Normalize a display name: empty clears it, otherwise at most 50 chars.
pub fn normalize_display_name(name: Option<&str>) -> Result<Option<String>, ValidationError> {
    match name {
        None | Some("") => Ok(None),
        Some(n) if n.chars().count() > MAX_DISPLAY_NAME_LEN => {
            Err(ValidationError::DisplayNameTooLong(MAX_DISPLAY_NAME_LEN))
        }
        Some(n) => Ok(Some(n.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email() {
        assert!(validate_email("a@example.com").is_ok());
        assert!(validate_email("first.last@sub.example.org").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a@@b.com").is_err());
        assert!(validate_email("a b@c.com").is_err());
        assert!(validate_email("a@b..com").is_err());
    }

    #[test]
    fn test_username_from_email() {
        assert_eq!(username_from_email("taro@example.com").unwrap(), "taro");
        assert!(username_from_email("bogus").is_err());
    }

    #[test]
    fn test_username() {
        assert!(validate_username("bob").is_ok());
        assert!(validate_username("editor_2024").is_ok());
        assert_eq!(
            validate_username("ab").unwrap_err(),
            ValidationError::UsernameLength
        );
        assert_eq!(
            validate_username(&"x".repeat(21)).unwrap_err(),
            ValidationError::UsernameLength
        );
        assert_eq!(
            validate_username("has-dash").unwrap_err(),
            ValidationError::UsernameCharset
        );
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password("Abcdef1!").is_ok());
        assert_eq!(
            validate_password("Ab1!").unwrap_err(),
            ValidationError::PasswordTooShort(8)
        );
        assert!(matches!(
            validate_password("ABCDEFG1!").unwrap_err(),
            ValidationError::PasswordMissingClass("a lowercase letter")
        ));
        assert!(matches!(
            validate_password("abcdefg1!").unwrap_err(),
            ValidationError::PasswordMissingClass("an uppercase letter")
        ));
        assert!(matches!(
            validate_password("Abcdefgh!").unwrap_err(),
            ValidationError::PasswordMissingClass("a digit")
        ));
        assert!(matches!(
            validate_password("Abcdefgh1").unwrap_err(),
            ValidationError::PasswordMissingClass(_)
        ));
        // '#' is not one of the accepted symbols
        assert!(validate_password("Abcdefg1#").is_err());
    }

    #[test]
    fn test_password_confirmation() {
        assert!(validate_new_password("Abcdef1!", "Abcdef1!").is_ok());
        assert_eq!(
            validate_new_password("Abcdef1!", "Abcdef1?").unwrap_err(),
            ValidationError::PasswordMismatch
        );
    }

    #[test]
    fn test_display_name() {
        assert_eq!(normalize_display_name(Some("")).unwrap(), None);
        assert_eq!(normalize_display_name(None).unwrap(), None);
        assert_eq!(
            normalize_display_name(Some("Hanako")).unwrap(),
            Some("Hanako".to_string())
        );
        assert!(normalize_display_name(Some(&"x".repeat(51))).is_err());
    }
}
