//! Account registration form and credential validation

use std::sync::OnceLock;

use regex::Regex;

use super::messages;
use super::result::{Error, Result};

/// Exactly four ASCII digits
fn pin_pattern() -> &'static Regex {
    static PIN: OnceLock<Regex> = OnceLock::new();
    PIN.get_or_init(|| Regex::new(r"^[0-9]{4}$").expect("valid PIN pattern"))
}

/// Check a PIN's shape before it is sent anywhere
pub fn validate_pin(pin: &str) -> Result<()> {
    if !pin_pattern().is_match(pin) {
        return Err(Error::validation(messages::PIN_FORMAT));
    }
    Ok(())
}

/// Input of the sign-up screen
#[derive(Clone, Default)]
pub struct RegistrationForm {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub pin: String,
    pub confirm_pin: String,
}

impl RegistrationForm {
    /// Client-side checks, in the order the user sees them
    pub fn validate(&self) -> Result<()> {
        if self.password != self.confirm_password {
            return Err(Error::validation(messages::PASSWORD_MISMATCH));
        }
        if self.pin != self.confirm_pin {
            return Err(Error::validation(messages::PIN_MISMATCH));
        }
        validate_pin(&self.pin)
    }
}

impl std::fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RegistrationForm {
        RegistrationForm {
            username: "carol".into(),
            password: "pw".into(),
            confirm_password: "pw".into(),
            pin: "1234".into(),
            confirm_pin: "1234".into(),
        }
    }

    #[test]
    fn test_valid_form() {
        assert!(form().validate().is_ok());
    }

    #[test]
    fn test_password_mismatch() {
        let mut f = form();
        f.confirm_password = "other".into();
        assert_eq!(f.validate().unwrap_err().to_string(), messages::PASSWORD_MISMATCH);
    }

    #[test]
    fn test_pin_mismatch_checked_before_format() {
        let mut f = form();
        f.pin = "12".into();
        assert_eq!(f.validate().unwrap_err().to_string(), messages::PIN_MISMATCH);
    }

    #[test]
    fn test_pin_format() {
        assert!(validate_pin("0000").is_ok());
        assert!(validate_pin("123").is_err());
        assert!(validate_pin("12345").is_err());
        assert!(validate_pin("12a4").is_err());
        assert!(validate_pin("１２３４").is_err());
    }
}
