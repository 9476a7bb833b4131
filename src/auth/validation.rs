use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::{AppError, Result};
use crate::models::RegisterRequest;

lazy_static! {
    /// Latin letters and digits, starting with a letter, 4 to 20 characters
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-zA-Z][a-zA-Z0-9]{3,19}$").unwrap();

    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();

    /// Allowed password alphabet; the required classes are checked separately
    static ref PASSWORD_REGEX: Regex = Regex::new(r"^[A-Za-z\d@$!%*?&]{6,}$").unwrap();
}

const PASSWORD_SPECIALS: &str = "@$!%*?&";

pub struct RegistrationValidator;

impl RegistrationValidator {
    pub fn validate(request: &RegisterRequest) -> Result<()> {
        Self::validate_username(&request.username)?;
        Self::validate_full_name(&request.full_name)?;
        Self::validate_email(&request.email)?;
        Self::validate_password(&request.password)?;
        Ok(())
    }

    pub fn validate_username(username: &str) -> Result<()> {
        if !USERNAME_REGEX.is_match(username) {
            return Err(AppError::validation(
                "Username must start with a letter, contain only Latin letters and digits, and be 4 to 20 characters long",
            ));
        }
        Ok(())
    }

    pub fn validate_full_name(full_name: &str) -> Result<()> {
        if full_name.trim().is_empty() {
            return Err(AppError::validation("Full name is required"));
        }
        Ok(())
    }

    pub fn validate_email(email: &str) -> Result<()> {
        if !EMAIL_REGEX.is_match(email) {
            return Err(AppError::validation("Invalid email format"));
        }
        Ok(())
    }

    pub fn validate_password(password: &str) -> Result<()> {
        let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
        let has_digit = password.chars().any(|c| c.is_ascii_digit());
        let has_special = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));

        if !PASSWORD_REGEX.is_match(password) || !has_uppercase || !has_digit || !has_special {
            return Err(AppError::validation(
                "Password must be at least 6 characters and contain an uppercase letter, a digit and one of @$!%*?&",
            ));
        }
        Ok(())
    }
}
