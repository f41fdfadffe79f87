//! Typed user inputs and local validation.
//!
//! Every raw string a subscriber submits is parsed into one of these types
//! before a verifier sees it. Parse failures are reported back as
//! non-budget validation errors; they never reach a backend and never
//! consume a retry slot.

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, Serializer};
use std::fmt;

/// Normalize an email for verifier lookups.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Strip the separators users type into phone numbers.
pub(crate) fn normalize_phone(phone: &str) -> String {
    phone
        .trim()
        .chars()
        .filter(|ch| !matches!(ch, ' ' | '-' | '.' | '(' | ')'))
        .collect()
}

/// E.164 shape check on already-normalized input.
pub(crate) fn valid_phone(phone_normalized: &str) -> bool {
    Regex::new(r"^\+[1-9][0-9]{6,14}$").is_ok_and(|regex| regex.is_match(phone_normalized))
}

/// One-time codes are six digits, SMS and authenticator alike.
pub(crate) fn valid_otp_code(code: &str) -> bool {
    Regex::new(r"^[0-9]{6}$").is_ok_and(|regex| regex.is_match(code))
}

/// A validated, normalized email address.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let normalized = normalize_email(raw);
        if normalized.is_empty() {
            return Err("Email is required".to_string());
        }
        if !valid_email(&normalized) {
            return Err("Invalid email format".to_string());
        }
        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl Serialize for EmailAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// A validated phone number in E.164 form.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let normalized = normalize_phone(raw);
        if normalized.is_empty() {
            return Err("Phone number is required".to_string());
        }
        if !valid_phone(&normalized) {
            return Err("Invalid phone number; use international format".to_string());
        }
        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display form safe for snapshots and logs: all but the last four
    /// digits replaced.
    #[must_use]
    pub fn masked(&self) -> String {
        let digits = self.0.trim_start_matches('+');
        let keep = digits.len().saturating_sub(4);
        format!("+{}{}", "*".repeat(keep), &digits[keep..])
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.masked())
    }
}

/// Serialized form is the masked number; snapshots carry it for display
/// and must not leak the full value.
impl Serialize for PhoneNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.masked())
    }
}

/// A password held behind [`secrecy::SecretString`]. `Debug` and `Display`
/// never reveal the value; verifiers read it through [`Password::expose`].
#[derive(Clone)]
pub struct Password(SecretString);

impl Password {
    pub fn parse(raw: &str) -> Result<Self, String> {
        if raw.is_empty() {
            return Err("Password is required".to_string());
        }
        Ok(Self(SecretString::from(raw.to_string())))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("Password(***)")
    }
}

/// A validated six-digit one-time code.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OtpCode(String);

impl OtpCode {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("Verification code is required".to_string());
        }
        if !valid_otp_code(trimmed) {
            return Err("Verification code must be six digits".to_string());
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Profile submitted when a Sign-Up flow creates an account with email
/// credentials.
#[derive(Clone, Debug)]
pub struct SignupProfile {
    pub email: EmailAddress,
    pub password: Password,
}

/// Inputs collected while the user advances through the flow. Held by the
/// session, read by the step-up fallbacks, and cleared on termination.
#[derive(Clone, Debug, Default)]
pub struct CollectedInputs {
    pub email: Option<EmailAddress>,
    pub password: Option<Password>,
    pub phone: Option<PhoneNumber>,
}

impl CollectedInputs {
    /// Drop everything collected, secrets included.
    pub fn clear(&mut self) {
        self.email = None;
        self.password = None;
        self.phone = None;
    }
}
