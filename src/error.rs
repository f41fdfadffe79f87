//! Error taxonomy for the flow engine.
//!
//! Every failure a verifier backend can produce is normalized into an
//! [`ErrorRecord`] before it reaches a subscriber: a message bound to the
//! failing operation, a classifier code, and the recovery affordance the
//! error screen should expose. Raw errors never escape the controller.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classifier attached to a failure, carried from the verifier when it
/// provides one and defaulted to [`ErrorCode::Unknown`] otherwise.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Primary credentials rejected (bad email/password pair).
    InvalidCredentials,
    /// OTP or authenticator code did not match.
    CodeMismatch,
    /// Wallet signature request denied or failed verification.
    SignatureDenied,
    /// Account is locked or otherwise permanently refused.
    AccountLocked,
    /// Verifier call exceeded the configured deadline.
    Timeout,
    /// Transport-level failure reported by a backend.
    Network,
    /// A verifier reported success without a usable identity.
    MissingIdentity,
    /// The retry budget is spent.
    RetriesExhausted,
    /// Locally rejected input; never consumes a retry slot.
    InvalidInput,
    /// No classifier was provided by the failing verifier.
    Unknown,
}

impl ErrorCode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::CodeMismatch => "code_mismatch",
            Self::SignatureDenied => "signature_denied",
            Self::AccountLocked => "account_locked",
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::MissingIdentity => "missing_identity",
            Self::RetriesExhausted => "retries_exhausted",
            Self::InvalidInput => "invalid_input",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "invalid_credentials" => Some(Self::InvalidCredentials),
            "code_mismatch" => Some(Self::CodeMismatch),
            "signature_denied" => Some(Self::SignatureDenied),
            "account_locked" => Some(Self::AccountLocked),
            "timeout" => Some(Self::Timeout),
            "network" => Some(Self::Network),
            "missing_identity" => Some(Self::MissingIdentity),
            "retries_exhausted" => Some(Self::RetriesExhausted),
            "invalid_input" => Some(Self::InvalidInput),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// The single primary affordance an error screen exposes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// Offer another attempt; returns the flow to method selection.
    Retry,
    /// Send the user back to the landing surface; the flow is over.
    GoHome,
    /// Point the user at support; the account needs human help.
    ContactSupport,
}

impl RecoveryAction {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Retry => "retry",
            Self::GoHome => "go_home",
            Self::ContactSupport => "contact_support",
        }
    }
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Normalized, user-presentable failure. Produced by the policy engine;
/// consumed by whatever renders the error state.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub message: String,
    pub code: ErrorCode,
    pub retryable: bool,
    pub recovery: RecoveryAction,
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.message)
    }
}

/// Failure reported by a verifier backend, before classification.
///
/// `permanent` marks failures no retry can fix (locked account, revoked
/// credential); the policy engine turns those into `ContactSupport`
/// records regardless of the remaining budget.
#[derive(Clone, Debug)]
pub struct VerifierError {
    code: ErrorCode,
    message: String,
    permanent: bool,
}

impl VerifierError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            permanent: false,
        }
    }

    /// A failure carrying the explicit non-retryable marker.
    #[must_use]
    pub fn permanent(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            permanent: true,
        }
    }

    /// A failure without a classifier from the backend.
    #[must_use]
    pub fn unclassified(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unknown, message)
    }

    /// The synthetic failure produced when a verifier call outlives its
    /// deadline.
    #[must_use]
    pub fn timed_out(operation: &str) -> Self {
        Self::new(ErrorCode::Timeout, format!("{operation} timed out"))
    }

    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.permanent
    }
}

impl fmt::Display for VerifierError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.message)
    }
}

impl std::error::Error for VerifierError {}

/// Returned by [`FlowHandle::dispatch`](crate::flow::FlowHandle::dispatch)
/// once the flow task has ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FlowClosed;

impl fmt::Display for FlowClosed {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("authentication flow is no longer running")
    }
}

impl std::error::Error for FlowClosed {}
