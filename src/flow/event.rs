//! Events subscribers dispatch into a flow, and the notifications that
//! stream back out.

use std::fmt;

use crate::error::ErrorRecord;
use crate::flow::session::{AccountRole, CompletedAuth, PrimaryMethod, SecondaryMethod};
use crate::flow::state::FlowSnapshot;

/// Payload of a first-factor submission. Raw strings; validation happens
/// inside the machine so subscribers get uniform error records.
#[derive(Clone)]
pub enum PrimarySubmission {
    Email { email: String, password: String },
    Phone { phone: String },
    Wallet,
}

impl PrimarySubmission {
    #[must_use]
    pub fn method(&self) -> PrimaryMethod {
        match self {
            Self::Email { .. } => PrimaryMethod::Email,
            Self::Phone { .. } => PrimaryMethod::Phone,
            Self::Wallet => PrimaryMethod::Wallet,
        }
    }
}

impl fmt::Debug for PrimarySubmission {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email { email, .. } => formatter
                .debug_struct("Email")
                .field("email", email)
                .field("password", &"***")
                .finish(),
            Self::Phone { phone } => formatter.debug_struct("Phone").field("phone", phone).finish(),
            Self::Wallet => formatter.write_str("Wallet"),
        }
    }
}

/// Payload of a second-factor submission. A phone step-up may omit the
/// number; the machine then falls back to the collected primary phone or
/// the principal's phone.
#[derive(Clone, Debug)]
pub enum SecondarySubmission {
    Phone { phone: Option<String> },
    Authenticator,
}

impl SecondarySubmission {
    #[must_use]
    pub fn method(&self) -> SecondaryMethod {
        match self {
            Self::Phone { .. } => SecondaryMethod::Phone,
            Self::Authenticator => SecondaryMethod::Authenticator,
        }
    }
}

/// Everything a subscriber can ask a flow to do.
#[derive(Clone, Debug)]
pub enum FlowEvent {
    /// Highlight a first-factor method; no verification starts yet.
    SelectMethod(PrimaryMethod),
    /// Submit first-factor input and start verification.
    SubmitPrimary(PrimarySubmission),
    /// Supply the code a pending verification is waiting for.
    SubmitProof { code: String },
    /// Ask for the current code to be delivered again.
    ResendCode,
    /// Sign-Up only: pick the account role.
    SelectRole(AccountRole),
    /// Highlight a second-factor method; no verification starts yet.
    SelectSecondary(SecondaryMethod),
    /// Submit second-factor input and start verification.
    SubmitSecondary(SecondarySubmission),
    /// Skip the second factor; honored only if a verified contact factor
    /// is on record right now.
    Skip,
    /// Leave the error state and try again from method selection.
    Retry,
    /// Walk away; the flow task tears down.
    Abandon,
}

impl FlowEvent {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::SelectMethod(_) => "select_method",
            Self::SubmitPrimary(_) => "submit_primary",
            Self::SubmitProof { .. } => "submit_proof",
            Self::ResendCode => "resend_code",
            Self::SelectRole(_) => "select_role",
            Self::SelectSecondary(_) => "select_secondary",
            Self::SubmitSecondary(_) => "submit_secondary",
            Self::Skip => "skip",
            Self::Retry => "retry",
            Self::Abandon => "abandon",
        }
    }
}

/// What a flow publishes to its subscriber.
#[derive(Clone, Debug)]
pub enum FlowNotification {
    /// The visible session changed; carries the full new snapshot.
    StateChanged(FlowSnapshot),
    /// A failure or refusal was raised. Raised records with no
    /// accompanying state change are validation refusals.
    ErrorRaised(ErrorRecord),
    /// Terminal success; always the last notification.
    Completed(CompletedAuth),
}

impl FlowNotification {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::StateChanged(_) => "state_changed",
            Self::ErrorRaised(_) => "error_raised",
            Self::Completed(_) => "completed",
        }
    }
}
