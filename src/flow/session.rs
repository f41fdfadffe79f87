//! Per-flow session data.
//!
//! A [`FlowSession`] is created when a flow spawns and owned exclusively by
//! the flow task. It accumulates the user's choices and collected inputs as
//! the flow advances; on completion everything sensitive is cleared and the
//! surviving facts are handed out as a [`CompletedAuth`].

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

use crate::flow::state::{FlowSnapshot, FlowState, PendingPhase};
use crate::input::{CollectedInputs, PhoneNumber};
use crate::policy::MAX_RETRIES;
use crate::verifier::{AuthResult, OtpChannel, Principal, SessionToken};

/// Whether the user is signing in to an existing account or creating one.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    SignIn,
    SignUp,
}

impl FlowKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::SignIn => "sign_in",
            Self::SignUp => "sign_up",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "sign_in" => Some(Self::SignIn),
            "sign_up" => Some(Self::SignUp),
            _ => None,
        }
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// First-factor verification method.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryMethod {
    Email,
    Phone,
    Wallet,
}

impl PrimaryMethod {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Wallet => "wallet",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "email" => Some(Self::Email),
            "phone" => Some(Self::Phone),
            "wallet" => Some(Self::Wallet),
            _ => None,
        }
    }
}

impl fmt::Display for PrimaryMethod {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Step-up verification method.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondaryMethod {
    Phone,
    Authenticator,
}

impl SecondaryMethod {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Authenticator => "authenticator",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "phone" => Some(Self::Phone),
            "authenticator" => Some(Self::Authenticator),
            _ => None,
        }
    }

    /// Which proof channel codes for this method are verified on.
    #[must_use]
    pub fn channel(self) -> OtpChannel {
        match self {
            Self::Phone => OtpChannel::Sms,
            Self::Authenticator => OtpChannel::Authenticator,
        }
    }
}

impl fmt::Display for SecondaryMethod {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Tenancy the account is created under; Sign-Up flows only.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    Individual,
    Organization,
}

impl AccountRole {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Organization => "organization",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "individual" => Some(Self::Individual),
            "organization" => Some(Self::Organization),
            _ => None,
        }
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// State owned by one flow task. Mutated only by the state machine.
pub struct FlowSession {
    pub(crate) id: Ulid,
    pub(crate) kind: FlowKind,
    pub(crate) primary_method: Option<PrimaryMethod>,
    pub(crate) secondary_method: Option<SecondaryMethod>,
    pub(crate) role: Option<AccountRole>,
    pub(crate) state: FlowState,
    pub(crate) retry_count: u32,
    pub(crate) inputs: CollectedInputs,
    pub(crate) primary_auth: Option<AuthResult>,
    pub(crate) last_delivery: Option<PhoneNumber>,
}

impl FlowSession {
    #[must_use]
    pub fn new(kind: FlowKind) -> Self {
        Self {
            id: Ulid::new(),
            kind,
            primary_method: None,
            secondary_method: None,
            role: None,
            state: FlowState::MethodSelection,
            retry_count: 0,
            inputs: CollectedInputs::default(),
            primary_auth: None,
            last_delivery: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> Ulid {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    #[must_use]
    pub fn state(&self) -> &FlowState {
        &self.state
    }

    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    #[must_use]
    pub fn primary_method(&self) -> Option<PrimaryMethod> {
        self.primary_method
    }

    #[must_use]
    pub fn secondary_method(&self) -> Option<SecondaryMethod> {
        self.secondary_method
    }

    #[must_use]
    pub fn role(&self) -> Option<AccountRole> {
        self.role
    }

    /// Credential-free projection of the session for subscribers. The OTP
    /// destination is included only while a code is actually awaited, and
    /// always masked.
    #[must_use]
    pub fn snapshot(&self) -> FlowSnapshot {
        let otp_destination = match &self.state {
            FlowState::PrimaryPending {
                phase: PendingPhase::AwaitingProof,
                ..
            }
            | FlowState::StepUpPending {
                phase: PendingPhase::AwaitingProof,
                ..
            } => self.last_delivery.as_ref().map(PhoneNumber::masked),
            _ => None,
        };

        FlowSnapshot {
            flow_id: self.id.to_string(),
            kind: self.kind,
            state: self.state.clone(),
            primary_method: self.primary_method,
            secondary_method: self.secondary_method,
            role: self.role,
            retry_count: self.retry_count,
            retries_remaining: MAX_RETRIES.saturating_sub(self.retry_count),
            otp_destination,
        }
    }
}

/// The facts that survive a successful flow.
#[derive(Clone, Debug, Serialize)]
pub struct CompletedAuth {
    pub flow_id: String,
    pub kind: FlowKind,
    pub principal: Principal,
    #[serde(skip)]
    pub session_token: Option<SessionToken>,
    pub role: Option<AccountRole>,
    pub retry_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_method_labels_round_trip() {
        for kind in [FlowKind::SignIn, FlowKind::SignUp] {
            assert_eq!(FlowKind::from_str(kind.as_str()), Some(kind));
        }
        for method in [
            PrimaryMethod::Email,
            PrimaryMethod::Phone,
            PrimaryMethod::Wallet,
        ] {
            assert_eq!(PrimaryMethod::from_str(method.as_str()), Some(method));
        }
        for method in [SecondaryMethod::Phone, SecondaryMethod::Authenticator] {
            assert_eq!(SecondaryMethod::from_str(method.as_str()), Some(method));
        }
        for role in [AccountRole::Individual, AccountRole::Organization] {
            assert_eq!(AccountRole::from_str(role.as_str()), Some(role));
        }
        assert_eq!(FlowKind::from_str("sideways"), None);
    }

    #[test]
    fn secondary_method_maps_to_proof_channel() {
        assert_eq!(SecondaryMethod::Phone.channel(), OtpChannel::Sms);
        assert_eq!(
            SecondaryMethod::Authenticator.channel(),
            OtpChannel::Authenticator
        );
    }

    #[test]
    fn new_session_starts_at_method_selection() {
        let session = FlowSession::new(FlowKind::SignIn);
        assert_eq!(session.state(), &FlowState::MethodSelection);
        assert_eq!(session.retry_count(), 0);
        assert!(session.primary_method().is_none());
        assert!(session.role().is_none());
    }

    #[test]
    fn snapshot_omits_destination_outside_awaiting_proof() {
        let mut session = FlowSession::new(FlowKind::SignIn);
        session.last_delivery = crate::input::PhoneNumber::parse("+14155550134").ok();

        assert_eq!(session.snapshot().otp_destination, None);

        session.state = FlowState::PrimaryPending {
            method: PrimaryMethod::Phone,
            phase: PendingPhase::AwaitingProof,
        };
        assert_eq!(
            session.snapshot().otp_destination,
            Some("+*******0134".to_string())
        );
    }

    #[test]
    fn snapshot_reports_remaining_budget() {
        let mut session = FlowSession::new(FlowKind::SignIn);
        session.retry_count = 2;
        let snapshot = session.snapshot();
        assert_eq!(snapshot.retry_count, 2);
        assert_eq!(snapshot.retries_remaining, 1);
    }
}
