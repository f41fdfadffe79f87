//! Flow states and the snapshot subscribers render from.

use serde::Serialize;

use crate::error::ErrorRecord;
use crate::flow::session::{AccountRole, FlowKind, PrimaryMethod, SecondaryMethod};
use crate::status::VerificationStatus;

/// Sub-step of a pending verification.
///
/// `Initiating`, `Completing`, and `CheckingStatus` have a verifier call in
/// flight; `AwaitingProof` is idle, waiting for the user to supply a code.
/// A resend runs while the flow stays in `AwaitingProof`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingPhase {
    Initiating,
    AwaitingProof,
    Completing,
    CheckingStatus,
}

/// Where a flow currently stands.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    /// Choosing the first factor.
    MethodSelection,
    /// First-factor verification underway.
    PrimaryPending {
        method: PrimaryMethod,
        phase: PendingPhase,
    },
    /// Sign-Up only: choosing the account role. `awaiting_status` is set
    /// once the role is picked and the verification status query runs.
    RoleSelection { awaiting_status: bool },
    /// Choosing (or skipping) the second factor. Carries the status
    /// snapshot the decision was made from; `refreshing` is set while a
    /// skip re-check is in flight.
    StepUpSelection {
        status: VerificationStatus,
        refreshing: bool,
    },
    /// Second-factor verification underway.
    StepUpPending {
        method: SecondaryMethod,
        phase: PendingPhase,
    },
    /// Terminal: the flow produced a `CompletedAuth`.
    Success,
    /// A classified failure; the record drives the error screen.
    Error { record: ErrorRecord },
}

impl FlowState {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::MethodSelection => "method_selection",
            Self::PrimaryPending { .. } => "primary_pending",
            Self::RoleSelection { .. } => "role_selection",
            Self::StepUpSelection { .. } => "step_up_selection",
            Self::StepUpPending { .. } => "step_up_pending",
            Self::Success => "success",
            Self::Error { .. } => "error",
        }
    }
}

/// Credential-free view of a session, published on every visible change.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlowSnapshot {
    pub flow_id: String,
    pub kind: FlowKind,
    pub state: FlowState,
    pub primary_method: Option<PrimaryMethod>,
    pub secondary_method: Option<SecondaryMethod>,
    pub role: Option<AccountRole>,
    pub retry_count: u32,
    pub retries_remaining: u32,
    /// Masked number the last code went to; present only while a code is
    /// awaited.
    pub otp_destination: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn state_names_cover_every_variant() {
        assert_eq!(FlowState::MethodSelection.name(), "method_selection");
        assert_eq!(
            FlowState::PrimaryPending {
                method: PrimaryMethod::Phone,
                phase: PendingPhase::AwaitingProof,
            }
            .name(),
            "primary_pending"
        );
        assert_eq!(
            FlowState::RoleSelection {
                awaiting_status: false
            }
            .name(),
            "role_selection"
        );
        assert_eq!(
            FlowState::StepUpSelection {
                status: VerificationStatus::default(),
                refreshing: false,
            }
            .name(),
            "step_up_selection"
        );
        assert_eq!(FlowState::Success.name(), "success");
    }

    #[test]
    fn states_serialize_with_snake_case_tags() {
        let state = FlowState::PrimaryPending {
            method: PrimaryMethod::Phone,
            phase: PendingPhase::AwaitingProof,
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "primary_pending": { "method": "phone", "phase": "awaiting_proof" }
            })
        );

        let value = serde_json::to_value(FlowState::MethodSelection).unwrap();
        assert_eq!(value, serde_json::json!("method_selection"));
    }
}
