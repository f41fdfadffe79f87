//! Scripted walkthrough of one flow against the in-memory verifiers.
//!
//! Drives the flow the way a frontend would: watch each state change, answer
//! it with the next canned input, and print the completion payload as JSON.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::FlowConfig;
use crate::error::RecoveryAction;
use crate::flow::{
    AccountRole, FlowController, FlowEvent, FlowKind, FlowNotification, FlowSnapshot, FlowState,
    PendingPhase, PrimaryMethod, PrimarySubmission, SecondarySubmission,
};
use crate::verifier::stubs::StubVerifiers;

const DEMO_EMAIL: &str = "demo@authflow.dev";
const DEMO_PASSWORD: &str = "correct-horse-battery-staple";
const DEMO_PHONE: &str = "+14155550134";
const DEMO_CODE: &str = "123456";

#[derive(Debug)]
pub struct Args {
    pub kind: FlowKind,
    pub config: FlowConfig,
}

/// Drive one scripted flow to completion.
///
/// # Errors
/// Returns an error if the flow ends without completing.
pub async fn execute(args: Args) -> Result<()> {
    let support_url = args.config.support_url().to_string();
    let stubs = StubVerifiers::new();
    let (handle, mut notifications) =
        FlowController::spawn(args.kind, stubs.verifiers(), args.config);

    let mut completed = None;
    while let Some(notification) = notifications.recv().await {
        match notification {
            FlowNotification::StateChanged(snapshot) => {
                info!(state = snapshot.state.name(), "Flow state changed");
                if let Some(event) = next_event(&snapshot) {
                    info!(event = event.name(), "Submitting scripted input");
                    handle.dispatch(event)?;
                }
            }
            FlowNotification::ErrorRaised(record) => {
                warn!(
                    code = %record.code,
                    recovery = %record.recovery,
                    "{}",
                    record.message
                );
                if record.recovery == RecoveryAction::ContactSupport {
                    info!(%support_url, "Direct the user to support");
                }
            }
            FlowNotification::Completed(auth) => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&auth).context("serializing completion")?
                );
                completed = Some(auth);
            }
        }
    }

    let completed = completed.context("flow ended without completing")?;
    info!(flow_id = %completed.flow_id, "Flow complete");

    Ok(())
}

// What a frontend would submit next, given where the flow is. `None` while a
// verifier call is pending and in terminal states.
fn next_event(snapshot: &FlowSnapshot) -> Option<FlowEvent> {
    match &snapshot.state {
        FlowState::MethodSelection => {
            if snapshot.primary_method.is_none() {
                Some(FlowEvent::SelectMethod(PrimaryMethod::Email))
            } else {
                Some(FlowEvent::SubmitPrimary(PrimarySubmission::Email {
                    email: DEMO_EMAIL.to_string(),
                    password: DEMO_PASSWORD.to_string(),
                }))
            }
        }
        FlowState::PrimaryPending {
            phase: PendingPhase::AwaitingProof,
            ..
        }
        | FlowState::StepUpPending {
            phase: PendingPhase::AwaitingProof,
            ..
        } => Some(FlowEvent::SubmitProof {
            code: DEMO_CODE.to_string(),
        }),
        FlowState::RoleSelection {
            awaiting_status: false,
        } => Some(FlowEvent::SelectRole(AccountRole::Individual)),
        FlowState::StepUpSelection {
            refreshing: false, ..
        } => Some(FlowEvent::SubmitSecondary(SecondarySubmission::Phone {
            phone: Some(DEMO_PHONE.to_string()),
        })),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn sign_in_script_runs_to_completion() {
        let args = Args {
            kind: FlowKind::SignIn,
            config: FlowConfig::new().with_resend_cooldown(Duration::ZERO),
        };

        execute(args).await.unwrap();
    }

    #[tokio::test]
    async fn sign_up_script_runs_to_completion() {
        let args = Args {
            kind: FlowKind::SignUp,
            config: FlowConfig::new(),
        };

        execute(args).await.unwrap();
    }

    #[test]
    fn script_stays_quiet_while_calls_run() {
        let snapshot = FlowSnapshot {
            flow_id: "01J0000000000000000000000".to_string(),
            kind: FlowKind::SignIn,
            state: FlowState::PrimaryPending {
                method: PrimaryMethod::Email,
                phase: PendingPhase::Initiating,
            },
            primary_method: Some(PrimaryMethod::Email),
            secondary_method: None,
            role: None,
            retry_count: 0,
            retries_remaining: 3,
            otp_destination: None,
        };

        assert!(next_event(&snapshot).is_none());
    }
}
