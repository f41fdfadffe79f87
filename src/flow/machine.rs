//! Pure flow transition core.
//!
//! Flow Overview:
//! 1) The driver feeds each subscriber event to [`FlowMachine::apply`].
//! 2) A transition may request at most one verifier [`Call`]; the driver
//!    executes it and reports back through [`FlowMachine::resolve`].
//! 3) Every outcome lands the machine in a defined state: success advances
//!    the flow, failure is classified into the error state, and the retry
//!    budget is charged for each failed verifier attempt.
//! 4) Terminal success yields a [`CompletedAuth`] and clears collected
//!    inputs.
//!
//! The machine performs no I/O, reads no clock, and never awaits; hosts
//! that cannot run the tokio driver can drive it directly.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ErrorCode, ErrorRecord, VerifierError};
use crate::flow::event::{FlowEvent, PrimarySubmission, SecondarySubmission};
use crate::flow::session::{
    AccountRole, CompletedAuth, FlowKind, FlowSession, PrimaryMethod, SecondaryMethod,
};
use crate::flow::state::{FlowSnapshot, FlowState, PendingPhase};
use crate::input::{EmailAddress, OtpCode, Password, PhoneNumber, SignupProfile};
use crate::policy::{self, ErrorContext, FailureStage};
use crate::status::VerificationStatus;
use crate::verifier::{AuthResult, OtpChannel, OtpDelivery};

/// Verifier call a transition asks the driver to execute.
#[derive(Debug)]
pub enum Call {
    Login {
        email: EmailAddress,
        password: Password,
    },
    Signup {
        profile: SignupProfile,
    },
    ConnectWallet,
    SendOtp {
        phone: PhoneNumber,
    },
    VerifyOtp {
        code: OtpCode,
        channel: OtpChannel,
    },
    FetchStatus {
        user_id: Uuid,
    },
}

impl Call {
    /// Short label used in logs and timeout messages.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::Signup { .. } => "signup",
            Self::ConnectWallet => "wallet connect",
            Self::SendOtp { .. } => "code delivery",
            Self::VerifyOtp { .. } => "code verification",
            Self::FetchStatus { .. } => "status check",
        }
    }
}

/// How an executed [`Call`] resolved. Status checks are infallible by
/// construction: the aggregator degrades failures before they get here.
#[derive(Debug)]
pub enum CallOutcome {
    Auth(Result<AuthResult, VerifierError>),
    OtpSent(Result<OtpDelivery, VerifierError>),
    Status(VerificationStatus),
}

impl CallOutcome {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::OtpSent(_) => "otp_sent",
            Self::Status(_) => "status",
        }
    }
}

/// Result of applying one event or call outcome.
#[derive(Debug, Default)]
pub struct Transition {
    /// The snapshot-visible session changed; the driver publishes a new
    /// [`FlowSnapshot`].
    pub state_changed: bool,
    /// Record to surface to the subscriber. Set with `state_changed` for
    /// classified failures, alone for validation refusals.
    pub raised: Option<ErrorRecord>,
    /// Verifier call to execute; at most one per transition.
    pub call: Option<Call>,
    /// Set exactly once, on terminal success.
    pub completed: Option<CompletedAuth>,
}

impl Transition {
    fn none() -> Self {
        Self::default()
    }

    fn changed() -> Self {
        Self {
            state_changed: true,
            ..Self::default()
        }
    }

    fn changed_with_call(call: Call) -> Self {
        Self {
            state_changed: true,
            call: Some(call),
            ..Self::default()
        }
    }

    fn refusal(record: ErrorRecord) -> Self {
        Self {
            raised: Some(record),
            ..Self::default()
        }
    }
}

/// The per-flow state machine. Owns the session; all mutation goes
/// through [`apply`](Self::apply) and [`resolve`](Self::resolve).
pub struct FlowMachine {
    session: FlowSession,
}

impl FlowMachine {
    #[must_use]
    pub fn new(kind: FlowKind) -> Self {
        Self {
            session: FlowSession::new(kind),
        }
    }

    #[must_use]
    pub fn session(&self) -> &FlowSession {
        &self.session
    }

    #[must_use]
    pub fn snapshot(&self) -> FlowSnapshot {
        self.session.snapshot()
    }

    /// True while the flow idles on an SMS code, the only states where a
    /// resend request is honored.
    #[must_use]
    pub fn awaiting_sms_proof(&self) -> bool {
        matches!(
            self.session.state,
            FlowState::PrimaryPending {
                method: PrimaryMethod::Phone,
                phase: PendingPhase::AwaitingProof,
            } | FlowState::StepUpPending {
                method: SecondaryMethod::Phone,
                phase: PendingPhase::AwaitingProof,
            }
        )
    }

    /// Apply a subscriber event. Events that make no sense in the current
    /// state are ignored; invalid input is refused without moving the
    /// flow or charging the budget.
    pub fn apply(&mut self, event: FlowEvent) -> Transition {
        debug!(
            flow_id = %self.session.id,
            state = self.session.state.name(),
            event = event.name(),
            "Applying event"
        );
        match event {
            FlowEvent::SelectMethod(method) => self.on_select_method(method),
            FlowEvent::SubmitPrimary(submission) => self.on_submit_primary(submission),
            FlowEvent::SubmitProof { code } => self.on_submit_proof(&code),
            FlowEvent::ResendCode => self.on_resend_code(),
            FlowEvent::SelectRole(role) => self.on_select_role(role),
            FlowEvent::SelectSecondary(method) => self.on_select_secondary(method),
            FlowEvent::SubmitSecondary(submission) => self.on_submit_secondary(submission),
            FlowEvent::Skip => self.on_skip(),
            FlowEvent::Retry => self.on_retry(),
            // Teardown happens in the driver; the machine never sees this.
            FlowEvent::Abandon => Transition::none(),
        }
    }

    /// Feed back the result of the call the last transition requested.
    pub fn resolve(&mut self, outcome: CallOutcome) -> Transition {
        let state = self.session.state.clone();
        match (state, outcome) {
            (
                FlowState::PrimaryPending {
                    method,
                    phase: PendingPhase::Initiating,
                },
                CallOutcome::Auth(result),
            ) => self.primary_auth_resolved(method, result),
            (
                FlowState::PrimaryPending {
                    method: PrimaryMethod::Phone,
                    phase: PendingPhase::Initiating | PendingPhase::AwaitingProof,
                },
                CallOutcome::OtpSent(result),
            ) => self.otp_send_resolved(result, FailureStage::Primary),
            (
                FlowState::PrimaryPending {
                    method,
                    phase: PendingPhase::Completing,
                },
                CallOutcome::Auth(result),
            ) => self.primary_auth_resolved(method, result),
            (
                FlowState::PrimaryPending {
                    phase: PendingPhase::CheckingStatus,
                    ..
                },
                CallOutcome::Status(status),
            )
            | (
                FlowState::RoleSelection {
                    awaiting_status: true,
                },
                CallOutcome::Status(status),
            ) => self.status_resolved(status, false),
            (
                FlowState::StepUpSelection {
                    refreshing: true, ..
                },
                CallOutcome::Status(status),
            ) => self.status_resolved(status, true),
            (
                FlowState::StepUpPending {
                    method: SecondaryMethod::Phone,
                    phase: PendingPhase::Initiating | PendingPhase::AwaitingProof,
                },
                CallOutcome::OtpSent(result),
            ) => self.otp_send_resolved(result, FailureStage::StepUpSend),
            (
                FlowState::StepUpPending {
                    phase: PendingPhase::Completing,
                    ..
                },
                CallOutcome::Auth(result),
            ) => self.step_up_auth_resolved(result),
            (state, outcome) => {
                warn!(
                    flow_id = %self.session.id,
                    state = state.name(),
                    outcome = outcome.name(),
                    "Dropping call outcome the current state does not expect"
                );
                Transition::none()
            }
        }
    }

    fn on_select_method(&mut self, method: PrimaryMethod) -> Transition {
        if self.session.state != FlowState::MethodSelection {
            return self.ignore("select_method");
        }
        self.session.primary_method = Some(method);
        Transition::changed()
    }

    fn on_submit_primary(&mut self, submission: PrimarySubmission) -> Transition {
        if self.session.state != FlowState::MethodSelection {
            return self.ignore("submit_primary");
        }
        let method = submission.method();
        let call = match submission {
            PrimarySubmission::Email { email, password } => {
                let email = match EmailAddress::parse(&email) {
                    Ok(email) => email,
                    Err(reason) => return Transition::refusal(policy::validation_record(reason)),
                };
                let password = match Password::parse(&password) {
                    Ok(password) => password,
                    Err(reason) => return Transition::refusal(policy::validation_record(reason)),
                };
                self.session.inputs.email = Some(email.clone());
                self.session.inputs.password = Some(password.clone());
                match self.session.kind {
                    FlowKind::SignIn => Call::Login { email, password },
                    FlowKind::SignUp => Call::Signup {
                        profile: SignupProfile { email, password },
                    },
                }
            }
            PrimarySubmission::Phone { phone } => {
                let phone = match PhoneNumber::parse(&phone) {
                    Ok(phone) => phone,
                    Err(reason) => return Transition::refusal(policy::validation_record(reason)),
                };
                self.session.inputs.phone = Some(phone.clone());
                Call::SendOtp { phone }
            }
            PrimarySubmission::Wallet => Call::ConnectWallet,
        };
        self.session.primary_method = Some(method);
        self.session.state = FlowState::PrimaryPending {
            method,
            phase: PendingPhase::Initiating,
        };
        Transition::changed_with_call(call)
    }

    fn on_submit_proof(&mut self, code: &str) -> Transition {
        let (next_state, channel) = match &self.session.state {
            FlowState::PrimaryPending {
                method: PrimaryMethod::Phone,
                phase: PendingPhase::AwaitingProof,
            } => (
                FlowState::PrimaryPending {
                    method: PrimaryMethod::Phone,
                    phase: PendingPhase::Completing,
                },
                OtpChannel::Sms,
            ),
            FlowState::StepUpPending {
                method,
                phase: PendingPhase::AwaitingProof,
            } => (
                FlowState::StepUpPending {
                    method: *method,
                    phase: PendingPhase::Completing,
                },
                method.channel(),
            ),
            _ => return self.ignore("submit_proof"),
        };
        let code = match OtpCode::parse(code) {
            Ok(code) => code,
            Err(reason) => return Transition::refusal(policy::validation_record(reason)),
        };
        self.session.state = next_state;
        Transition::changed_with_call(Call::VerifyOtp { code, channel })
    }

    fn on_resend_code(&mut self) -> Transition {
        match &self.session.state {
            FlowState::PrimaryPending {
                method: PrimaryMethod::Phone,
                phase: PendingPhase::AwaitingProof,
            }
            | FlowState::StepUpPending {
                method: SecondaryMethod::Phone,
                phase: PendingPhase::AwaitingProof,
            } => match self.session.last_delivery.clone() {
                Some(phone) => Transition {
                    call: Some(Call::SendOtp { phone }),
                    ..Transition::default()
                },
                None => Transition::refusal(policy::validation_record("No code has been sent yet")),
            },
            FlowState::StepUpPending {
                method: SecondaryMethod::Authenticator,
                phase: PendingPhase::AwaitingProof,
            } => Transition::refusal(policy::validation_record(
                "Authenticator codes are generated by your app",
            )),
            _ => self.ignore("resend_code"),
        }
    }

    fn on_select_role(&mut self, role: AccountRole) -> Transition {
        let FlowState::RoleSelection {
            awaiting_status: false,
        } = &self.session.state
        else {
            return self.ignore("select_role");
        };
        let user_id = match self.primary_user_id() {
            Ok(user_id) => user_id,
            Err(err) => return self.fail(err, FailureStage::Primary),
        };
        self.session.role = Some(role);
        self.session.state = FlowState::RoleSelection {
            awaiting_status: true,
        };
        Transition::changed_with_call(Call::FetchStatus { user_id })
    }

    fn on_select_secondary(&mut self, method: SecondaryMethod) -> Transition {
        let FlowState::StepUpSelection {
            refreshing: false, ..
        } = &self.session.state
        else {
            return self.ignore("select_secondary");
        };
        self.session.secondary_method = Some(method);
        Transition::changed()
    }

    fn on_submit_secondary(&mut self, submission: SecondarySubmission) -> Transition {
        let FlowState::StepUpSelection {
            refreshing: false, ..
        } = &self.session.state
        else {
            return self.ignore("submit_secondary");
        };
        match submission {
            SecondarySubmission::Phone { phone } => {
                let phone = match self.step_up_phone(phone.as_deref()) {
                    Ok(phone) => phone,
                    Err(record) => return Transition::refusal(record),
                };
                self.session.secondary_method = Some(SecondaryMethod::Phone);
                self.session.state = FlowState::StepUpPending {
                    method: SecondaryMethod::Phone,
                    phase: PendingPhase::Initiating,
                };
                Transition::changed_with_call(Call::SendOtp { phone })
            }
            SecondarySubmission::Authenticator => {
                self.session.secondary_method = Some(SecondaryMethod::Authenticator);
                self.session.last_delivery = None;
                self.session.state = FlowState::StepUpPending {
                    method: SecondaryMethod::Authenticator,
                    phase: PendingPhase::AwaitingProof,
                };
                Transition::changed()
            }
        }
    }

    fn on_skip(&mut self) -> Transition {
        let FlowState::StepUpSelection {
            status,
            refreshing: false,
        } = &self.session.state
        else {
            return self.ignore("skip");
        };
        let status = *status;
        let user_id = match self.primary_user_id() {
            Ok(user_id) => user_id,
            Err(err) => return self.fail(err, FailureStage::StepUpVerify),
        };
        self.session.state = FlowState::StepUpSelection {
            status,
            refreshing: true,
        };
        Transition::changed_with_call(Call::FetchStatus { user_id })
    }

    fn on_retry(&mut self) -> Transition {
        let FlowState::Error { record } = &self.session.state else {
            return self.ignore("retry");
        };
        if !record.retryable {
            let record = record.clone();
            warn!(
                flow_id = %self.session.id,
                code = %record.code,
                "Retry refused; failure is terminal"
            );
            return Transition::refusal(record);
        }
        self.session.state = FlowState::MethodSelection;
        self.session.secondary_method = None;
        self.session.role = None;
        self.session.primary_auth = None;
        self.session.last_delivery = None;
        Transition::changed()
    }

    fn primary_auth_resolved(
        &mut self,
        method: PrimaryMethod,
        result: Result<AuthResult, VerifierError>,
    ) -> Transition {
        let auth = match result {
            Ok(auth) => auth,
            Err(err) => return self.fail(err, FailureStage::Primary),
        };
        let principal = match auth.require_principal() {
            Ok(principal) => principal.clone(),
            Err(err) => return self.fail(err, FailureStage::Primary),
        };
        self.session.primary_auth = Some(auth);
        info!(
            flow_id = %self.session.id,
            user_id = %principal.user_id,
            method = method.as_str(),
            "Primary verification succeeded"
        );
        match self.session.kind {
            FlowKind::SignUp => {
                self.session.state = FlowState::RoleSelection {
                    awaiting_status: false,
                };
                Transition::changed()
            }
            FlowKind::SignIn => {
                self.session.state = FlowState::PrimaryPending {
                    method,
                    phase: PendingPhase::CheckingStatus,
                };
                Transition::changed_with_call(Call::FetchStatus {
                    user_id: principal.user_id,
                })
            }
        }
    }

    fn otp_send_resolved(
        &mut self,
        result: Result<OtpDelivery, VerifierError>,
        stage: FailureStage,
    ) -> Transition {
        let delivery = match result {
            Ok(delivery) => delivery,
            Err(err) => return self.fail(err, stage),
        };
        info!(
            flow_id = %self.session.id,
            destination = %delivery.destination,
            "One-time code sent"
        );
        self.session.last_delivery = Some(delivery.destination);
        self.session.state = match stage {
            FailureStage::Primary => FlowState::PrimaryPending {
                method: PrimaryMethod::Phone,
                phase: PendingPhase::AwaitingProof,
            },
            FailureStage::StepUpSend | FailureStage::StepUpVerify => FlowState::StepUpPending {
                method: SecondaryMethod::Phone,
                phase: PendingPhase::AwaitingProof,
            },
        };
        Transition::changed()
    }

    fn status_resolved(&mut self, status: VerificationStatus, from_skip: bool) -> Transition {
        if status.can_skip_second_factor() {
            return self.complete();
        }
        debug!(
            flow_id = %self.session.id,
            email_verified = status.email_verified,
            phone_verified = status.phone_verified,
            wallet_connected = status.wallet_connected,
            "Second factor required"
        );
        self.session.state = FlowState::StepUpSelection {
            status,
            refreshing: false,
        };
        let mut transition = Transition::changed();
        if from_skip {
            transition.raised = Some(policy::validation_record(
                "Verification is still required before skipping",
            ));
        }
        transition
    }

    fn step_up_auth_resolved(&mut self, result: Result<AuthResult, VerifierError>) -> Transition {
        let auth = match result {
            Ok(auth) => auth,
            Err(err) => return self.fail(err, FailureStage::StepUpVerify),
        };
        // Step-up values win; the primary result backfills what they lack.
        let primary = self.session.primary_auth.take().unwrap_or_default();
        let merged = AuthResult {
            principal: auth.principal.or(primary.principal),
            session_token: auth.session_token.or(primary.session_token),
        };
        if let Err(err) = merged.require_principal() {
            return self.fail(err, FailureStage::StepUpVerify);
        }
        self.session.primary_auth = Some(merged);
        self.complete()
    }

    fn complete(&mut self) -> Transition {
        let auth = self.session.primary_auth.take().unwrap_or_default();
        let Some(principal) = auth.principal else {
            return self.fail(
                VerifierError::new(
                    ErrorCode::MissingIdentity,
                    "no verified identity on record",
                ),
                FailureStage::Primary,
            );
        };
        let completed = CompletedAuth {
            flow_id: self.session.id.to_string(),
            kind: self.session.kind,
            principal,
            session_token: auth.session_token,
            role: self.session.role,
            retry_count: self.session.retry_count,
        };
        info!(
            flow_id = %self.session.id,
            user_id = %completed.principal.user_id,
            retry_count = completed.retry_count,
            "Flow completed"
        );
        self.session.state = FlowState::Success;
        self.session.inputs.clear();
        self.session.last_delivery = None;
        Transition {
            state_changed: true,
            completed: Some(completed),
            ..Transition::default()
        }
    }

    fn fail(&mut self, error: VerifierError, stage: FailureStage) -> Transition {
        self.session.retry_count += 1;
        let record = policy::classify(
            &error,
            &ErrorContext {
                stage,
                retry_count: self.session.retry_count,
            },
        );
        warn!(
            flow_id = %self.session.id,
            stage = stage.as_str(),
            code = %record.code,
            retry_count = self.session.retry_count,
            "Verification failed: {error}"
        );
        self.session.state = FlowState::Error {
            record: record.clone(),
        };
        Transition {
            state_changed: true,
            raised: Some(record),
            ..Transition::default()
        }
    }

    /// Phone to send a step-up code to: the submitted number, the
    /// collected primary phone, or the principal's phone, in that order.
    fn step_up_phone(&self, submitted: Option<&str>) -> Result<PhoneNumber, ErrorRecord> {
        if let Some(raw) = submitted {
            return PhoneNumber::parse(raw).map_err(|reason| policy::validation_record(reason));
        }
        if let Some(phone) = &self.session.inputs.phone {
            return Ok(phone.clone());
        }
        if let Some(phone) = self
            .session
            .primary_auth
            .as_ref()
            .and_then(|auth| auth.principal.as_ref())
            .and_then(|principal| principal.phone.clone())
        {
            return Ok(phone);
        }
        Err(policy::validation_record(
            "A phone number is required for SMS verification",
        ))
    }

    fn primary_user_id(&self) -> Result<Uuid, VerifierError> {
        self.session
            .primary_auth
            .as_ref()
            .and_then(|auth| auth.principal.as_ref())
            .map(|principal| principal.user_id)
            .ok_or_else(|| {
                VerifierError::new(ErrorCode::MissingIdentity, "no verified identity on record")
            })
    }

    fn ignore(&self, event: &'static str) -> Transition {
        debug!(
            flow_id = %self.session.id,
            state = self.session.state.name(),
            event,
            "Ignoring event in current state"
        );
        Transition::none()
    }
}
