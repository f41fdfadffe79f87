//! Async flow driver.
//!
//! Flow Overview:
//! 1) [`FlowController::spawn`] creates a machine and a dedicated task,
//!    handing back a [`FlowHandle`] for events and a [`FlowNotifications`]
//!    stream for the subscriber.
//! 2) The task feeds events to the machine and executes each requested
//!    verifier call under the configured deadline, at most one in flight.
//!    While a call runs, every event except `Abandon` is dropped.
//! 3) Notifications follow transition order: the new state first, then
//!    any raised record, then completion.
//! 4) `Abandon`, dropping the handle, or dropping the receiver tears the
//!    task down. A call still in flight is dropped with it; its late
//!    resolution is never observable.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::FlowConfig;
use crate::error::{FlowClosed, VerifierError};
use crate::flow::event::{FlowEvent, FlowNotification};
use crate::flow::machine::{Call, CallOutcome, FlowMachine, Transition};
use crate::flow::session::FlowKind;
use crate::policy;
use crate::status::StatusAggregator;
use crate::verifier::Verifiers;

type CallFuture = Pin<Box<dyn Future<Output = CallOutcome> + Send>>;

/// Sends events into a running flow. Dropping every handle abandons the
/// flow.
#[derive(Clone)]
pub struct FlowHandle {
    events: mpsc::UnboundedSender<FlowEvent>,
}

impl FlowHandle {
    /// Queue an event for the flow task.
    ///
    /// # Errors
    /// Returns [`FlowClosed`] once the flow has completed or been
    /// abandoned.
    pub fn dispatch(&self, event: FlowEvent) -> Result<(), FlowClosed> {
        self.events.send(event).map_err(|_| FlowClosed)
    }
}

/// Receiving side of a flow's notification stream. The stream ends when
/// the flow does.
pub struct FlowNotifications {
    inner: mpsc::UnboundedReceiver<FlowNotification>,
}

impl FlowNotifications {
    pub async fn recv(&mut self) -> Option<FlowNotification> {
        self.inner.recv().await
    }
}

pub struct FlowController;

impl FlowController {
    /// Start a flow task and return its handle and notification stream.
    /// The first notification is always the initial state snapshot.
    #[must_use]
    pub fn spawn(
        kind: FlowKind,
        verifiers: Arc<Verifiers>,
        config: FlowConfig,
    ) -> (FlowHandle, FlowNotifications) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();

        let machine = FlowMachine::new(kind);
        info!(
            flow_id = %machine.session().id(),
            kind = kind.as_str(),
            "Starting authentication flow"
        );
        tokio::spawn(run_flow(machine, verifiers, config, event_rx, notify_tx));

        (
            FlowHandle { events: event_tx },
            FlowNotifications { inner: notify_rx },
        )
    }
}

/// What the driver loop woke up for.
enum Step {
    Event(Option<FlowEvent>),
    Outcome(CallOutcome),
    SubscriberGone,
}

async fn run_flow(
    mut machine: FlowMachine,
    verifiers: Arc<Verifiers>,
    config: FlowConfig,
    mut events: mpsc::UnboundedReceiver<FlowEvent>,
    notifications: mpsc::UnboundedSender<FlowNotification>,
) {
    let flow_id = machine.session().id();
    let mut in_flight: Option<CallFuture> = None;
    let mut last_send: Option<Instant> = None;

    if !publish(
        &notifications,
        FlowNotification::StateChanged(machine.snapshot()),
    ) {
        return;
    }

    loop {
        let call_running = in_flight.is_some();
        let step = tokio::select! {
            maybe_event = events.recv() => Step::Event(maybe_event),
            outcome = next_outcome(&mut in_flight), if call_running => Step::Outcome(outcome),
            () = notifications.closed() => Step::SubscriberGone,
        };

        let transition = match step {
            Step::SubscriberGone => {
                info!(flow_id = %flow_id, "Notification receiver dropped; abandoning flow");
                break;
            }
            Step::Event(None) => {
                info!(flow_id = %flow_id, "Flow handle dropped; abandoning flow");
                break;
            }
            Step::Event(Some(FlowEvent::Abandon)) => {
                info!(flow_id = %flow_id, "Flow abandoned");
                break;
            }
            Step::Event(Some(event)) if call_running => {
                warn!(
                    flow_id = %flow_id,
                    event = event.name(),
                    "Dropping event while a verifier call is in flight"
                );
                continue;
            }
            Step::Event(Some(FlowEvent::ResendCode))
                if machine.awaiting_sms_proof()
                    && within_cooldown(last_send, config.resend_cooldown()) =>
            {
                debug!(flow_id = %flow_id, "Resend refused inside the cooldown window");
                let record =
                    policy::validation_record("Please wait before requesting another code");
                if !publish(&notifications, FlowNotification::ErrorRaised(record)) {
                    break;
                }
                continue;
            }
            Step::Event(Some(event)) => machine.apply(event),
            Step::Outcome(outcome) => {
                in_flight = None;
                if matches!(&outcome, CallOutcome::OtpSent(Ok(_))) {
                    last_send = Some(Instant::now());
                }
                machine.resolve(outcome)
            }
        };

        let Transition {
            state_changed,
            raised,
            call,
            completed,
        } = transition;

        if let Some(call) = call {
            debug!(flow_id = %flow_id, call = call.describe(), "Executing verifier call");
            in_flight = Some(execute_call(call, &verifiers, config.verifier_timeout()));
        }

        if state_changed
            && !publish(
                &notifications,
                FlowNotification::StateChanged(machine.snapshot()),
            )
        {
            break;
        }
        if let Some(record) = raised {
            if !publish(&notifications, FlowNotification::ErrorRaised(record)) {
                break;
            }
        }
        if let Some(completed) = completed {
            let _ = publish(&notifications, FlowNotification::Completed(completed));
            break;
        }
    }

    debug!(flow_id = %flow_id, "Flow task finished");
}

/// Poll the in-flight call, or park forever if there is none. Guarded by
/// the select precondition, so the parked arm is never taken.
async fn next_outcome(slot: &mut Option<CallFuture>) -> CallOutcome {
    match slot.as_mut() {
        Some(call) => call.await,
        None => std::future::pending().await,
    }
}

fn publish(
    notifications: &mpsc::UnboundedSender<FlowNotification>,
    notification: FlowNotification,
) -> bool {
    debug!(notification = notification.name(), "Publishing notification");
    notifications.send(notification).is_ok()
}

fn within_cooldown(last_send: Option<Instant>, cooldown: Duration) -> bool {
    last_send.is_some_and(|at| at.elapsed() < cooldown)
}

fn execute_call(call: Call, verifiers: &Arc<Verifiers>, deadline: Duration) -> CallFuture {
    let operation = call.describe();
    match call {
        Call::Login { email, password } => {
            let credentials = verifiers.credentials();
            Box::pin(async move {
                CallOutcome::Auth(
                    with_deadline(deadline, operation, credentials.login(&email, &password)).await,
                )
            })
        }
        Call::Signup { profile } => {
            let credentials = verifiers.credentials();
            Box::pin(async move {
                CallOutcome::Auth(
                    with_deadline(deadline, operation, credentials.signup(&profile)).await,
                )
            })
        }
        Call::ConnectWallet => {
            let signature = verifiers.signature();
            Box::pin(async move {
                CallOutcome::Auth(with_deadline(deadline, operation, signature.connect()).await)
            })
        }
        Call::SendOtp { phone } => {
            let otp = verifiers.otp();
            Box::pin(async move {
                CallOutcome::OtpSent(with_deadline(deadline, operation, otp.send_otp(&phone)).await)
            })
        }
        Call::VerifyOtp { code, channel } => {
            let otp = verifiers.otp();
            Box::pin(async move {
                CallOutcome::Auth(
                    with_deadline(deadline, operation, otp.verify_otp(&code, channel)).await,
                )
            })
        }
        Call::FetchStatus { user_id } => {
            let aggregator = StatusAggregator::new(verifiers.status(), deadline);
            Box::pin(async move { CallOutcome::Status(aggregator.check_all(user_id).await) })
        }
    }
}

async fn with_deadline<T>(
    deadline: Duration,
    operation: &'static str,
    call: impl Future<Output = Result<T, VerifierError>>,
) -> Result<T, VerifierError> {
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, "Verifier call exceeded its deadline");
            Err(VerifierError::timed_out(operation))
        }
    }
}
