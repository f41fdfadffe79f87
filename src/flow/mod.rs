//! Authentication flow orchestration.
//!
//! Flow Overview:
//! 1) A [`FlowMachine`] holds one session and decides every transition:
//!    events and call outcomes go in, state changes, raised records, and
//!    verifier calls come out.
//! 2) [`FlowController`] drives a machine on its own task, executes the
//!    calls against the configured verifiers, and publishes
//!    notifications to the subscriber.
//! 3) Sign-in runs primary verification, checks verification status, and
//!    steps up when no contact channel is verified. Sign-up adds role
//!    selection before the status check.

pub mod controller;
pub mod event;
pub mod machine;
pub mod session;
pub mod state;

pub use controller::{FlowController, FlowHandle, FlowNotifications};
pub use event::{FlowEvent, FlowNotification, PrimarySubmission, SecondarySubmission};
pub use machine::{Call, CallOutcome, FlowMachine, Transition};
pub use session::{
    AccountRole, CompletedAuth, FlowKind, FlowSession, PrimaryMethod, SecondaryMethod,
};
pub use state::{FlowSnapshot, FlowState, PendingPhase};
