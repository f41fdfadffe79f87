//! # Authflow (Multi-Factor Authentication Flow Engine)
//!
//! `authflow` orchestrates multi-step authentication flows. It models sign-in
//! and sign-up as small state machines, drives external verifiers (credentials,
//! OTP, wallet signatures, verification status) through async tasks, and
//! reports progress to the embedding frontend as a stream of notifications.
//!
//! ## Flow Model
//!
//! Each flow is a session-scoped state machine:
//!
//! - **Primary factor:** email + password, phone OTP, or a wallet signature.
//! - **Step-up factor:** SMS or authenticator app codes, required unless the
//!   account already holds a verified email or phone.
//! - **Sign-up extras:** new accounts pick a role before the step-up stage.
//!
//! ## Failure Policy
//!
//! Verifier failures are classified once, centrally. Retryable failures consume
//! a shared per-flow budget of three attempts; permanent failures route the
//! user to support immediately. Input validation problems are surfaced without
//! touching the budget.
//!
//! ## Driving a Flow
//!
//! [`flow::FlowController::spawn`] starts the background task and hands back a
//! [`flow::FlowHandle`] for events plus [`flow::FlowNotifications`] for state
//! changes, raised errors, and the final completion. Dropping either side tears
//! the flow down.

pub mod cli;
pub mod config;
pub mod error;
pub mod flow;
pub mod input;
pub mod policy;
pub mod status;
pub mod verifier;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
