//! In-memory verifiers for demos and tests.
//!
//! Each stub pops scripted outcomes from a queue and falls back to a
//! plain success once the script runs dry. Calls are counted, SMS
//! destinations and submitted codes are captured, and an optional
//! [`Gate`] holds a call open until the caller releases it.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use super::{
    AuthResult, CredentialVerifier, OtpChannel, OtpDelivery, OtpVerifier, Principal, SessionToken,
    SignatureVerifier, StatusProvider, Verifiers,
};
use crate::error::VerifierError;
use crate::input::{EmailAddress, OtpCode, Password, PhoneNumber, SignupProfile};
use crate::status::VerificationStatus;

/// An [`AuthResult`] carrying a fresh principal and token.
#[must_use]
pub fn verified_identity() -> AuthResult {
    AuthResult {
        principal: Some(Principal {
            user_id: Uuid::new_v4(),
            email: None,
            phone: None,
        }),
        session_token: Some(SessionToken::new("stub-session")),
    }
}

/// Holds stub calls open until released. Permits are stored, so releasing
/// before the call arrives also works; each release lets one call through.
#[derive(Clone, Default)]
pub struct Gate {
    notify: Arc<Notify>,
}

impl Gate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn release(&self) {
        self.notify.notify_one();
    }

    async fn pass(&self) {
        self.notify.notified().await;
    }
}

async fn hold_at(gate: &Mutex<Option<Gate>>) {
    let held = gate.lock().await.clone();
    if let Some(gate) = held {
        gate.pass().await;
    }
}

async fn next_scripted<T>(script: &Mutex<VecDeque<T>>, fallback: impl FnOnce() -> T) -> T {
    script.lock().await.pop_front().unwrap_or_else(fallback)
}

#[derive(Default)]
pub struct StubCredentialVerifier {
    login_script: Mutex<VecDeque<Result<AuthResult, VerifierError>>>,
    signup_script: Mutex<VecDeque<Result<AuthResult, VerifierError>>>,
    login_calls: AtomicUsize,
    signup_calls: AtomicUsize,
    gate: Mutex<Option<Gate>>,
}

impl StubCredentialVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn script_login(&self, outcome: Result<AuthResult, VerifierError>) {
        self.login_script.lock().await.push_back(outcome);
    }

    pub async fn script_signup(&self, outcome: Result<AuthResult, VerifierError>) {
        self.signup_script.lock().await.push_back(outcome);
    }

    pub async fn hold_with(&self, gate: Gate) {
        *self.gate.lock().await = Some(gate);
    }

    #[must_use]
    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn signup_calls(&self) -> usize {
        self.signup_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CredentialVerifier for StubCredentialVerifier {
    async fn login(
        &self,
        _email: &EmailAddress,
        _password: &Password,
    ) -> Result<AuthResult, VerifierError> {
        self.login_calls.fetch_add(1, Ordering::Relaxed);
        hold_at(&self.gate).await;
        next_scripted(&self.login_script, || Ok(verified_identity())).await
    }

    async fn signup(&self, _profile: &SignupProfile) -> Result<AuthResult, VerifierError> {
        self.signup_calls.fetch_add(1, Ordering::Relaxed);
        hold_at(&self.gate).await;
        next_scripted(&self.signup_script, || Ok(verified_identity())).await
    }
}

#[derive(Default)]
pub struct StubOtpVerifier {
    send_script: Mutex<VecDeque<Result<(), VerifierError>>>,
    verify_script: Mutex<VecDeque<Result<AuthResult, VerifierError>>>,
    deliveries: Mutex<Vec<PhoneNumber>>,
    codes: Mutex<Vec<(OtpCode, OtpChannel)>>,
    send_calls: AtomicUsize,
    verify_calls: AtomicUsize,
    gate: Mutex<Option<Gate>>,
}

impl StubOtpVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn script_send(&self, outcome: Result<(), VerifierError>) {
        self.send_script.lock().await.push_back(outcome);
    }

    pub async fn script_verify(&self, outcome: Result<AuthResult, VerifierError>) {
        self.verify_script.lock().await.push_back(outcome);
    }

    pub async fn hold_with(&self, gate: Gate) {
        *self.gate.lock().await = Some(gate);
    }

    /// Destinations of every successful delivery, in send order.
    pub async fn deliveries(&self) -> Vec<PhoneNumber> {
        self.deliveries.lock().await.clone()
    }

    /// Every code handed to [`OtpVerifier::verify_otp`], with its channel.
    pub async fn submitted_codes(&self) -> Vec<(OtpCode, OtpChannel)> {
        self.codes.lock().await.clone()
    }

    #[must_use]
    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl OtpVerifier for StubOtpVerifier {
    async fn send_otp(&self, phone: &PhoneNumber) -> Result<OtpDelivery, VerifierError> {
        self.send_calls.fetch_add(1, Ordering::Relaxed);
        hold_at(&self.gate).await;
        next_scripted(&self.send_script, || Ok(())).await?;
        self.deliveries.lock().await.push(phone.clone());
        Ok(OtpDelivery {
            destination: phone.clone(),
        })
    }

    async fn verify_otp(
        &self,
        code: &OtpCode,
        channel: OtpChannel,
    ) -> Result<AuthResult, VerifierError> {
        self.verify_calls.fetch_add(1, Ordering::Relaxed);
        hold_at(&self.gate).await;
        self.codes.lock().await.push((code.clone(), channel));
        next_scripted(&self.verify_script, || Ok(verified_identity())).await
    }
}

#[derive(Default)]
pub struct StubSignatureVerifier {
    script: Mutex<VecDeque<Result<AuthResult, VerifierError>>>,
    calls: AtomicUsize,
    gate: Mutex<Option<Gate>>,
}

impl StubSignatureVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn script_connect(&self, outcome: Result<AuthResult, VerifierError>) {
        self.script.lock().await.push_back(outcome);
    }

    pub async fn hold_with(&self, gate: Gate) {
        *self.gate.lock().await = Some(gate);
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SignatureVerifier for StubSignatureVerifier {
    async fn connect(&self) -> Result<AuthResult, VerifierError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        hold_at(&self.gate).await;
        next_scripted(&self.script, || Ok(verified_identity())).await
    }
}

#[derive(Default)]
pub struct StubStatusProvider {
    status: Mutex<VerificationStatus>,
    calls: AtomicUsize,
    gate: Mutex<Option<Gate>>,
}

impl StubStatusProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_status(status: VerificationStatus) -> Self {
        Self {
            status: Mutex::new(status),
            ..Self::default()
        }
    }

    /// Change what the next status check reports.
    pub async fn set_status(&self, status: VerificationStatus) {
        *self.status.lock().await = status;
    }

    pub async fn hold_with(&self, gate: Gate) {
        *self.gate.lock().await = Some(gate);
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl StatusProvider for StubStatusProvider {
    async fn get_status(&self, _user_id: Uuid) -> Result<VerificationStatus, VerifierError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        hold_at(&self.gate).await;
        Ok(*self.status.lock().await)
    }
}

/// All four stubs wired together, each still reachable for scripting and
/// inspection after the bundle is handed to a flow.
pub struct StubVerifiers {
    pub credentials: Arc<StubCredentialVerifier>,
    pub otp: Arc<StubOtpVerifier>,
    pub signature: Arc<StubSignatureVerifier>,
    pub status: Arc<StubStatusProvider>,
}

impl StubVerifiers {
    #[must_use]
    pub fn new() -> Self {
        Self {
            credentials: Arc::new(StubCredentialVerifier::new()),
            otp: Arc::new(StubOtpVerifier::new()),
            signature: Arc::new(StubSignatureVerifier::new()),
            status: Arc::new(StubStatusProvider::new()),
        }
    }

    /// Bundle the stubs for [`crate::flow::FlowController::spawn`].
    #[must_use]
    pub fn verifiers(&self) -> Arc<Verifiers> {
        Arc::new(Verifiers::new(
            Arc::clone(&self.credentials) as Arc<dyn CredentialVerifier>,
            Arc::clone(&self.otp) as Arc<dyn OtpVerifier>,
            Arc::clone(&self.signature) as Arc<dyn SignatureVerifier>,
            Arc::clone(&self.status) as Arc<dyn StatusProvider>,
        ))
    }
}

impl Default for StubVerifiers {
    fn default() -> Self {
        Self::new()
    }
}
