//! Verifier adapter contracts.
//!
//! The engine talks to credential backends exclusively through these
//! traits. Each is object-safe and held behind `Arc<dyn …>` so hosts can
//! swap real backends for the in-memory stubs in [`stubs`]. Every method
//! returns [`VerifierError`] on failure; classification into user-facing
//! records happens in the policy engine, never here.

pub mod stubs;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ErrorCode, VerifierError};
use crate::input::{EmailAddress, OtpCode, Password, PhoneNumber, SignupProfile};
use crate::status::VerificationStatus;

/// The authenticated identity a successful verifier call resolves to.
#[derive(Clone, Debug, Serialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: Option<EmailAddress>,
    pub phone: Option<PhoneNumber>,
}

/// Opaque session credential minted by a backend. `Debug` never reveals
/// the value.
#[derive(Clone)]
pub struct SessionToken(SecretString);

impl SessionToken {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(SecretString::from(raw.into()))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("SessionToken(***)")
    }
}

/// What a completing verifier call hands back.
///
/// A backend may omit the principal (for example a half-provisioned
/// account); the flow treats that as a failure at the identity gate rather
/// than completing without an identity.
#[derive(Clone, Debug, Default)]
pub struct AuthResult {
    pub principal: Option<Principal>,
    pub session_token: Option<SessionToken>,
}

impl AuthResult {
    /// The identity gate: a success without a principal is converted into
    /// a [`VerifierError`] with [`ErrorCode::MissingIdentity`].
    pub fn require_principal(&self) -> Result<&Principal, VerifierError> {
        self.principal.as_ref().ok_or_else(|| {
            VerifierError::new(
                ErrorCode::MissingIdentity,
                "verification succeeded without an identity",
            )
        })
    }
}

/// Receipt for a dispatched one-time code.
#[derive(Clone, Debug)]
pub struct OtpDelivery {
    /// Number the code went to; rendered masked.
    pub destination: PhoneNumber,
}

/// Which proof source a one-time code comes from. SMS codes are delivered
/// by [`OtpVerifier::send_otp`]; authenticator codes come from the user's
/// TOTP app and involve no delivery step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OtpChannel {
    Sms,
    Authenticator,
}

impl OtpChannel {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Authenticator => "authenticator",
        }
    }
}

impl fmt::Display for OtpChannel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Email/password backend. Login and signup are single fused calls; there
/// is no separate completion step.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn login(
        &self,
        email: &EmailAddress,
        password: &Password,
    ) -> Result<AuthResult, VerifierError>;

    async fn signup(&self, profile: &SignupProfile) -> Result<AuthResult, VerifierError>;
}

/// One-time-code backend covering SMS delivery and code verification for
/// both channels.
#[async_trait]
pub trait OtpVerifier: Send + Sync {
    async fn send_otp(&self, phone: &PhoneNumber) -> Result<OtpDelivery, VerifierError>;

    async fn verify_otp(
        &self,
        code: &OtpCode,
        channel: OtpChannel,
    ) -> Result<AuthResult, VerifierError>;
}

/// Wallet backend. Connect and signature verification are one fused call.
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    async fn connect(&self) -> Result<AuthResult, VerifierError>;
}

/// Source of truth for which factors a user has already verified.
#[async_trait]
pub trait StatusProvider: Send + Sync {
    async fn get_status(&self, user_id: Uuid) -> Result<VerificationStatus, VerifierError>;
}

/// Bundle of the four adapters a flow needs, shared across flow tasks.
pub struct Verifiers {
    credentials: Arc<dyn CredentialVerifier>,
    otp: Arc<dyn OtpVerifier>,
    signature: Arc<dyn SignatureVerifier>,
    status: Arc<dyn StatusProvider>,
}

impl Verifiers {
    pub fn new(
        credentials: Arc<dyn CredentialVerifier>,
        otp: Arc<dyn OtpVerifier>,
        signature: Arc<dyn SignatureVerifier>,
        status: Arc<dyn StatusProvider>,
    ) -> Self {
        Self {
            credentials,
            otp,
            signature,
            status,
        }
    }

    #[must_use]
    pub fn credentials(&self) -> Arc<dyn CredentialVerifier> {
        Arc::clone(&self.credentials)
    }

    #[must_use]
    pub fn otp(&self) -> Arc<dyn OtpVerifier> {
        Arc::clone(&self.otp)
    }

    #[must_use]
    pub fn signature(&self) -> Arc<dyn SignatureVerifier> {
        Arc::clone(&self.signature)
    }

    #[must_use]
    pub fn status(&self) -> Arc<dyn StatusProvider> {
        Arc::clone(&self.status)
    }
}
