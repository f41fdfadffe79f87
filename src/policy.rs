//! Retry budget and error recovery policy.
//!
//! [`classify`] is a pure function from a verifier failure and its context
//! to the [`ErrorRecord`] a subscriber sees. Calling it twice with the
//! same inputs yields the same record; it touches no clock and no state.

use crate::error::{ErrorCode, ErrorRecord, RecoveryAction, VerifierError};

/// Failed attempts a flow may accumulate before it is terminally refused.
/// Global policy, not configuration.
pub const MAX_RETRIES: u32 = 3;

/// Which operation of the flow produced the failure; selects the message
/// prefix so the record reads in context.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureStage {
    Primary,
    StepUpSend,
    StepUpVerify,
}

impl FailureStage {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::StepUpSend => "step_up_send",
            Self::StepUpVerify => "step_up_verify",
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            Self::Primary => "Primary authentication failed",
            Self::StepUpSend => "Could not send verification code",
            Self::StepUpVerify => "Second factor verification failed",
        }
    }
}

/// Everything classification depends on. `retry_count` is the budget
/// already consumed, the failure being classified included.
#[derive(Clone, Copy, Debug)]
pub struct ErrorContext {
    pub stage: FailureStage,
    pub retry_count: u32,
}

/// Normalize a verifier failure into the record the error state carries.
///
/// Permanent failures are never retryable regardless of remaining budget;
/// the failure that spends the last budget slot is replaced by the
/// exhaustion record; everything else is retryable.
#[must_use]
pub fn classify(error: &VerifierError, context: &ErrorContext) -> ErrorRecord {
    if error.is_permanent() {
        return ErrorRecord {
            message: format!("{}: {}", context.stage.prefix(), error.message()),
            code: error.code(),
            retryable: false,
            recovery: RecoveryAction::ContactSupport,
        };
    }

    if context.retry_count >= MAX_RETRIES {
        return exhaustion_record();
    }

    ErrorRecord {
        message: format!("{}: {}", context.stage.prefix(), error.message()),
        code: error.code(),
        retryable: true,
        recovery: RecoveryAction::Retry,
    }
}

/// The terminal record raised when the retry budget is spent.
#[must_use]
pub fn exhaustion_record() -> ErrorRecord {
    ErrorRecord {
        message: "Maximum retry attempts exceeded".to_string(),
        code: ErrorCode::RetriesExhausted,
        retryable: false,
        recovery: RecoveryAction::GoHome,
    }
}

/// Record for input rejected locally. Never consumes a retry slot and
/// never moves the flow.
#[must_use]
pub fn validation_record(message: impl Into<String>) -> ErrorRecord {
    ErrorRecord {
        message: message.into(),
        code: ErrorCode::InvalidInput,
        retryable: true,
        recovery: RecoveryAction::Retry,
    }
}
