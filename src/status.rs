//! Verification status aggregation.
//!
//! Wraps a [`StatusProvider`] and answers one question for the flow: may
//! this user skip the second factor? Results are re-fetched on every call
//! so a factor verified mid-flow (for example an email link clicked in
//! another tab) is honored. An unreadable status is treated as
//! nothing-verified: the flow then requires step-up instead of failing.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use crate::verifier::StatusProvider;

/// Snapshot of which factors a user has verified. Derived on demand,
/// never stored.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct VerificationStatus {
    pub email_verified: bool,
    pub phone_verified: bool,
    pub wallet_connected: bool,
}

impl VerificationStatus {
    /// Wallet possession proves key control, not a reachable contact
    /// channel; it never satisfies the second factor.
    #[must_use]
    pub fn can_skip_second_factor(self) -> bool {
        self.email_verified || self.phone_verified
    }
}

/// Re-fetching facade over a [`StatusProvider`].
pub struct StatusAggregator {
    provider: Arc<dyn StatusProvider>,
    call_timeout: Duration,
}

impl StatusAggregator {
    pub fn new(provider: Arc<dyn StatusProvider>, call_timeout: Duration) -> Self {
        Self {
            provider,
            call_timeout,
        }
    }

    /// Fetch the current status for `user_id`. Provider failures and
    /// timeouts degrade to the all-false snapshot.
    pub async fn check_all(&self, user_id: Uuid) -> VerificationStatus {
        match tokio::time::timeout(self.call_timeout, self.provider.get_status(user_id)).await {
            Ok(Ok(status)) => status,
            Ok(Err(err)) => {
                warn!(user_id = %user_id, error = %err, "Verification status unavailable; requiring step-up");
                VerificationStatus::default()
            }
            Err(_) => {
                warn!(user_id = %user_id, "Verification status check timed out; requiring step-up");
                VerificationStatus::default()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::VerifierError;
    use async_trait::async_trait;

    struct FixedProvider(VerificationStatus);

    #[async_trait]
    impl StatusProvider for FixedProvider {
        async fn get_status(&self, _user_id: Uuid) -> Result<VerificationStatus, VerifierError> {
            Ok(self.0)
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl StatusProvider for FailingProvider {
        async fn get_status(&self, _user_id: Uuid) -> Result<VerificationStatus, VerifierError> {
            Err(VerifierError::unclassified("status backend unreachable"))
        }
    }

    struct HungProvider;

    #[async_trait]
    impl StatusProvider for HungProvider {
        async fn get_status(&self, _user_id: Uuid) -> Result<VerificationStatus, VerifierError> {
            std::future::pending().await
        }
    }

    #[test]
    fn wallet_never_satisfies_second_factor() {
        let wallet_only = VerificationStatus {
            wallet_connected: true,
            ..VerificationStatus::default()
        };
        assert!(!wallet_only.can_skip_second_factor());

        let email = VerificationStatus {
            email_verified: true,
            ..VerificationStatus::default()
        };
        let phone = VerificationStatus {
            phone_verified: true,
            ..VerificationStatus::default()
        };
        assert!(email.can_skip_second_factor());
        assert!(phone.can_skip_second_factor());
        assert!(!VerificationStatus::default().can_skip_second_factor());
    }

    #[tokio::test]
    async fn check_all_passes_provider_status_through() {
        let status = VerificationStatus {
            email_verified: true,
            phone_verified: false,
            wallet_connected: true,
        };
        let aggregator =
            StatusAggregator::new(Arc::new(FixedProvider(status)), Duration::from_secs(5));
        assert_eq!(aggregator.check_all(Uuid::new_v4()).await, status);
    }

    #[tokio::test]
    async fn check_all_degrades_on_provider_error() {
        let aggregator = StatusAggregator::new(Arc::new(FailingProvider), Duration::from_secs(5));
        let status = aggregator.check_all(Uuid::new_v4()).await;
        assert_eq!(status, VerificationStatus::default());
        assert!(!status.can_skip_second_factor());
    }

    #[tokio::test(start_paused = true)]
    async fn check_all_degrades_on_timeout() {
        let aggregator = StatusAggregator::new(Arc::new(HungProvider), Duration::from_secs(5));
        let status = aggregator.check_all(Uuid::new_v4()).await;
        assert_eq!(status, VerificationStatus::default());
    }
}
