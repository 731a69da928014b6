//! Biometric gate.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of one biometric challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiometricOutcome {
    Success,
    /// The user dismissed the prompt.
    UserCancelled,
    /// No enrolled biometry, or no hardware.
    Unavailable,
    /// A genuine mismatch.
    Failed,
}

/// Platform biometric challenge reduced to one outcome.
#[async_trait]
pub trait BiometricGate: Send + Sync {
    async fn challenge(&self) -> BiometricOutcome;
}

/// Gate for devices without biometry.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBiometrics;

#[async_trait]
impl BiometricGate for NoBiometrics {
    async fn challenge(&self) -> BiometricOutcome {
        BiometricOutcome::Unavailable
    }
}

/// Gate backed by a blocking confirmation callback, such as a terminal prompt
/// or a platform API without an async binding.
///
/// The callback runs on the blocking pool.
pub struct ConfirmationGate {
    confirm: Arc<dyn Fn() -> BiometricOutcome + Send + Sync>,
}

impl ConfirmationGate {
    pub fn new<F>(confirm: F) -> Self
    where
        F: Fn() -> BiometricOutcome + Send + Sync + 'static,
    {
        Self {
            confirm: Arc::new(confirm),
        }
    }
}

#[async_trait]
impl BiometricGate for ConfirmationGate {
    async fn challenge(&self) -> BiometricOutcome {
        let confirm = self.confirm.clone();
        match tokio::task::spawn_blocking(move || confirm()).await {
            Ok(outcome) => {
                debug!(outcome = ?outcome, "Biometric challenge completed");
                outcome
            }
            Err(e) => {
                warn!(error = %e, "Biometric challenge task failed");
                BiometricOutcome::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_biometrics_is_unavailable() {
        assert_eq!(NoBiometrics.challenge().await, BiometricOutcome::Unavailable);
    }

    #[tokio::test]
    async fn test_confirmation_gate_returns_callback_outcome() {
        let gate = ConfirmationGate::new(|| BiometricOutcome::UserCancelled);
        assert_eq!(gate.challenge().await, BiometricOutcome::UserCancelled);
    }

    #[tokio::test]
    async fn test_panicking_callback_counts_as_unavailable() {
        let gate = ConfirmationGate::new(|| panic!("sensor driver crashed"));
        assert_eq!(gate.challenge().await, BiometricOutcome::Unavailable);
    }
}
