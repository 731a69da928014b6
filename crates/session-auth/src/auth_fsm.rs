//! Session state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//!                 ┌──────────────────────────┐
//!   ┌────────────►│        LoggedOut         │◄──────────────┐
//!   │             └──┬──────────┬─────────┬──┘               │
//!   │ LoginRequested │          │         │ CredentialFound  │
//!   │                ▼          │         ▼                  │
//!   │      ┌─────────────┐      │   ┌─────────────────────┐  │
//!   │      │ Authorizing │      │   │ AwaitingBiometric-  │──┘ CredentialMissing /
//!   │      └──┬───────┬──┘      │   │ Choice              │    LogoutRequested
//!   │         │       │         │   └──────────┬──────────┘
//!   │ ExchangeFailed  │ ExchangeSucceeded      │ ChoiceRecorded
//!   │         │       ▼         │              ▼
//!   │         │  ┌─────────────────────────────────┐
//!   │         │  │          Authenticated          │── LogoutRequested ──► LoggedOut
//!   │         │  └───────┬────────────────▲────────┘
//!   │         │          │ RefreshRequested│ RefreshSucceeded
//!   │         │          ▼                 │
//!   │         │     ┌──────────────────────┴┐◄── BiometricPassed / RefreshRequested
//!   │         │     │      Refreshing       │    (from LoggedOut)
//!   │         │     └──────────┬────────────┘
//!   │         ▼                │ RefreshFailed
//!   │     ┌─────────────────────────┐◄── BiometricFailed (from LoggedOut)
//!   └─────│   Failed (transient)    │── Resumed ──► Authenticated
//!Dismissed└─────────────────────────┘
//! ```
//!
//! `Failed` is never a resting state: the controller leaves it in the same
//! critical section that entered it.

use chrono::{DateTime, Utc};
use rust_fsm::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::AuthErrorKind;

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(LoggedOut)

    LoggedOut => {
        LoginRequested => Authorizing,
        CredentialFound => AwaitingBiometricChoice,
        BiometricPassed => Refreshing,
        BiometricFailed => Failed,
        RefreshRequested => Refreshing,
        LogoutRequested => LoggedOut
    },
    Authorizing => {
        ExchangeSucceeded => Authenticated,
        ExchangeFailed => Failed
    },
    AwaitingBiometricChoice => {
        ChoiceRecorded => Authenticated,
        CredentialMissing => LoggedOut,
        LogoutRequested => LoggedOut
    },
    Authenticated => {
        RefreshRequested => Refreshing,
        LogoutRequested => LoggedOut
    },
    Refreshing => {
        RefreshSucceeded => Authenticated,
        RefreshFailed => Failed
    },
    Failed => {
        Dismissed => LoggedOut,
        Resumed => Authenticated
    }
}

pub use session_machine::Input as SessionInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Session state as seen by observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    LoggedOut,
    Authorizing,
    Authenticated,
    Refreshing,
    AwaitingBiometricChoice,
    Failed(AuthErrorKind),
}

impl AuthState {
    /// Map a machine state. `Failed` carries the reason held alongside the
    /// machine.
    pub fn from_machine(state: &SessionMachineState, failure: Option<AuthErrorKind>) -> Self {
        match state {
            SessionMachineState::LoggedOut => AuthState::LoggedOut,
            SessionMachineState::Authorizing => AuthState::Authorizing,
            SessionMachineState::Authenticated => AuthState::Authenticated,
            SessionMachineState::Refreshing => AuthState::Refreshing,
            SessionMachineState::AwaitingBiometricChoice => AuthState::AwaitingBiometricChoice,
            SessionMachineState::Failed => {
                AuthState::Failed(failure.unwrap_or(AuthErrorKind::Internal))
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated)
    }

    /// True while an operation is running or a failure is being settled.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AuthState::Authorizing | AuthState::Refreshing | AuthState::Failed(_)
        )
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthState::LoggedOut => write!(f, "logged_out"),
            AuthState::Authorizing => write!(f, "authorizing"),
            AuthState::Authenticated => write!(f, "authenticated"),
            AuthState::Refreshing => write!(f, "refreshing"),
            AuthState::AwaitingBiometricChoice => write!(f, "awaiting_biometric_choice"),
            AuthState::Failed(kind) => write!(f, "failed({})", kind),
        }
    }
}

/// One observed transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStateChanged {
    pub previous: AuthState,
    pub state: AuthState,
    /// Starts at 1 and increases by one per published transition.
    pub sequence: u64,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine_at(path: &[SessionInput]) -> SessionMachine {
        let mut machine = SessionMachine::new();
        for input in path {
            machine.consume(input).unwrap();
        }
        machine
    }

    #[test]
    fn test_initial_state_is_logged_out() {
        let machine = SessionMachine::new();
        assert_eq!(*machine.state(), SessionMachineState::LoggedOut);
    }

    #[test]
    fn test_login_path() {
        let machine = machine_at(&[
            SessionInput::LoginRequested,
            SessionInput::ExchangeSucceeded,
        ]);
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn test_failed_login_settles_logged_out() {
        let mut machine = machine_at(&[SessionInput::LoginRequested, SessionInput::ExchangeFailed]);
        assert_eq!(*machine.state(), SessionMachineState::Failed);

        machine.consume(&SessionInput::Dismissed).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::LoggedOut);
    }

    #[test]
    fn test_biometric_choice_path() {
        let machine = machine_at(&[SessionInput::CredentialFound, SessionInput::ChoiceRecorded]);
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn test_biometric_refresh_path() {
        let machine = machine_at(&[
            SessionInput::BiometricPassed,
            SessionInput::RefreshSucceeded,
        ]);
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn test_transient_refresh_failure_can_resume() {
        let machine = machine_at(&[
            SessionInput::LoginRequested,
            SessionInput::ExchangeSucceeded,
            SessionInput::RefreshRequested,
            SessionInput::RefreshFailed,
            SessionInput::Resumed,
        ]);
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn test_logout_is_accepted_when_logged_out() {
        let machine = machine_at(&[SessionInput::LogoutRequested]);
        assert_eq!(*machine.state(), SessionMachineState::LoggedOut);
    }

    #[test]
    fn test_invalid_transitions_are_rejected() {
        let mut machine = SessionMachine::new();
        assert!(machine.consume(&SessionInput::ExchangeSucceeded).is_err());
        assert!(machine.consume(&SessionInput::ChoiceRecorded).is_err());
        assert!(machine.consume(&SessionInput::Resumed).is_err());

        let mut authorizing = machine_at(&[SessionInput::LoginRequested]);
        assert!(authorizing.consume(&SessionInput::LoginRequested).is_err());
        assert!(authorizing.consume(&SessionInput::LogoutRequested).is_err());

        let mut refreshing = machine_at(&[SessionInput::RefreshRequested]);
        assert!(refreshing.consume(&SessionInput::RefreshRequested).is_err());
    }

    #[test]
    fn test_auth_state_mapping_uses_failure_reason() {
        assert_eq!(
            AuthState::from_machine(&SessionMachineState::Failed, Some(AuthErrorKind::InvalidGrant)),
            AuthState::Failed(AuthErrorKind::InvalidGrant)
        );
        assert_eq!(
            AuthState::from_machine(&SessionMachineState::AwaitingBiometricChoice, None),
            AuthState::AwaitingBiometricChoice
        );
    }

    #[test]
    fn test_auth_state_predicates() {
        assert!(AuthState::Authenticated.is_authenticated());
        assert!(!AuthState::Refreshing.is_authenticated());
        assert!(AuthState::Refreshing.is_transient());
        assert!(AuthState::Failed(AuthErrorKind::NetworkError).is_transient());
        assert!(!AuthState::LoggedOut.is_transient());
        assert!(!AuthState::AwaitingBiometricChoice.is_transient());
    }

    #[test]
    fn test_auth_state_serialization() {
        assert_eq!(
            serde_json::to_string(&AuthState::AwaitingBiometricChoice).unwrap(),
            "\"awaiting_biometric_choice\""
        );
        assert_eq!(
            serde_json::to_string(&AuthState::Failed(AuthErrorKind::NetworkError)).unwrap(),
            r#"{"failed":"network_error"}"#
        );
    }
}
