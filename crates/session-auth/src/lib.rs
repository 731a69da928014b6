//! Session lifecycle for FindMySong.
//!
//! This crate provides:
//! - An explicit FSM for the login, restore, refresh and logout flows
//! - A single-flight session controller that owns the credential store
//! - The biometric gate seam used to unlock silent renewal
//! - A closed error taxonomy with user-safe messages

mod auth_fsm;
mod biometric;
mod controller;
mod error;

#[cfg(test)]
mod tests;

pub use auth_fsm::session_machine;
pub use auth_fsm::{AuthState, AuthStateChanged, SessionInput, SessionMachine, SessionMachineState};
pub use biometric::{BiometricGate, BiometricOutcome, ConfirmationGate, NoBiometrics};
pub use controller::{AuthSessionController, SessionSnapshot};
pub use error::{AuthError, AuthErrorKind, AuthResult};
