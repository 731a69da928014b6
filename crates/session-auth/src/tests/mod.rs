//! Behavioural tests for the session controller.
//!
//! - `harness.rs`      - Scripted token endpoint, scripted biometric gate, TestHarness
//! - `transitions.rs`  - Every row of the session transition table
//! - `scenarios.rs`    - End-to-end startup, login and refresh scenarios
//! - `single_flight.rs` - Joined refreshes and rejected overlaps
//! - `storage.rs`      - Atomic persistence, idempotent logout, storage failures
//! - `ordering.rs`     - Observer delivery order and sequence numbers
//! - `biometric.rs`    - Opt-in prompt and gate outcomes

pub(crate) mod harness;
mod scenarios;
