//! Test harness for session controller tests.
//!
//! Provides:
//! - ScriptedExchange: a token endpoint with queued results and a hold gate
//! - ScriptedBiometrics: a gate with a settable outcome
//! - TestHarness: a controller wired to in-memory storage

use crate::{AuthSessionController, AuthStateChanged, BiometricGate, BiometricOutcome};
use async_trait::async_trait;
use credential_store::{
    Credential, CredentialStore, MemoryPreferences, MemoryStorage, PreferenceStorage, StorageKeys,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use token_exchange::{ExchangeError, ExchangeResult, RefreshGrant, TokenExchange, TokenGrant};
use tokio::sync::{mpsc, Semaphore};

pub fn token_grant(access: &str, refresh: &str) -> ExchangeResult<TokenGrant> {
    Ok(TokenGrant {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        expires_in: Some(3600),
    })
}

pub fn refresh_grant(access: &str, refresh: Option<&str>) -> ExchangeResult<RefreshGrant> {
    Ok(RefreshGrant {
        access_token: access.to_string(),
        refresh_token: refresh.map(str::to_string),
        expires_in: Some(3600),
    })
}

pub fn network_error() -> ExchangeError {
    ExchangeError::Network("connection refused".to_string())
}

pub fn invalid_grant() -> ExchangeError {
    ExchangeError::InvalidGrant("invalid_grant".to_string())
}

/// Token endpoint double.
///
/// Empty queues answer with `A1/R1` for codes and `A2` (no rotation) for
/// refreshes. While held, every call parks until [`release`](Self::release).
pub struct ScriptedExchange {
    code_results: Mutex<VecDeque<ExchangeResult<TokenGrant>>>,
    refresh_results: Mutex<VecDeque<ExchangeResult<RefreshGrant>>>,
    code_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    codes_seen: Mutex<Vec<String>>,
    refresh_tokens_seen: Mutex<Vec<String>>,
    held: AtomicBool,
    gate: Semaphore,
}

impl ScriptedExchange {
    pub fn new() -> Self {
        Self {
            code_results: Mutex::new(VecDeque::new()),
            refresh_results: Mutex::new(VecDeque::new()),
            code_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            codes_seen: Mutex::new(Vec::new()),
            refresh_tokens_seen: Mutex::new(Vec::new()),
            held: AtomicBool::new(false),
            gate: Semaphore::new(0),
        }
    }

    pub fn push_code_result(&self, result: ExchangeResult<TokenGrant>) {
        self.code_results.lock().unwrap().push_back(result);
    }

    pub fn push_refresh_result(&self, result: ExchangeResult<RefreshGrant>) {
        self.refresh_results.lock().unwrap().push_back(result);
    }

    pub fn code_calls(&self) -> usize {
        self.code_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn codes_seen(&self) -> Vec<String> {
        self.codes_seen.lock().unwrap().clone()
    }

    pub fn refresh_tokens_seen(&self) -> Vec<String> {
        self.refresh_tokens_seen.lock().unwrap().clone()
    }

    /// Park every following call until released.
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    /// Let `calls` parked (or future) calls through and stop holding.
    pub fn release(&self, calls: usize) {
        self.held.store(false, Ordering::SeqCst);
        self.gate.add_permits(calls);
    }

    async fn pass_gate(&self) {
        if self.held.load(Ordering::SeqCst) {
            self.gate.acquire().await.unwrap().forget();
        }
    }
}

#[async_trait]
impl TokenExchange for ScriptedExchange {
    async fn exchange_authorization_code(&self, code: &str) -> ExchangeResult<TokenGrant> {
        self.code_calls.fetch_add(1, Ordering::SeqCst);
        self.codes_seen.lock().unwrap().push(code.to_string());
        self.pass_gate().await;
        let scripted = self.code_results.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| token_grant("A1", "R1"))
    }

    async fn refresh(&self, refresh_token: &str) -> ExchangeResult<RefreshGrant> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_tokens_seen
            .lock()
            .unwrap()
            .push(refresh_token.to_string());
        self.pass_gate().await;
        let scripted = self.refresh_results.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| refresh_grant("A2", None))
    }
}

/// Biometric gate double.
pub struct ScriptedBiometrics {
    outcome: Mutex<BiometricOutcome>,
    calls: AtomicUsize,
}

impl ScriptedBiometrics {
    pub fn new(outcome: BiometricOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_outcome(&self, outcome: BiometricOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BiometricGate for ScriptedBiometrics {
    async fn challenge(&self) -> BiometricOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.outcome.lock().unwrap()
    }
}

/// Controller plus handles on every double behind it.
pub struct TestHarness {
    pub storage: Arc<MemoryStorage>,
    pub preferences: Arc<MemoryPreferences>,
    pub exchange: Arc<ScriptedExchange>,
    pub biometrics: Arc<ScriptedBiometrics>,
    pub controller: AuthSessionController,
}

impl TestHarness {
    /// Empty storage, no preference, biometrics succeed.
    pub fn new() -> Self {
        Self::build(MemoryStorage::new())
    }

    /// Storage holding `access`/`refresh`.
    pub fn with_credential(access: &str, refresh: &str) -> Self {
        Self::build(MemoryStorage::with_entries([
            (StorageKeys::ACCESS_TOKEN, access),
            (StorageKeys::REFRESH_TOKEN, refresh),
        ]))
    }

    fn build(storage: MemoryStorage) -> Self {
        let storage = Arc::new(storage);
        let preferences = Arc::new(MemoryPreferences::new());
        let exchange = Arc::new(ScriptedExchange::new());
        let biometrics = Arc::new(ScriptedBiometrics::new(BiometricOutcome::Success));

        let store = CredentialStore::new(Box::new(storage.clone()), Box::new(preferences.clone()));
        let controller =
            AuthSessionController::new(Arc::new(store), exchange.clone(), biometrics.clone());

        Self {
            storage,
            preferences,
            exchange,
            biometrics,
            controller,
        }
    }

    pub fn set_preference(&self, prefers_biometric: bool) {
        self.preferences
            .set_bool(StorageKeys::PREFERS_BIOMETRIC, prefers_biometric)
            .unwrap();
    }

    pub fn preference(&self) -> Option<bool> {
        self.preferences
            .get_bool(StorageKeys::PREFERS_BIOMETRIC)
            .unwrap()
    }

    /// The pair as it sits in secure storage, bypassing the controller.
    pub fn stored(&self) -> Option<Credential> {
        let entries = self.storage.entries();
        match (
            entries.get(StorageKeys::ACCESS_TOKEN),
            entries.get(StorageKeys::REFRESH_TOKEN),
        ) {
            (Some(access), Some(refresh)) => Some(Credential::new(access.as_str(), refresh.as_str())),
            _ => None,
        }
    }
}

/// Everything delivered so far.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<AuthStateChanged>) -> Vec<AuthStateChanged> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Poll `condition` until true or one second passes.
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 1s");
}
