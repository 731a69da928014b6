//! The session controller.
//!
//! [`AuthSessionController`] owns the session state machine and is the only
//! writer of the [`CredentialStore`]. Every mutating operation runs as a
//! spawned task behind a single-flight slot:
//!
//! - a `refresh()` arriving while a refresh is in flight joins it and gets the
//!   same result
//! - any other overlap is rejected with [`AuthError::SessionBusy`]
//!
//! Because the task is spawned, dropping the caller's future does not abort
//! an exchange halfway; the slot is released when the task ends, even on panic.
//!
//! Storage calls run on the blocking pool. The state changes only after the
//! storage write it depends on has been confirmed.

use crate::auth_fsm::{AuthState, AuthStateChanged, SessionInput, SessionMachine};
use crate::{AuthError, AuthErrorKind, AuthResult, BiometricGate, BiometricOutcome};
use chrono::Utc;
use credential_store::{Credential, CredentialStore, StorageKeys, StorageResult};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use observability::redact;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use token_exchange::{CodeReceiver, ExchangeError, TokenExchange};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Login,
    Restore,
    Refresh,
    Logout,
    BiometricChoice,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Login => "login",
            Operation::Restore => "restore",
            Operation::Refresh => "refresh",
            Operation::Logout => "logout",
            Operation::BiometricChoice => "biometric choice",
        };
        f.write_str(name)
    }
}

type SharedOutcome = Shared<BoxFuture<'static, AuthResult<AuthState>>>;

struct InFlight {
    id: u64,
    operation: Operation,
    outcome: SharedOutcome,
}

/// Point-in-time view for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub state: AuthState,
    pub has_credential: bool,
    pub prefers_biometric: Option<bool>,
    /// Kind of the last surfaced failure, cleared by the next success.
    pub last_error: Option<AuthErrorKind>,
}

/// Machine, failure reason and observers under one lock, so that delivery
/// order equals transition order.
struct SessionCell {
    machine: SessionMachine,
    failure: Option<AuthErrorKind>,
    last_error: Option<AuthErrorKind>,
    sequence: u64,
    subscribers: Vec<mpsc::UnboundedSender<AuthStateChanged>>,
}

impl SessionCell {
    fn new() -> Self {
        Self {
            machine: SessionMachine::new(),
            failure: None,
            last_error: None,
            sequence: 0,
            subscribers: Vec::new(),
        }
    }

    fn state(&self) -> AuthState {
        AuthState::from_machine(self.machine.state(), self.failure)
    }

    fn apply(&mut self, input: SessionInput) -> AuthResult<AuthState> {
        let previous = self.state();
        self.machine.consume(&input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "cannot apply {:?} in state {}",
                input, previous
            ))
        })?;

        let state = self.state();
        if previous != state {
            self.publish(previous, state);
        }
        Ok(state)
    }

    fn publish(&mut self, previous: AuthState, state: AuthState) {
        self.sequence += 1;
        info!(
            previous = %previous,
            state = %state,
            sequence = self.sequence,
            "Auth state transition"
        );
        let event = AuthStateChanged {
            previous,
            state,
            sequence: self.sequence,
            at: Utc::now(),
        };
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

struct Inner {
    store: Arc<CredentialStore>,
    exchange: Arc<dyn TokenExchange>,
    biometrics: Arc<dyn BiometricGate>,
    cell: Mutex<SessionCell>,
    in_flight: Mutex<Option<InFlight>>,
    next_flight_id: AtomicU64,
}

/// Releases the single-flight slot when the operation's task ends.
struct FlightGuard {
    inner: Arc<Inner>,
    id: u64,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut slot = lock(&self.inner.in_flight);
        if slot.as_ref().map(|flight| flight.id) == Some(self.id) {
            *slot = None;
        }
    }
}

/// Owner of the session lifecycle. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct AuthSessionController {
    inner: Arc<Inner>,
}

impl AuthSessionController {
    pub fn new(
        store: Arc<CredentialStore>,
        exchange: Arc<dyn TokenExchange>,
        biometrics: Arc<dyn BiometricGate>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                exchange,
                biometrics,
                cell: Mutex::new(SessionCell::new()),
                in_flight: Mutex::new(None),
                next_flight_id: AtomicU64::new(1),
            }),
        }
    }

    /// Current state. Never `Failed`; failures settle before the lock is
    /// released.
    pub fn state(&self) -> AuthState {
        self.inner.state()
    }

    /// Ordered stream of every transition from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<AuthStateChanged> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.inner.cell).subscribers.push(tx);
        rx
    }

    /// Exchange an authorization code for a credential.
    pub async fn login(&self, code: &str) -> AuthResult<AuthState> {
        let code = code.to_string();
        self.run_exclusive(Operation::Login, move |inner| inner.login_flow(Ok(code)))
            .await
    }

    /// Wait for the login web view to deliver a code, then exchange it.
    ///
    /// The single-flight slot is taken before waiting, so a busy session
    /// rejects the attempt before the user spends a code on it.
    pub async fn login_with(&self, receiver: CodeReceiver) -> AuthResult<AuthState> {
        self.run_exclusive(Operation::Login, move |inner| async move {
            let code = receiver.code().await;
            inner.login_flow(code).await
        })
        .await
    }

    /// Decide at startup between silent renewal, the opt-in prompt, and
    /// staying logged out.
    pub async fn restore(&self) -> AuthResult<AuthState> {
        self.run_exclusive(Operation::Restore, |inner| inner.restore_flow())
            .await
    }

    /// Renew the access token with the stored refresh token.
    pub async fn refresh(&self) -> AuthResult<AuthState> {
        self.run_exclusive(Operation::Refresh, |inner| inner.refresh_flow())
            .await
    }

    /// Persist the user's answer to the biometric opt-in prompt.
    ///
    /// Also accepted while `Authenticated`, and while `LoggedOut` with a
    /// stored credential, where it only rewrites the preference.
    pub async fn record_biometric_choice(&self, prefers_biometric: bool) -> AuthResult<AuthState> {
        self.run_exclusive(Operation::BiometricChoice, move |inner| {
            inner.record_choice_flow(prefers_biometric)
        })
        .await
    }

    /// Delete the credential and the biometric preference. Idempotent.
    pub async fn logout(&self) -> AuthResult<AuthState> {
        self.run_exclusive(Operation::Logout, |inner| inner.logout_flow())
            .await
    }

    /// Stored access token, available only while authenticated.
    pub async fn access_token(&self) -> AuthResult<String> {
        if !self.state().is_authenticated() {
            return Err(AuthError::NotLoggedIn);
        }
        self.inner
            .with_store(|store| store.read(StorageKeys::ACCESS_TOKEN))
            .await?
            .ok_or(AuthError::NotLoggedIn)
    }

    pub async fn snapshot(&self) -> AuthResult<SessionSnapshot> {
        let (has_credential, prefers_biometric) = self
            .inner
            .with_store(|store| (store.has_credential(), store.preference()))
            .await?;
        let cell = lock(&self.inner.cell);
        Ok(SessionSnapshot {
            state: cell.state(),
            has_credential,
            prefers_biometric,
            last_error: cell.last_error,
        })
    }

    async fn run_exclusive<F, Fut>(&self, operation: Operation, work: F) -> AuthResult<AuthState>
    where
        F: FnOnce(Arc<Inner>) -> Fut + Send,
        Fut: Future<Output = AuthResult<AuthState>> + Send + 'static,
    {
        let outcome = {
            let mut slot = lock(&self.inner.in_flight);
            match slot.as_ref() {
                Some(current)
                    if current.operation == Operation::Refresh
                        && operation == Operation::Refresh =>
                {
                    debug!("Joining in-flight refresh");
                    current.outcome.clone()
                }
                Some(current) => {
                    warn!(
                        requested = %operation,
                        in_flight = %current.operation,
                        "Rejecting overlapping session operation"
                    );
                    return Err(AuthError::SessionBusy(current.operation.to_string()));
                }
                None => {
                    let id = self.inner.next_flight_id.fetch_add(1, Ordering::Relaxed);
                    let guard = FlightGuard {
                        inner: self.inner.clone(),
                        id,
                    };
                    let task = work(self.inner.clone());
                    let handle = tokio::spawn(async move {
                        let _guard = guard;
                        task.await
                    });
                    let outcome = async move {
                        handle.await.unwrap_or_else(|e| {
                            Err(AuthError::Internal(format!("session task failed: {}", e)))
                        })
                    }
                    .boxed()
                    .shared();
                    *slot = Some(InFlight {
                        id,
                        operation,
                        outcome: outcome.clone(),
                    });
                    outcome
                }
            }
        };
        outcome.await
    }
}

impl Inner {
    fn state(&self) -> AuthState {
        lock(&self.cell).state()
    }

    fn transition(&self, input: SessionInput) -> AuthResult<AuthState> {
        lock(&self.cell).apply(input)
    }

    /// Transition into a resting state reached by success.
    fn succeed(&self, input: SessionInput) -> AuthResult<AuthState> {
        let mut cell = lock(&self.cell);
        let state = cell.apply(input)?;
        cell.last_error = None;
        Ok(state)
    }

    /// Publish `Failed(kind)` and settle in one critical section.
    fn fail(&self, error: AuthError, enter: SessionInput, settle: SessionInput) -> AuthError {
        let kind = error.kind();
        warn!(kind = %kind, detail = %error, "Session operation failed");

        let mut cell = lock(&self.cell);
        cell.failure = Some(kind);
        cell.last_error = Some(kind);
        let settled = match cell.apply(enter) {
            Ok(_) => cell.apply(settle),
            Err(e) => Err(e),
        };
        if let Err(e) = settled {
            error!(error = %e, "Could not settle failed session state");
        }
        cell.failure = None;
        error
    }

    async fn with_store<T, F>(&self, f: F) -> AuthResult<T>
    where
        F: FnOnce(&CredentialStore) -> T + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| AuthError::Internal(format!("storage task failed: {}", e)))
    }

    async fn store_call<T, F>(&self, f: F) -> AuthResult<T>
    where
        F: FnOnce(&CredentialStore) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        self.with_store(f).await?.map_err(AuthError::from)
    }

    async fn login_flow(
        self: Arc<Self>,
        code: Result<String, ExchangeError>,
    ) -> AuthResult<AuthState> {
        self.transition(SessionInput::LoginRequested)?;
        let failed = |error: AuthError| {
            self.fail(error, SessionInput::ExchangeFailed, SessionInput::Dismissed)
        };

        let code = match code {
            Ok(code) if !code.trim().is_empty() => code,
            Ok(_) => {
                return Err(failed(AuthError::InvalidGrant(
                    "empty authorization code".to_string(),
                )))
            }
            Err(e) => return Err(failed(e.into())),
        };

        let grant = match self.exchange.exchange_authorization_code(&code).await {
            Ok(grant) => grant,
            Err(e) => return Err(failed(e.into())),
        };

        let credential = Credential::new(grant.access_token, grant.refresh_token);
        debug!(credential = ?credential, "Persisting new credential");
        if let Err(e) = self.store_call(move |store| store.save(&credential)).await {
            return Err(failed(e));
        }

        let state = self.succeed(SessionInput::ExchangeSucceeded)?;
        info!(expires_in = ?grant.expires_in, "Login succeeded");
        Ok(state)
    }

    async fn restore_flow(self: Arc<Self>) -> AuthResult<AuthState> {
        let current = self.state();
        if current != AuthState::LoggedOut {
            return Err(AuthError::InvalidStateTransition(format!(
                "restore requires logged_out, state is {}",
                current
            )));
        }

        let (credential, preference) = self
            .with_store(|store| (store.credential(), store.preference()))
            .await?;

        let Some(credential) = credential else {
            info!("No stored credential, staying logged out");
            return Ok(AuthState::LoggedOut);
        };

        match preference {
            None => {
                info!("Stored credential without biometric preference, asking user");
                self.transition(SessionInput::CredentialFound)
            }
            Some(false) => {
                info!("Biometric renewal declined, interactive login required");
                Ok(AuthState::LoggedOut)
            }
            Some(true) => match self.biometrics.challenge().await {
                BiometricOutcome::Success => {
                    self.transition(SessionInput::BiometricPassed)?;
                    self.refresh_with(credential, AuthState::LoggedOut).await
                }
                BiometricOutcome::Failed => Err(self.fail(
                    AuthError::BiometricFailed,
                    SessionInput::BiometricFailed,
                    SessionInput::Dismissed,
                )),
                BiometricOutcome::UserCancelled => {
                    info!("Biometric prompt cancelled, staying logged out");
                    Ok(AuthState::LoggedOut)
                }
                BiometricOutcome::Unavailable => {
                    info!("Biometry unavailable, falling back to interactive login");
                    Err(AuthError::BiometricUnavailable)
                }
            },
        }
    }

    async fn refresh_flow(self: Arc<Self>) -> AuthResult<AuthState> {
        let origin = self.state();
        if !matches!(origin, AuthState::LoggedOut | AuthState::Authenticated) {
            return Err(AuthError::InvalidStateTransition(format!(
                "refresh requires logged_out or authenticated, state is {}",
                origin
            )));
        }

        let credential = self.with_store(|store| store.credential()).await?;
        let Some(credential) = credential else {
            if origin == AuthState::Authenticated {
                self.transition(SessionInput::RefreshRequested)?;
                return Err(self.fail(
                    AuthError::StorageError("stored credential is unreadable".to_string()),
                    SessionInput::RefreshFailed,
                    SessionInput::Resumed,
                ));
            }
            return Err(AuthError::NotLoggedIn);
        };

        self.transition(SessionInput::RefreshRequested)?;
        self.refresh_with(credential, origin).await
    }

    /// Runs in `Refreshing`. Transient failures settle back to `origin`.
    async fn refresh_with(&self, credential: Credential, origin: AuthState) -> AuthResult<AuthState> {
        let settle = if origin == AuthState::Authenticated {
            SessionInput::Resumed
        } else {
            SessionInput::Dismissed
        };

        let grant = match self.exchange.refresh(&credential.refresh_token).await {
            Ok(grant) => grant,
            Err(e) => {
                let error = AuthError::from(e);
                if error.is_transient() {
                    return Err(self.fail(error, SessionInput::RefreshFailed, settle));
                }
                warn!("Refresh token rejected, discarding stored credential");
                let error = match self.store_call(|store| store.clear_credential()).await {
                    Ok(()) => error,
                    Err(clear_error) => {
                        error!(error = %clear_error, "Could not discard rejected credential");
                        clear_error
                    }
                };
                return Err(self.fail(error, SessionInput::RefreshFailed, SessionInput::Dismissed));
            }
        };

        let rotated = grant.refresh_token.is_some();
        let renewed = Credential::new(
            grant.access_token,
            grant.refresh_token.unwrap_or(credential.refresh_token),
        );
        debug!(
            rotated,
            access_token = %redact(&renewed.access_token),
            "Persisting renewed credential"
        );
        if let Err(e) = self.store_call(move |store| store.save(&renewed)).await {
            return Err(self.fail(e, SessionInput::RefreshFailed, settle));
        }

        let state = self.succeed(SessionInput::RefreshSucceeded)?;
        info!(rotated, "Session refreshed");
        Ok(state)
    }

    async fn record_choice_flow(self: Arc<Self>, prefers_biometric: bool) -> AuthResult<AuthState> {
        let current = self.state();
        match current {
            AuthState::AwaitingBiometricChoice | AuthState::Authenticated => {}
            AuthState::LoggedOut => {
                if !self.with_store(|store| store.has_credential()).await? {
                    return Err(AuthError::NotLoggedIn);
                }
            }
            _ => {
                return Err(AuthError::InvalidStateTransition(format!(
                    "biometric choice not expected in state {}",
                    current
                )))
            }
        }

        self.store_call(move |store| store.set_preference(prefers_biometric))
            .await?;
        info!(prefers_biometric, state = %current, "Biometric preference recorded");

        if current != AuthState::AwaitingBiometricChoice {
            return Ok(current);
        }

        if self.with_store(|store| store.has_credential()).await? {
            self.transition(SessionInput::ChoiceRecorded)
        } else {
            warn!("Credential vanished before the biometric choice was recorded");
            self.transition(SessionInput::CredentialMissing)
        }
    }

    async fn logout_flow(self: Arc<Self>) -> AuthResult<AuthState> {
        let previous_preference = self.with_store(|store| store.preference()).await?;
        self.store_call(|store| store.clear_preference()).await?;

        if let Err(e) = self.store_call(|store| store.clear_credential()).await {
            if let Some(preference) = previous_preference {
                if let Err(restore_error) = self
                    .store_call(move |store| store.set_preference(preference))
                    .await
                {
                    error!(error = %restore_error, "Could not restore biometric preference");
                }
            }
            return Err(e);
        }

        let state = self.succeed(SessionInput::LogoutRequested)?;
        info!("Logged out");
        Ok(state)
    }
}
