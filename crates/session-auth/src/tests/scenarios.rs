//! End-to-end scenarios across startup, login and refresh.

use super::harness::*;
use crate::{AuthError, AuthErrorKind, AuthState, BiometricOutcome};
use credential_store::Credential;
use token_exchange::{AuthorizationRequest, ExchangeError};
use url::Url;

#[tokio::test]
async fn fresh_install_restore_makes_no_network_call() {
    let h = TestHarness::new();

    assert_eq!(h.controller.restore().await.unwrap(), AuthState::LoggedOut);
    assert_eq!(h.controller.state(), AuthState::LoggedOut);
    assert_eq!(h.exchange.code_calls(), 0);
    assert_eq!(h.exchange.refresh_calls(), 0);
}

#[tokio::test]
async fn login_with_valid_code_stores_pair() {
    let h = TestHarness::new();
    h.exchange.push_code_result(token_grant("A1", "R1"));

    assert_eq!(
        h.controller.login("validcode123").await.unwrap(),
        AuthState::Authenticated
    );
    assert_eq!(h.stored(), Some(Credential::new("A1", "R1")));
    assert_eq!(h.controller.access_token().await.unwrap(), "A1");
}

#[tokio::test]
async fn biometric_mismatch_leaves_credential_untouched() {
    let h = TestHarness::with_credential("A1", "R1");
    h.set_preference(true);
    h.biometrics.set_outcome(BiometricOutcome::Failed);

    let err = h.controller.restore().await.unwrap_err();

    assert_eq!(err.kind(), AuthErrorKind::BiometricFailed);
    assert!(err.should_alert());
    assert_eq!(h.controller.state(), AuthState::LoggedOut);
    assert_eq!(h.stored(), Some(Credential::new("A1", "R1")));
    assert_eq!(h.preference(), Some(true));
}

#[tokio::test]
async fn revoked_refresh_token_empties_store() {
    let h = TestHarness::with_credential("A1", "R1");
    h.exchange.push_refresh_result(Err(invalid_grant()));

    let err = h.controller.refresh().await.unwrap_err();

    assert_eq!(err.kind(), AuthErrorKind::InvalidGrant);
    assert_eq!(h.controller.state(), AuthState::LoggedOut);
    assert!(h.storage.entries().is_empty());
}

#[tokio::test]
async fn timed_out_refresh_keeps_pair() {
    let h = TestHarness::with_credential("A1", "R1");
    h.exchange
        .push_refresh_result(Err(ExchangeError::Network("request timed out".to_string())));

    let err = h.controller.refresh().await.unwrap_err();

    assert_eq!(err.kind(), AuthErrorKind::NetworkError);
    assert_eq!(h.controller.state(), AuthState::LoggedOut);
    assert_eq!(h.stored(), Some(Credential::new("A1", "R1")));
}

#[tokio::test]
async fn logout_resets_the_biometric_prompt() {
    let h = TestHarness::with_credential("A1", "R1");

    assert_eq!(
        h.controller.restore().await.unwrap(),
        AuthState::AwaitingBiometricChoice
    );
    h.controller.record_biometric_choice(true).await.unwrap();
    h.controller.logout().await.unwrap();

    h.controller.login("code-2").await.unwrap();
    assert_eq!(h.preference(), None);
    assert_eq!(h.stored(), Some(Credential::new("A1", "R1")));
}

#[tokio::test]
async fn declined_biometrics_require_interactive_login() {
    let h = TestHarness::with_credential("A1", "R1");
    h.set_preference(false);

    assert_eq!(h.controller.restore().await.unwrap(), AuthState::LoggedOut);
    assert_eq!(h.biometrics.calls(), 0);
    assert_eq!(h.exchange.refresh_calls(), 0);
    assert_eq!(h.stored(), Some(Credential::new("A1", "R1")));
}

#[tokio::test]
async fn empty_code_fails_without_network_call() {
    let h = TestHarness::new();

    let err = h.controller.login("   ").await.unwrap_err();

    assert_eq!(err.kind(), AuthErrorKind::InvalidGrant);
    assert_eq!(h.exchange.code_calls(), 0);
    assert_eq!(h.controller.state(), AuthState::LoggedOut);
}

#[tokio::test]
async fn code_channel_drives_login() {
    let h = TestHarness::new();
    let request = AuthorizationRequest::new(
        Url::parse("https://accounts.example.com/authorize").unwrap(),
        "client-abc",
        Url::parse("findmysong://callback").unwrap(),
    )
    .with_state("s1");
    let (mut sender, receiver) = request.code_channel();

    let controller = h.controller.clone();
    let login = tokio::spawn(async move { controller.login_with(receiver).await });

    assert!(!sender.intercept("https://accounts.example.com/login"));
    assert!(sender.intercept("findmysong://callback?code=web-code&state=s1"));

    assert_eq!(login.await.unwrap().unwrap(), AuthState::Authenticated);
    assert_eq!(h.exchange.codes_seen(), vec!["web-code".to_string()]);
}

#[tokio::test]
async fn abandoned_web_login_surfaces_invalid_grant() {
    let h = TestHarness::new();
    let request = AuthorizationRequest::new(
        Url::parse("https://accounts.example.com/authorize").unwrap(),
        "client-abc",
        Url::parse("findmysong://callback").unwrap(),
    );
    let (sender, receiver) = request.code_channel();
    drop(sender);

    let err = h.controller.login_with(receiver).await.unwrap_err();

    assert!(matches!(err, AuthError::InvalidGrant(_)));
    assert_eq!(h.controller.state(), AuthState::LoggedOut);
    assert_eq!(h.exchange.code_calls(), 0);
}

#[tokio::test]
async fn snapshot_reports_last_error_until_next_success() {
    let h = TestHarness::with_credential("A1", "R1");
    h.exchange.push_refresh_result(Err(network_error()));
    let _ = h.controller.refresh().await;

    let snapshot = h.controller.snapshot().await.unwrap();
    assert_eq!(snapshot.state, AuthState::LoggedOut);
    assert!(snapshot.has_credential);
    assert_eq!(snapshot.prefers_biometric, None);
    assert_eq!(snapshot.last_error, Some(AuthErrorKind::NetworkError));

    h.controller.refresh().await.unwrap();
    let snapshot = h.controller.snapshot().await.unwrap();
    assert_eq!(snapshot.state, AuthState::Authenticated);
    assert_eq!(snapshot.last_error, None);
}

#[tokio::test]
async fn access_token_requires_authenticated_state() {
    let h = TestHarness::with_credential("A1", "R1");
    assert_eq!(
        h.controller.access_token().await.unwrap_err(),
        AuthError::NotLoggedIn
    );
}
