//! Component wiring for one CLI invocation.

use std::sync::Arc;

use anyhow::Context;
use credential_store::{create_storage, CredentialStore, JsonFilePreferences, SecureStorage};
use music_web_api::WebApiClient;
use session_auth::{AuthSessionController, BiometricGate, ConfirmationGate, NoBiometrics};
use session_config_and_utils::{Config, Paths};
use token_exchange::{AuthorizationRequest, TokenEndpointClient, TokenEndpointConfig};
use tracing::debug;

use crate::prompt;

/// Everything a command needs. Built once per process.
pub struct AppContext {
    pub config: Config,
    pub paths: Paths,
    pub session: AuthSessionController,
    pub web: WebApiClient,
}

impl AppContext {
    /// Wire the platform keychain and, unless disabled, the terminal
    /// confirmation gate.
    pub fn build(config: Config, paths: Paths, biometrics_enabled: bool) -> anyhow::Result<Self> {
        let secrets = create_storage().context("secure storage unavailable")?;
        let biometrics: Arc<dyn BiometricGate> = if biometrics_enabled {
            Arc::new(ConfirmationGate::new(prompt::confirm_identity))
        } else {
            Arc::new(NoBiometrics)
        };
        Self::with_parts(config, paths, secrets, biometrics)
    }

    pub fn with_parts(
        config: Config,
        paths: Paths,
        secrets: Box<dyn SecureStorage>,
        biometrics: Arc<dyn BiometricGate>,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        let preferences = JsonFilePreferences::new(paths.preferences_file());
        let store = CredentialStore::new(secrets, Box::new(preferences));

        let exchange = TokenEndpointClient::new(TokenEndpointConfig {
            token_url: config.token_url()?,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri()?,
            timeout: config.request_timeout(),
        })?;

        let session = AuthSessionController::new(Arc::new(store), Arc::new(exchange), biometrics);
        let web = WebApiClient::new(config.api_base_url()?, config.request_timeout(), session.clone())?;

        debug!(
            token_url = %config.token_url,
            api_base_url = %config.api_base_url,
            "Components wired"
        );

        Ok(Self {
            config,
            paths,
            session,
            web,
        })
    }

    /// Login request for the configured client, redirect and scopes.
    pub fn authorization_request(&self) -> anyhow::Result<AuthorizationRequest> {
        Ok(AuthorizationRequest::new(
            self.config.authorize_url()?,
            self.config.client_id.clone(),
            self.config.redirect_uri()?,
        )
        .with_scopes(self.config.scopes.iter().cloned())
        .show_dialog(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credential_store::MemoryStorage;
    use session_auth::AuthState;
    use std::collections::HashMap;

    fn context(config: Config) -> anyhow::Result<(AppContext, tempfile::TempDir)> {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let ctx = AppContext::with_parts(
            config,
            paths,
            Box::new(MemoryStorage::new()),
            Arc::new(NoBiometrics),
        )?;
        Ok((ctx, dir))
    }

    #[test]
    fn test_authorization_request_uses_config() {
        let mut config = Config::default();
        config.client_id = "client-abc".to_string();
        config.scopes = vec!["user-top-read".to_string()];
        let (ctx, _dir) = context(config).unwrap();

        let url = ctx.authorization_request().unwrap().url();
        let query: HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(query.get("client_id").map(String::as_str), Some("client-abc"));
        assert_eq!(query.get("scope").map(String::as_str), Some("user-top-read"));
        assert_eq!(query.get("show_dialog").map(String::as_str), Some("true"));
        assert_eq!(
            query.get("redirect_uri").map(String::as_str),
            Some(ctx.config.redirect_uri.as_str())
        );
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.client_id = String::new();
        assert!(context(config).is_err());

        let mut config = Config::default();
        config.token_url = "not a url".to_string();
        assert!(context(config).is_err());
    }

    #[tokio::test]
    async fn test_fresh_context_is_logged_out() {
        let (ctx, _dir) = context(Config::default()).unwrap();

        let snapshot = ctx.session.snapshot().await.unwrap();
        assert_eq!(snapshot.state, AuthState::LoggedOut);
        assert!(!snapshot.has_credential);
        assert_eq!(snapshot.prefers_biometric, None);
    }
}
