//! Authorize URL building and redirect interception.
//!
//! The login web view loads [`AuthorizationRequest::url`] and offers every
//! navigation to a [`CodeSender`]. The first navigation that lands on the
//! redirect URI resolves the paired [`CodeReceiver`] with the authorization
//! code (or the provider's refusal). The sender is spent after that.

use crate::{ExchangeError, ExchangeResult};
use tokio::sync::oneshot;
use tracing::{debug, warn};
use url::Url;

/// Parameters of one interactive login attempt.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    authorize_url: Url,
    client_id: String,
    redirect_uri: Url,
    scopes: Vec<String>,
    state: Option<String>,
    show_dialog: bool,
}

impl AuthorizationRequest {
    pub fn new(authorize_url: Url, client_id: impl Into<String>, redirect_uri: Url) -> Self {
        Self {
            authorize_url,
            client_id: client_id.into(),
            redirect_uri,
            scopes: Vec::new(),
            state: None,
            show_dialog: false,
        }
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Bind the attempt to an opaque `state` value echoed back by the provider.
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Bind the attempt to a fresh random `state`.
    pub fn with_random_state(self) -> Self {
        self.with_state(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Ask the provider to show the consent dialog even if already granted.
    pub fn show_dialog(mut self, show: bool) -> Self {
        self.show_dialog = show;
        self
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// The provider URL to open in the login web view.
    pub fn url(&self) -> Url {
        let mut url = self.authorize_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.client_id)
                .append_pair("redirect_uri", self.redirect_uri.as_str());
            if !self.scopes.is_empty() {
                query.append_pair("scope", &self.scopes.join(" "));
            }
            if let Some(state) = &self.state {
                query.append_pair("state", state);
            }
            if self.show_dialog {
                query.append_pair("show_dialog", "true");
            }
        }
        url
    }

    /// Whether `url` is a navigation to the redirect URI.
    pub fn is_redirect(&self, url: &Url) -> bool {
        url.scheme() == self.redirect_uri.scheme()
            && url.host_str() == self.redirect_uri.host_str()
            && url.port_or_known_default() == self.redirect_uri.port_or_known_default()
            && url.path() == self.redirect_uri.path()
    }

    /// Extract the authorization code from a navigation.
    ///
    /// Returns `Ok(None)` for navigations that are not the redirect URI. A
    /// redirect carrying `error`, a mismatched `state`, or no `code` is
    /// rejected as [`ExchangeError::InvalidGrant`].
    pub fn code_from_redirect(&self, url: &str) -> ExchangeResult<Option<String>> {
        let Ok(url) = Url::parse(url) else {
            return Ok(None);
        };
        if !self.is_redirect(&url) {
            return Ok(None);
        }

        let mut code = None;
        let mut error = None;
        let mut state = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            warn!(error = %error, "Provider refused authorization");
            return Err(ExchangeError::InvalidGrant(format!(
                "authorization refused: {}",
                error
            )));
        }

        if let Some(expected) = &self.state {
            if state.as_deref() != Some(expected.as_str()) {
                warn!("Redirect state does not match the login attempt");
                return Err(ExchangeError::InvalidGrant("state mismatch".to_string()));
            }
        }

        match code.filter(|c| !c.is_empty()) {
            Some(code) => {
                debug!("Authorization code received");
                Ok(Some(code))
            }
            None => Err(ExchangeError::InvalidGrant(
                "redirect without authorization code".to_string(),
            )),
        }
    }

    /// One-shot channel delivering the code of this attempt.
    pub fn code_channel(&self) -> (CodeSender, CodeReceiver) {
        let (tx, rx) = oneshot::channel();
        (
            CodeSender {
                request: self.clone(),
                tx: Some(tx),
            },
            CodeReceiver { rx },
        )
    }
}

/// Web view side of the code channel.
pub struct CodeSender {
    request: AuthorizationRequest,
    tx: Option<oneshot::Sender<ExchangeResult<String>>>,
}

impl CodeSender {
    /// Offer a navigation. Returns `true` when it was the redirect and the
    /// navigation should be cancelled; the result has then been delivered.
    ///
    /// Once spent, every further offer returns `false`.
    pub fn intercept(&mut self, url: &str) -> bool {
        if self.tx.is_none() {
            return false;
        }
        let outcome = match self.request.code_from_redirect(url) {
            Ok(None) => return false,
            Ok(Some(code)) => Ok(code),
            Err(e) => Err(e),
        };
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(outcome);
        }
        true
    }

    pub fn is_spent(&self) -> bool {
        self.tx.is_none()
    }
}

/// Controller side of the code channel.
pub struct CodeReceiver {
    rx: oneshot::Receiver<ExchangeResult<String>>,
}

impl CodeReceiver {
    /// Wait for the code. A sender dropped before the redirect means the
    /// user abandoned the login.
    pub async fn code(self) -> ExchangeResult<String> {
        self.rx.await.unwrap_or_else(|_| {
            Err(ExchangeError::InvalidGrant(
                "login abandoned before redirect".to_string(),
            ))
        })
    }
}
