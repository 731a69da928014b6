//! Token endpoint client.

use crate::grant::{TokenErrorResponse, TokenResponse};
use crate::{ExchangeError, ExchangeResult, RefreshGrant, TokenGrant};
use async_trait::async_trait;
use observability::{redact, summarize_response_body};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// OAuth error code meaning the code or refresh token is no longer usable.
const INVALID_GRANT: &str = "invalid_grant";

/// The two grants the session needs from the provider.
///
/// Implementations never touch storage.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// `authorization_code -> (access, refresh)`
    async fn exchange_authorization_code(&self, code: &str) -> ExchangeResult<TokenGrant>;

    /// `refresh_token -> (access, refresh?)`
    async fn refresh(&self, refresh_token: &str) -> ExchangeResult<RefreshGrant>;
}

/// Settings for [`TokenEndpointClient`].
#[derive(Debug, Clone)]
pub struct TokenEndpointConfig {
    pub token_url: Url,
    pub client_id: String,
    /// Sent as HTTP Basic credentials when set; otherwise `client_id` goes in
    /// the form body.
    pub client_secret: Option<String>,
    pub redirect_uri: Url,
    pub timeout: Duration,
}

/// reqwest-backed client for the provider's token endpoint.
#[derive(Clone, Debug)]
pub struct TokenEndpointClient {
    http_client: reqwest::Client,
    config: TokenEndpointConfig,
}

impl TokenEndpointClient {
    pub fn new(config: TokenEndpointConfig) -> ExchangeResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExchangeError::Configuration(e.to_string()))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn with_client_auth(&self, mut form: Vec<(&'static str, String)>) -> reqwest::RequestBuilder {
        let mut request = self.http_client.post(self.config.token_url.clone());
        match &self.config.client_secret {
            Some(secret) => request = request.basic_auth(&self.config.client_id, Some(secret)),
            None => form.push(("client_id", self.config.client_id.clone())),
        }
        request.form(&form)
    }

    async fn post_grant(
        &self,
        grant_type: &'static str,
        form: Vec<(&'static str, String)>,
    ) -> ExchangeResult<TokenResponse> {
        let response = self.with_client_auth(form).send().await.map_err(|e| {
            warn!(grant_type, error = %e, "Token endpoint unreachable");
            ExchangeError::from(e)
        })?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
                warn!(grant_type, body_summary = %summarize_response_body(&body), "Malformed token response");
                ExchangeError::Decode(e.to_string())
            })?;
            if parsed.access_token.is_empty() {
                return Err(ExchangeError::Decode("empty access_token".to_string()));
            }
            debug!(grant_type, status = status.as_u16(), "Token endpoint succeeded");
            return Ok(parsed);
        }

        let error_code = serde_json::from_str::<TokenErrorResponse>(&body)
            .map(|e| e.error)
            .ok();

        warn!(
            grant_type,
            status = status.as_u16(),
            error_code = ?error_code,
            body_summary = %summarize_response_body(&body),
            "Token endpoint rejected request"
        );

        match error_code.as_deref() {
            Some(INVALID_GRANT) => Err(ExchangeError::InvalidGrant(format!(
                "{} rejected with status {}",
                grant_type,
                status.as_u16()
            ))),
            _ => Err(ExchangeError::Network(format!(
                "unexpected status {} from token endpoint",
                status.as_u16()
            ))),
        }
    }
}

#[async_trait]
impl TokenExchange for TokenEndpointClient {
    async fn exchange_authorization_code(&self, code: &str) -> ExchangeResult<TokenGrant> {
        info!(code = %redact(code), "Exchanging authorization code");

        let response = self
            .post_grant(
                "authorization_code",
                vec![
                    ("grant_type", "authorization_code".to_string()),
                    ("code", code.to_string()),
                    ("redirect_uri", self.config.redirect_uri.to_string()),
                ],
            )
            .await?;

        let refresh_token = response
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ExchangeError::Decode("missing refresh_token".to_string()))?;

        Ok(TokenGrant {
            access_token: response.access_token,
            refresh_token,
            expires_in: response.expires_in,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> ExchangeResult<RefreshGrant> {
        info!(refresh_token = %redact(refresh_token), "Refreshing access token");

        let response = self
            .post_grant(
                "refresh_token",
                vec![
                    ("grant_type", "refresh_token".to_string()),
                    ("refresh_token", refresh_token.to_string()),
                ],
            )
            .await?;

        Ok(RefreshGrant {
            access_token: response.access_token,
            refresh_token: response.refresh_token.filter(|t| !t.is_empty()),
            expires_in: response.expires_in,
        })
    }
}
