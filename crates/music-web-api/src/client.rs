//! Web API client.
//!
//! Every call attaches the session's current access token. A 401 is handed
//! to the session controller's refresh path once, and the call is retried
//! once with the renewed token; the client never touches tokens itself.

use crate::{ApiError, ApiResult, SearchKind, TopItemKind, MIN_SEARCH_QUERY_LEN};
use observability::summarize_response_body;
use reqwest::StatusCode;
use serde_json::Value;
use session_auth::AuthSessionController;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

enum Reply {
    Body(Value),
    Unauthorized,
}

#[derive(Clone)]
pub struct WebApiClient {
    http_client: reqwest::Client,
    base_url: Url,
    session: AuthSessionController,
}

impl WebApiClient {
    pub fn new(base_url: Url, timeout: Duration, session: AuthSessionController) -> ApiResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Configuration(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            session,
        })
    }

    /// `GET /v1/me`
    pub async fn current_user(&self) -> ApiResult<Value> {
        self.get("v1/me", &[]).await
    }

    /// `GET /v1/me/top/{tracks|artists}`
    pub async fn top_items(&self, kind: TopItemKind) -> ApiResult<Value> {
        self.get(&format!("v1/me/top/{}", kind.path_segment()), &[])
            .await
    }

    /// `GET /v1/search`. Short queries yield an empty object and no request.
    pub async fn search(&self, query: &str, kind: SearchKind) -> ApiResult<Value> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_QUERY_LEN {
            debug!(len = query.chars().count(), "Search query too short, skipping request");
            return Ok(Value::Object(serde_json::Map::new()));
        }

        self.get(
            "v1/search",
            &[("q", query.to_string()), ("type", kind.search_types())],
        )
        .await
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> ApiResult<Value> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ApiError::Configuration(e.to_string()))?;

        let token = self.session.access_token().await?;
        if let Reply::Body(body) = self.send(&url, query, &token).await? {
            return Ok(body);
        }

        info!(path, "Access token rejected, refreshing session");
        self.session.refresh().await?;
        let token = self.session.access_token().await?;

        match self.send(&url, query, &token).await? {
            Reply::Body(body) => Ok(body),
            Reply::Unauthorized => {
                warn!(path, "Access token rejected again after refresh");
                Err(ApiError::Unauthorized)
            }
        }
    }

    async fn send(&self, url: &Url, query: &[(&str, String)], token: &str) -> ApiResult<Reply> {
        let response = self
            .http_client
            .get(url.clone())
            .query(query)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Ok(Reply::Unauthorized);
        }

        let body = response.text().await?;
        if !status.is_success() {
            warn!(
                path = url.path(),
                status = status.as_u16(),
                body_summary = %summarize_response_body(&body),
                "Web API error"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
            });
        }

        serde_json::from_str(&body).map(Reply::Body).map_err(|e| {
            warn!(
                path = url.path(),
                body_summary = %summarize_response_body(&body),
                "Malformed web API response"
            );
            ApiError::Decode(e.to_string())
        })
    }
}
