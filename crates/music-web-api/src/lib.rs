//! Downstream web API for FindMySong: profile, top items and search.
//!
//! Payloads are returned as opaque JSON. Authentication is delegated to
//! [`session_auth::AuthSessionController`].

mod client;
mod error;
mod types;

pub use client::WebApiClient;
pub use error::{ApiError, ApiResult};
pub use types::{SearchKind, TopItemKind, MIN_SEARCH_QUERY_LEN};
