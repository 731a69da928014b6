//! OAuth authorization-code and refresh-token grants for one provider.
//!
//! - [`TokenExchange`]: the two grants as an async trait
//! - [`TokenEndpointClient`]: the reqwest implementation
//! - [`AuthorizationRequest`]: authorize URL building and redirect interception

mod authorize;
mod client;
mod error;
mod grant;

#[cfg(any(test, feature = "test-support"))]
pub mod stub_server;

pub use authorize::{AuthorizationRequest, CodeReceiver, CodeSender};
pub use client::{TokenEndpointClient, TokenEndpointConfig, TokenExchange};
pub use error::{ExchangeError, ExchangeResult};
pub use grant::{RefreshGrant, TokenGrant};
