//! Configuration, paths, and logging setup for the FindMySong client.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_API_BASE_URL, DEFAULT_AUTHORIZE_URL, DEFAULT_CLIENT_ID, DEFAULT_LOG_LEVEL,
    DEFAULT_REDIRECT_URI, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SCOPES, DEFAULT_TOKEN_URL,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
