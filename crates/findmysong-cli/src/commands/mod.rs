//! Subcommand handlers.

pub mod catalog;
pub mod login;
pub mod session;

use music_web_api::ApiError;
use serde_json::Value;
use session_auth::{AuthError, AuthState};

use crate::app::AppContext;
use crate::prompt;

/// One line for the terminal. Provider and transport detail stays in the log.
pub fn describe(error: &anyhow::Error) -> String {
    if let Some(auth) = error.downcast_ref::<AuthError>() {
        return describe_auth(auth);
    }
    if let Some(api) = error.downcast_ref::<ApiError>() {
        return match api {
            ApiError::Auth(auth) => describe_auth(auth),
            ApiError::Unauthorized => {
                "The music service rejected the session. Run `findmysong login` again.".to_string()
            }
            ApiError::Status { status } => {
                format!("The music service answered with status {}.", status)
            }
            _ => "Could not reach the music service. Please try again later.".to_string(),
        };
    }
    format!("Error: {:#}", error)
}

fn describe_auth(error: &AuthError) -> String {
    match error {
        AuthError::NotLoggedIn => "Not signed in. Run `findmysong login` first.".to_string(),
        AuthError::BiometricUnavailable => {
            "Biometric check unavailable. Run `findmysong login` to sign in again.".to_string()
        }
        e if e.should_alert() => e.user_message().to_string(),
        e => format!("Error: {}", e),
    }
}

pub(crate) fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

const MSG_RENEWAL_DECLINED: &str =
    "Biometric unlock is off, so the stored session cannot be renewed. \
     Run `findmysong login`, or `findmysong biometric yes` to turn it back on.";

/// Restore the stored session so that catalog calls can run. Asks the
/// opt-in question when no biometric preference is recorded yet.
pub(crate) async fn ensure_session(ctx: &AppContext) -> anyhow::Result<()> {
    match ctx.session.restore().await? {
        AuthState::Authenticated => Ok(()),
        AuthState::AwaitingBiometricChoice => answer_opt_in(ctx).await,
        _ => {
            let snapshot = ctx.session.snapshot().await?;
            if snapshot.has_credential && snapshot.prefers_biometric == Some(false) {
                anyhow::bail!(MSG_RENEWAL_DECLINED);
            }
            Err(AuthError::NotLoggedIn.into())
        }
    }
}

pub(crate) async fn answer_opt_in(ctx: &AppContext) -> anyhow::Result<()> {
    let Some(choice) = prompt::ask_biometric_opt_in() else {
        anyhow::bail!("No answer given. Run `findmysong biometric yes|no` to continue.");
    };
    ctx.session.record_biometric_choice(choice).await?;
    Ok(())
}
