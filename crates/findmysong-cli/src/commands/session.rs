//! Session lifecycle commands.

use serde_json::Value;

use super::{ensure_session, print_json};
use crate::app::AppContext;

pub async fn restore(ctx: &AppContext) -> anyhow::Result<()> {
    ensure_session(ctx).await?;
    println!("Session restored.");
    Ok(())
}

/// Rewrite the stored preference. Needs a stored credential, not a restored
/// session, so a declined renewal can be turned back on.
pub async fn biometric(ctx: &AppContext, enabled: bool) -> anyhow::Result<()> {
    ctx.session.record_biometric_choice(enabled).await?;
    if enabled {
        println!("Biometric unlock enabled.");
    } else {
        println!("Biometric unlock disabled.");
    }
    Ok(())
}

pub async fn refresh(ctx: &AppContext) -> anyhow::Result<()> {
    ctx.session.refresh().await?;
    println!("Access token renewed.");
    Ok(())
}

pub async fn logout(ctx: &AppContext) -> anyhow::Result<()> {
    ctx.session.logout().await?;
    println!("Signed out.");
    Ok(())
}

pub async fn status(ctx: &AppContext) -> anyhow::Result<()> {
    let mut value = serde_json::to_value(ctx.session.snapshot().await?)?;
    if let Value::Object(fields) = &mut value {
        fields.insert(
            "base_dir".to_string(),
            Value::String(ctx.paths.base_dir().display().to_string()),
        );
    }
    print_json(&value)
}
