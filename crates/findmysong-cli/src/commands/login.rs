//! Sign-in commands.
//!
//! The CLI has no embedded browser: `authorize-url` prints the provider page
//! to open, and `login` takes either the code or the URL the browser was
//! redirected to.

use tracing::info;

use crate::app::AppContext;

pub fn authorize_url(ctx: &AppContext) -> anyhow::Result<()> {
    let request = ctx.authorization_request()?.with_random_state();
    println!("{}", request.url());
    if let Some(state) = request.state() {
        eprintln!("Pass `--state {}` to `findmysong login` with the redirect URL.", state);
    }
    Ok(())
}

pub async fn login(
    ctx: &AppContext,
    code: Option<String>,
    redirect_url: Option<String>,
    state: Option<String>,
) -> anyhow::Result<()> {
    let final_state = match (code, redirect_url) {
        (Some(code), _) => ctx.session.login(&code).await?,
        (None, Some(redirect_url)) => {
            let mut request = ctx.authorization_request()?;
            if let Some(state) = state {
                request = request.with_state(state);
            }
            let (mut sender, receiver) = request.code_channel();
            if !sender.intercept(&redirect_url) {
                anyhow::bail!("URL is not a redirect to {}", request.redirect_uri());
            }
            ctx.session.login_with(receiver).await?
        }
        (None, None) => anyhow::bail!("either --code or --redirect-url is required"),
    };

    info!(state = %final_state, "Login finished");
    println!("Signed in.");
    if ctx.session.snapshot().await?.prefers_biometric.is_none() {
        super::answer_opt_in(ctx).await?;
    }
    Ok(())
}
