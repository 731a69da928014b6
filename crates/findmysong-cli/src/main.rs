//! FindMySong command-line client.
//!
//! Usage: findmysong [--base-dir <dir>] [--log-level <level>] <command>
//!
//! Credentials live in the platform keychain; the biometric preference and
//! configuration live under the base directory (defaults to ~/.findmysong).

mod app;
mod commands;
mod prompt;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use music_web_api::{SearchKind, TopItemKind};
use session_config_and_utils::{init_logging, Config, Paths};
use tracing::info;

use crate::app::AppContext;

/// FindMySong command-line interface.
#[derive(Parser, Debug)]
#[command(name = "findmysong")]
#[command(about = "Sign in to the music service and browse your profile")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level.
    #[arg(short, long, env = "FINDMYSONG_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Base directory for config, preferences and logs. Defaults to ~/.findmysong
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Mirror log lines on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Treat this device as having no biometry.
    #[arg(long, global = true)]
    no_biometrics: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the provider login URL to open in a browser
    AuthorizeUrl,
    /// Exchange an authorization code for a session
    Login {
        /// The authorization code itself
        #[arg(long, conflicts_with = "redirect_url", required_unless_present = "redirect_url")]
        code: Option<String>,

        /// The full redirect URL the browser landed on
        #[arg(long)]
        redirect_url: Option<String>,

        /// The state printed by `authorize-url`
        #[arg(long, requires = "redirect_url")]
        state: Option<String>,
    },
    /// Restore the stored session (biometric check if enabled)
    Restore,
    /// Answer the biometric opt-in question
    Biometric {
        /// yes or no
        #[arg(action = clap::ArgAction::Set, value_parser = prompt::parse_yes_no)]
        enabled: bool,
    },
    /// Renew the access token with the stored refresh token
    Refresh,
    /// Delete the stored session and biometric preference
    Logout,
    /// Show the session state as JSON
    Status,
    /// Show the signed-in user's profile
    Me,
    /// Show the user's top tracks or artists
    Top {
        /// tracks or artists
        kind: TopItemKind,
    },
    /// Search the catalog
    Search {
        query: String,

        /// Second result type besides tracks (artist, track, album)
        #[arg(long, default_value = "track")]
        kind: SearchKind,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    init_logging(&level, &paths, cli.verbose)?;
    info!(base_dir = %paths.base_dir().display(), "findmysong starting");

    let ctx = AppContext::build(config, paths, !cli.no_biometrics)?;

    let result = match cli.command {
        Commands::AuthorizeUrl => commands::login::authorize_url(&ctx),
        Commands::Login {
            code,
            redirect_url,
            state,
        } => commands::login::login(&ctx, code, redirect_url, state).await,
        Commands::Restore => commands::session::restore(&ctx).await,
        Commands::Biometric { enabled } => commands::session::biometric(&ctx, enabled).await,
        Commands::Refresh => commands::session::refresh(&ctx).await,
        Commands::Logout => commands::session::logout(&ctx).await,
        Commands::Status => commands::session::status(&ctx).await,
        Commands::Me => commands::catalog::me(&ctx).await,
        Commands::Top { kind } => commands::catalog::top(&ctx, kind).await,
        Commands::Search { query, kind } => commands::catalog::search(&ctx, &query, kind).await,
    };

    if let Err(e) = result {
        eprintln!("{}", commands::describe(&e));
        std::process::exit(1);
    }
    Ok(())
}
