use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use lala::{
    ApiClient, AuthConfig, CallbackOutcome, ClientConfig, LeaderboardClient, SessionManager,
    StateDir, UploadsClient,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Label width used by `whoami`, matching the header chip.
const LABEL_WIDTH: usize = 28;

#[derive(Parser)]
#[command(
    name = "lala",
    about = "Sign in to the lala platform and call its APIs",
    version
)]
struct Cli {
    /// Directory for session and token files
    #[arg(long, global = true, env = "LALA_STATE_DIR", default_value = ".lala")]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a login and print the hosted UI URL to open
    Login,

    /// Finish a login from the URL the browser was redirected to
    Callback {
        /// Full redirect URL, including `code` and `state`
        url: Url,
    },

    /// Show who is signed in
    Whoami,

    /// Print the current ID token as a bearer header
    Token {
        /// Print the bare token instead
        #[arg(long)]
        raw: bool,
    },

    /// Sign out and print the hosted UI logout URL
    Logout,

    /// Show the top of the leaderboard
    Leaderboard {
        /// Number of rows
        #[arg(long, short = 'n', default_value_t = 25)]
        limit: u32,
    },

    /// Show your own rank
    Me,

    /// Upload a file through a signed URL
    Upload {
        /// File to upload
        file: PathBuf,

        /// Content type (defaults to application/octet-stream)
        #[arg(long)]
        content_type: Option<String>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let state = StateDir::new(cli.state_dir);
    tracing::debug!(state_dir = %state.root().display(), "Using state directory");
    let session = state
        .session_manager(AuthConfig::from_env())
        .context("Identity provider is not configured")?;

    match cli.command {
        Command::Login => {
            let redirect = session.login()?;
            println!("{}", redirect);
        }
        Command::Callback { url } => callback(&session, &url).await?,
        Command::Whoami => match session.signed_in_identity() {
            Some(identity) => {
                println!("{}", identity.short_label(LABEL_WIDTH));
                println!("  title: {}", identity.title());
                if let Some(sub) = identity.subject() {
                    println!("  sub:   {}", sub);
                }
                println!("  exp:   {}", identity.claims.exp);
            }
            None => println!("Not signed in"),
        },
        Command::Token { raw } => {
            let Some(token) = session.id_token_valid() else {
                bail!("No valid ID token; run `lala login`");
            };
            if raw {
                println!("{}", token);
            } else {
                println!("Bearer {}", token);
            }
        }
        Command::Logout => {
            let redirect = session.logout()?;
            println!("{}", redirect);
        }
        Command::Leaderboard { limit } => {
            let leaderboard = LeaderboardClient::new(api_client(session)?);
            for row in leaderboard.top(limit).await? {
                println!("{:>4}  {:<32}  {:>8}", row.rank, row.name, row.points);
            }
        }
        Command::Me => {
            let leaderboard = LeaderboardClient::new(api_client(session)?);
            match leaderboard.me().await? {
                Some(me) => match me.rank {
                    Some(rank) => println!("Rank {} with {} points", rank, me.score),
                    None => println!("Unranked with {} points", me.score),
                },
                None => println!("Not signed in"),
            }
        }
        Command::Upload { file, content_type } => {
            let name = file
                .file_name()
                .and_then(|n| n.to_str())
                .with_context(|| format!("Not a file: {}", file.display()))?
                .to_string();
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let uploads = UploadsClient::from_config(&ClientConfig::from_env()?, session)?;
            let key = uploads
                .upload(&name, content_type.as_deref(), bytes)
                .await?;
            println!("Uploaded OK -> {}", key);
        }
    }

    Ok(())
}

async fn callback(session: &SessionManager, url: &Url) -> Result<()> {
    let outcome = session.handle_auth_callback(url).await;
    if let Some(clean) = outcome.replace_url() {
        println!("{}", clean);
    }
    match outcome {
        CallbackOutcome::NotCallback => bail!("URL carries no authorization code"),
        CallbackOutcome::Rejected { reason, .. } => bail!("Callback rejected: {}", reason),
        CallbackOutcome::ExchangeFailed {
            status: Some(status),
            ..
        } => bail!("Token exchange failed with HTTP {}", status),
        CallbackOutcome::ExchangeFailed { status: None, .. } => bail!("Token exchange failed"),
        CallbackOutcome::SignedIn { .. } => {
            if let Some(identity) = session.signed_in_identity() {
                eprintln!("Signed in as {}", identity.label);
            }
            Ok(())
        }
    }
}

fn api_client(session: SessionManager) -> Result<ApiClient> {
    Ok(ApiClient::from_config(&ClientConfig::from_env()?, session)?)
}
