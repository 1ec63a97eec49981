use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twitch_connect::{
    CallbackServer, Credentials, CsrfState, OAuthClient, OAuthClientConfig, OAuthError,
};

#[derive(Debug, Parser)]
#[command(
    name = "twitch-connect",
    about = "Sign in with Twitch and look up users through the Helix API."
)]
struct Cli {
    /// TOML file with CLIENT_ID, CLIENT_SECRET, REDIRECT_URI and optional SCOPES.
    /// Falls back to TWITCH_* environment variables.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the consent URL without starting a flow.
    AuthUrl,
    /// Run the browser flow and print the user record as JSON.
    User {
        login: String,
        /// Seconds to wait for the redirect.
        #[arg(long, default_value_t = 300)]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), OAuthError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let credentials = match &cli.config {
        Some(path) => Credentials::from_toml_file(path)?,
        None => Credentials::from_env(),
    };
    let client = OAuthClient::new(OAuthClientConfig::try_from(credentials)?)?;

    match cli.command {
        Command::AuthUrl => {
            println!("{}", client.authorization_url()?);
            Ok(())
        }
        Command::User { login, timeout } => {
            run_user(&client, &login, Duration::from_secs(timeout)).await
        }
    }
}

async fn run_user(client: &OAuthClient, login: &str, timeout: Duration) -> Result<(), OAuthError> {
    let redirect_uri = client.config().redirect_uri.clone().ok_or_else(|| {
        OAuthError::Configuration("REDIRECT_URI is required for the browser flow".to_string())
    })?;

    let server = CallbackServer::new(&redirect_uri)?.with_timeout(timeout);
    let listener = server.bind()?;

    let state = CsrfState::generate()?;
    let authorization_url = client.authorization_url_with_state(&state)?;
    eprintln!("Authorization URL:\n{authorization_url}");
    if let Err(err) = webbrowser::open(&authorization_url) {
        eprintln!("Failed to open browser automatically: {err}");
    }

    let response = server.wait(listener).await?;
    client.set_authorization_response(response, Some(&state))?;

    let user = client.fetch_user(login).await?;
    let output = serde_json::to_string_pretty(&user).map_err(|err| OAuthError::InvalidResponse {
        message: err.to_string(),
        body: String::new(),
    })?;

    println!("{output}");
    Ok(())
}
