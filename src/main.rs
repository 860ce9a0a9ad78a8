use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use relay_cli::{Config, InteractiveSession, RemoteClient, SessionExit, TerminalConsole};

#[derive(Parser)]
#[command(
    name = "relay",
    version,
    about = "Interactive chat client",
    after_help = "Examples:\n  relay\n  relay --phone +15551234567\n  RELAY_LOG=relay_cli=trace relay -v"
)]
struct Cli {
    #[arg(long, help = "Phone number to log in with (prompted when needed)")]
    phone: Option<String>,

    #[arg(short, long, help = "Log debug output to stderr")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load();
    tracing::debug!(api = %config.api_base_url, realtime = %config.realtime_url, "starting");

    let client = Arc::new(RemoteClient::new(&config));
    let console = Arc::new(TerminalConsole::new());
    let session = InteractiveSession::new(client, console, config.session_settings());

    match session.run(cli.phone.as_deref()).await {
        Ok(SessionExit::Quit) | Ok(SessionExit::LoggedOut) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "session failed");
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("RELAY_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}
