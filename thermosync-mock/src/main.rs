use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use thermosync_mock::settings::Settings;
use thermosync_mock::{run, self_test};
use thermosync_server::services::SystemClock;

/// Multi-zone climate controller running against simulated rooms
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML file replacing the built-in configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run the relay power-on self test and exit
    #[arg(long)]
    post: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = Arc::new(match &args.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::new()?,
    });

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = settings.server.logger.level.as_str();

            format!("thermosync_server={level},thermosync_mock={level}").into()
        }))
        .init();

    if args.post {
        return self_test(&settings).await;
    }

    let clock = SystemClock::from_control(&settings.server.control)?;
    run(settings, Arc::new(clock)).await
}
