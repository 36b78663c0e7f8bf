use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser;
use encore_core::{ConfigManager, ShowState};
use encore_server::{AppState, ShowSession};

/// Show server that keeps an audience's devices in lockstep with a live
/// performance.
#[derive(Parser, Debug)]
#[command(name = "encore")]
#[command(about = "Encore synchronized show server")]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Media root for static assets and uploads (overrides the config file)
    #[arg(long)]
    media_dir: Option<PathBuf>,

    /// Path to the settings file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Default trigger delay in seconds, applied to the seeded show
    #[arg(long)]
    default_delay: Option<f64>,
}

fn initial_show_state(default_delay: Option<f64>) -> ShowState {
    let mut state = ShowState::default();
    if let Some(delay) = default_delay {
        state.synchro_delay = delay.max(0.0);
    }
    state
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = ConfigManager::new(Some(args.config));
    let mut settings = config.load()?;

    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(media_dir) = args.media_dir {
        settings.media_dir = media_dir.display().to_string();
    }

    ConfigManager::validate_settings(&settings)
        .map_err(|errors| anyhow!("invalid settings: {}", errors.join(", ")))?;

    log::info!(
        "starting encore on port {} with media root '{}'",
        settings.port,
        settings.media_dir
    );

    // One show per process, seeded with the built-in demo routine. Nothing
    // is persisted: a restart starts from this default again.
    let session = ShowSession::new(
        initial_show_state(args.default_delay),
        settings.broadcast_buffer,
    );
    let state = AppState {
        session,
        media_dir: PathBuf::from(&settings.media_dir),
    };

    encore_server::serve(state, settings.port).await
}
