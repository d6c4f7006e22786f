use clap::Parser;
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use live_notifier::{Settings, Watcher};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Set directory of config file to use
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Check every channel once and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let flags = Args::parse();
    let mut paths: Vec<PathBuf> = Vec::new();

    if let Some(config_path) = flags.config {
        paths.push(config_path);
    } else {
        paths.push(PathBuf::from("./"));
        if let Some(dirs) = directories::ProjectDirs::from("com", "LiveNotifier", "Live Notifier")
        {
            paths.push(dirs.config_local_dir().to_owned());
            paths.push(dirs.config_dir().to_owned());
        }
    }

    let settings = match Settings::read_config(&paths) {
        Ok(settings) => settings,
        Err(error) => {
            error!("Invalid configuration: {error}");
            return ExitCode::FAILURE;
        }
    };

    let watcher = match Watcher::from_settings(&settings) {
        Ok(watcher) => watcher,
        Err(error) => {
            error!("Unable to start: {error}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        channels = settings.channel_ids.len(),
        interval = settings.check_interval,
        "watching for live broadcasts"
    );
    live_notifier::run(&settings, &watcher, flags.once).await;
    ExitCode::SUCCESS
}
