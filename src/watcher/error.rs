use std::path::PathBuf;

use thiserror::Error;

/// Problems with `config.json`. All of them stop the program at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config.json found, a template was written to {}", .0.display())]
    NotFound(PathBuf),
    #[error("unable to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unable to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("API_KEY is missing or empty")]
    MissingApiKey,
    #[error("CHANNEL_IDS is missing or empty")]
    NoChannels,
    #[error("CHECK_INTERVAL must be greater than zero")]
    ZeroInterval,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("api returned {status}: {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("search result has no video id")]
    MissingVideoId,
    #[error("api returned no items")]
    EmptyResult,
}

#[derive(Debug, Error)]
pub enum IconError {
    #[error("unable to fetch thumbnail: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("thumbnail request returned {0}")]
    Status(reqwest::StatusCode),
    #[cfg(feature = "icon")]
    #[error("unable to convert thumbnail: {0}")]
    Image(#[from] image::ImageError),
    #[error("unable to write icon: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("desktop notification failed: {0}")]
    Desktop(#[from] notify_rust::error::Error),
    #[error("unable to run notify-send: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("notify-send exited with {0}")]
    Command(std::process::ExitStatus),
    #[error("notification task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
