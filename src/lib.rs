pub mod watcher;
pub use crate::watcher::{
    channel_titles::ChannelTitles,
    error::{ApiError, ConfigError, IconError, NotifyError},
    icon::IconPipeline,
    live_checker::{CheckOutcome, Watcher},
    notified::NotifiedVideos,
    notifier::{select_notifier, DesktopNotifier, Notice, Notifier, NotifySendNotifier},
    youtube_api::{LiveBroadcast, YouTubeApi},
    Settings,
};

use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

/// Poll every configured channel, forever.
///
/// Each cycle checks all channels concurrently and only sleeps once all of them are done,
/// so cycles never overlap. With `once` set, a single cycle runs and the function returns.
pub async fn run(settings: &Settings, watcher: &Watcher, once: bool) {
    let interval = Duration::from_secs(settings.check_interval);
    let mut cycle: u64 = 0;

    loop {
        cycle += 1;
        info!(
            cycle,
            channels = settings.channel_ids.len(),
            "checking channels"
        );
        watcher.run_cycle(&settings.channel_ids).await;

        if once {
            return;
        }
        sleep(interval).await;
    }
}
