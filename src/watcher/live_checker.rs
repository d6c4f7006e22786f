use std::{convert::identity, sync::Arc, time::Duration};

use futures_util::future::join_all;
use reqwest::Client;
use tokio::task;
use tracing::{error, info, warn};

use super::{
    channel_titles::ChannelTitles,
    error::{ApiError, NotifyError},
    icon::IconPipeline,
    notified::NotifiedVideos,
    notifier::{select_notifier, Notice, Notifier},
    youtube_api::{LiveBroadcast, YouTubeApi},
    Settings,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// What a single channel check ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    NotLive { channel_title: String },
    AlreadyNotified { video_id: String },
    /// A new broadcast was announced. `delivered` is false when the backend failed; the
    /// broadcast is still remembered and will not be announced again.
    Notified { video_id: String, delivered: bool },
    Failed { reason: String },
}

/// Everything a channel check needs, shared by all checks of all cycles.
///
/// Cloning is cheap, the caches are reference counted.
#[derive(Clone)]
pub struct Watcher {
    api: YouTubeApi,
    titles: ChannelTitles,
    notified: NotifiedVideos,
    icons: IconPipeline,
    notifier: Arc<dyn Notifier>,
}

impl Watcher {
    #[must_use]
    pub fn new(api: YouTubeApi, icons: IconPipeline, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            titles: ChannelTitles::new(),
            notified: NotifiedVideos::new(),
            icons,
            notifier,
        }
    }

    /// Build a watcher talking to the real api, with the notification backend probed once.
    ///
    /// # Errors
    /// Will return an error if the http client cannot be created.
    pub fn from_settings(settings: &Settings) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let api = YouTubeApi::new(client.clone(), &settings.api_key);
        let icons = IconPipeline::new(client);
        if !icons.is_enabled() {
            info!("built without image support, thumbnails will be linked instead");
        }

        Ok(Self::new(api, icons, select_notifier()))
    }

    #[must_use]
    pub const fn notified(&self) -> &NotifiedVideos {
        &self.notified
    }

    #[must_use]
    pub const fn titles(&self) -> &ChannelTitles {
        &self.titles
    }

    /// Check one channel and announce its broadcast if it is new.
    ///
    /// Never fails: api problems are logged and reported as [`CheckOutcome::Failed`] so
    /// that sibling checks and later cycles carry on.
    pub async fn check_channel_live(&self, channel_id: &str) -> CheckOutcome {
        match self.try_check(channel_id).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(channel = channel_id, %error, "unable to check live status");
                CheckOutcome::Failed {
                    reason: error.to_string(),
                }
            }
        }
    }

    /// Run one check per channel concurrently and wait for every one of them.
    ///
    /// Outcomes come back in the order of `channel_ids`.
    pub async fn run_cycle(&self, channel_ids: &[String]) -> Vec<CheckOutcome> {
        let handles: Vec<_> = channel_ids
            .iter()
            .map(|channel_id| {
                let watcher = self.clone();
                let channel_id = channel_id.clone();
                task::spawn(async move { watcher.check_channel_live(&channel_id).await })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(channel_ids)
            .map(|(result, channel_id)| {
                result.unwrap_or_else(|error| {
                    error!(channel = %channel_id, %error, "Error encountered in task");
                    CheckOutcome::Failed {
                        reason: error.to_string(),
                    }
                })
            })
            .collect()
    }

    async fn try_check(&self, channel_id: &str) -> Result<CheckOutcome, ApiError> {
        let response = self.api.search_live(channel_id).await?;

        let Some(mut broadcast) = LiveBroadcast::from_search(response)? else {
            let channel_title = self.titles.resolve(&self.api, channel_id).await;
            info!(channel = channel_id, "{channel_title} is not currently live");
            return Ok(CheckOutcome::NotLive { channel_title });
        };

        if broadcast.channel_title.is_empty() {
            broadcast.channel_title = self.titles.resolve(&self.api, channel_id).await;
        } else {
            self.titles.insert(channel_id, &broadcast.channel_title);
        }

        if !self.notified.insert_if_new(&broadcast.video_id) {
            info!(
                channel = channel_id,
                video_id = %broadcast.video_id,
                "{} already notified: {}",
                broadcast.channel_title,
                broadcast.title
            );
            return Ok(CheckOutcome::AlreadyNotified {
                video_id: broadcast.video_id,
            });
        }

        info!(
            channel = channel_id,
            video_id = %broadcast.video_id,
            "{} is live: {}",
            broadcast.channel_title,
            broadcast.title
        );
        let delivered = self.announce(&broadcast).await;

        Ok(CheckOutcome::Notified {
            video_id: broadcast.video_id,
            delivered,
        })
    }

    async fn announce(&self, broadcast: &LiveBroadcast) -> bool {
        let icon = self
            .icons
            .prepare(&broadcast.video_id, broadcast.thumbnail_url.as_deref())
            .await;
        let notice = Notice::for_broadcast(broadcast, icon.clone());

        let notifier = Arc::clone(&self.notifier);
        let result = task::spawn_blocking(move || notifier.render(&notice))
            .await
            .map_err(NotifyError::from)
            .and_then(identity);

        if let Some(path) = icon {
            // Detached, may outlive this cycle.
            drop(self.icons.schedule_cleanup(path));
        }

        match result {
            Ok(()) => {
                info!(
                    video_id = %broadcast.video_id,
                    backend = self.notifier.name(),
                    "notification sent"
                );
                true
            }
            Err(error) => {
                warn!(video_id = %broadcast.video_id, %error, "unable to show notification");
                false
            }
        }
    }
}
