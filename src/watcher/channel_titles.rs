use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tracing::{debug, warn};

use super::youtube_api::YouTubeApi;

/// Lazily filled cache of channel display names.
///
/// The lock only guards the map. It is released before the lookup request goes out, so
/// lookups for different channels never queue behind each other. Two tasks missing on the
/// same channel at once both ask the api and store the same title.
#[derive(Debug, Clone, Default)]
pub struct ChannelTitles {
    titles: Arc<Mutex<HashMap<String, String>>>,
}

impl ChannelTitles {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn cached(&self, channel_id: &str) -> Option<String> {
        self.titles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(channel_id)
            .cloned()
    }

    pub fn insert(&self, channel_id: &str, title: &str) {
        self.titles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel_id.to_string(), title.to_string());
    }

    /// Display name for `channel_id`, falling back to the id itself when the lookup fails.
    /// Failed lookups are not cached.
    pub async fn resolve(&self, api: &YouTubeApi, channel_id: &str) -> String {
        if let Some(title) = self.cached(channel_id) {
            debug!(channel = channel_id, %title, "channel title cache hit");
            return title;
        }

        match api.channel_title(channel_id).await {
            Ok(title) => {
                self.insert(channel_id, &title);
                title
            }
            Err(error) => {
                warn!(channel = channel_id, %error, "unable to look up channel title");
                channel_id.to_string()
            }
        }
    }
}
