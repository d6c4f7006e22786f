pub mod api_structs;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::ApiError;
use api_structs::{ChannelListResponse, ErrorResponse, SearchResponse};

pub const YOUTUBE_API_URL: &str = "https://www.googleapis.com/youtube/v3";
pub const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// A broadcast found by a live search. Built from one response and dropped after the
/// notification is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveBroadcast {
    pub video_id: String,
    pub title: String,
    pub channel_title: String,
    pub watch_url: String,
    pub thumbnail_url: Option<String>,
}

impl LiveBroadcast {
    /// Take the first search item as the live broadcast, trusting the api's ranking.
    ///
    /// Returns `Ok(None)` when the search came back empty.
    ///
    /// # Errors
    /// Will return an error if the first item carries no video id.
    pub fn from_search(response: SearchResponse) -> Result<Option<Self>, ApiError> {
        let Some(item) = response.items.into_iter().next() else {
            return Ok(None);
        };
        let video_id = item
            .id
            .video_id
            .filter(|id| !id.is_empty())
            .ok_or(ApiError::MissingVideoId)?;
        let thumbnail_url = item.snippet.thumbnails.best_url().map(str::to_string);

        Ok(Some(Self {
            watch_url: format!("{WATCH_URL}{video_id}"),
            video_id,
            title: item.snippet.title,
            channel_title: item.snippet.channel_title,
            thumbnail_url,
        }))
    }
}

/// Key-authenticated client for the two YouTube Data api endpoints the watcher needs.
#[derive(Debug, Clone)]
pub struct YouTubeApi {
    client: Client,
    api_key: String,
    base_url: String,
}

impl YouTubeApi {
    #[must_use]
    pub fn new(client: Client, api_key: &str) -> Self {
        Self::with_base_url(client, api_key, YOUTUBE_API_URL)
    }

    /// Point the client at another host, used to talk to a mock server.
    #[must_use]
    pub fn with_base_url(client: Client, api_key: &str, base_url: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Search a channel for videos that are live right now.
    ///
    /// # Errors
    /// Will return an error on a failed request, a non-2xx status or an undecodable body.
    pub async fn search_live(&self, channel_id: &str) -> Result<SearchResponse, ApiError> {
        debug!(channel = channel_id, "searching for live broadcasts");
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("part", "snippet"),
                ("channelId", channel_id),
                ("eventType", "live"),
                ("type", "video"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        decode(response).await
    }

    /// Look up the display name of a channel.
    ///
    /// # Errors
    /// Will return an error on a failed request, a non-2xx status, an undecodable body or
    /// when no channel matches the id.
    pub async fn channel_title(&self, channel_id: &str) -> Result<String, ApiError> {
        let response = self
            .client
            .get(format!("{}/channels", self.base_url))
            .query(&[
                ("part", "snippet"),
                ("id", channel_id),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let channels: ChannelListResponse = decode(response).await?;
        channels
            .items
            .into_iter()
            .next()
            .map(|channel| channel.snippet.title)
            .ok_or(ApiError::EmptyResult)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(body) => body.error.message,
        Err(_) => text,
    };
    Err(ApiError::Status { status, message })
}
