use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Deserialize, Debug)]
pub struct SearchItem {
    pub id: SearchItemId,
    pub snippet: SearchSnippet,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SearchItemId {
    pub video_id: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SearchSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub channel_title: String,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Deserialize, Debug, Default)]
pub struct Thumbnails {
    pub maxres: Option<Thumbnail>,
    pub high: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
    pub default: Option<Thumbnail>,
}

impl Thumbnails {
    /// Url of the largest thumbnail offered.
    pub fn best_url(&self) -> Option<&str> {
        [&self.maxres, &self.high, &self.medium, &self.default]
            .into_iter()
            .flatten()
            .map(|thumbnail| thumbnail.url.as_str())
            .next()
    }
}

#[derive(Deserialize, Debug)]
pub struct Thumbnail {
    pub url: String,
}

#[derive(Deserialize, Debug)]
pub struct ChannelListResponse {
    #[serde(default)]
    pub items: Vec<ChannelItem>,
}

#[derive(Deserialize, Debug)]
pub struct ChannelItem {
    pub snippet: ChannelSnippet,
}

#[derive(Deserialize, Debug)]
pub struct ChannelSnippet {
    pub title: String,
}

/// Body of a non-2xx reply.
#[derive(Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Deserialize, Debug)]
pub struct ErrorBody {
    pub message: String,
}
