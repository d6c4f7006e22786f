//! Thumbnail to notification icon conversion.
//!
//! Only does work when built with the `icon` feature. Without it every broadcast is
//! announced without an icon and the thumbnail url goes into the notification text.

#[cfg(feature = "icon")]
use std::io::Write;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use reqwest::Client;
#[cfg(feature = "icon")]
use tokio::task;
use tokio::{task::JoinHandle, time::sleep};
use tracing::debug;
#[cfg(feature = "icon")]
use tracing::warn;

#[cfg(feature = "icon")]
use super::error::IconError;

pub const ICON_SIZE: u32 = 64;
pub const CLEANUP_DELAY: Duration = Duration::from_secs(30);
#[cfg(feature = "icon")]
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[cfg(all(feature = "icon", windows))]
const ICON_FORMAT: image::ImageFormat = image::ImageFormat::Ico;
#[cfg(all(feature = "icon", not(windows)))]
const ICON_FORMAT: image::ImageFormat = image::ImageFormat::Png;

#[cfg(all(feature = "icon", windows))]
const ICON_SUFFIX: &str = ".ico";
#[cfg(all(feature = "icon", not(windows)))]
const ICON_SUFFIX: &str = ".png";

#[derive(Debug, Clone)]
pub struct IconPipeline {
    #[cfg_attr(not(feature = "icon"), allow(dead_code))]
    client: Client,
    enabled: bool,
    dir: PathBuf,
    cleanup_delay: Duration,
}

impl IconPipeline {
    /// Whether this build can decode images at all.
    #[must_use]
    pub const fn available() -> bool {
        cfg!(feature = "icon")
    }

    /// A pipeline writing icons to the system temp directory, enabled when the build
    /// supports it.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            enabled: Self::available(),
            dir: std::env::temp_dir(),
            cleanup_delay: CLEANUP_DELAY,
        }
    }

    /// A pipeline that never produces an icon.
    #[must_use]
    pub fn disabled(client: Client) -> Self {
        Self {
            enabled: false,
            ..Self::new(client)
        }
    }

    #[must_use]
    pub fn with_dir(mut self, dir: &Path) -> Self {
        self.dir = dir.to_path_buf();
        self
    }

    #[must_use]
    pub fn with_cleanup_delay(mut self, delay: Duration) -> Self {
        self.cleanup_delay = delay;
        self
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Fetch the thumbnail and write it out as a square icon.
    ///
    /// The file gets a fresh random name and is created exclusively, an existing entry
    /// (or symlink) in the directory is never written through.
    ///
    /// Returns the icon path, or `None` when the pipeline is disabled, there is no
    /// thumbnail, or any step of the conversion fails.
    pub async fn prepare(&self, video_id: &str, thumbnail_url: Option<&str>) -> Option<PathBuf> {
        if !self.enabled {
            debug!(video_id, "icon conversion unavailable, skipping");
            return None;
        }
        let url = thumbnail_url?;
        self.build_icon(video_id, url).await
    }

    #[cfg(feature = "icon")]
    async fn build_icon(&self, video_id: &str, url: &str) -> Option<PathBuf> {
        match self.convert(video_id, url).await {
            Ok(path) => {
                debug!(video_id, path = %path.display(), "wrote notification icon");
                Some(path)
            }
            Err(error) => {
                warn!(video_id, url, %error, "unable to build icon from thumbnail");
                None
            }
        }
    }

    #[cfg(not(feature = "icon"))]
    async fn build_icon(&self, video_id: &str, url: &str) -> Option<PathBuf> {
        debug!(video_id, url, "built without icon support");
        None
    }

    /// Delete `path` once the notification has had time to show. The returned task is
    /// detached by callers; deletion errors are ignored.
    pub fn schedule_cleanup(&self, path: PathBuf) -> JoinHandle<()> {
        let delay = self.cleanup_delay;
        tokio::spawn(async move {
            sleep(delay).await;
            let _ = tokio::fs::remove_file(&path).await;
        })
    }

    #[cfg(feature = "icon")]
    async fn convert(&self, video_id: &str, url: &str) -> Result<PathBuf, IconError> {
        let response = self
            .client
            .get(url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(IconError::Status(response.status()));
        }
        let bytes = response.bytes().await?;

        let icon = encode_icon(&bytes)?;
        let dir = self.dir.clone();
        let prefix = icon_prefix(video_id);
        let path = task::spawn_blocking(move || write_icon(&dir, &prefix, &icon))
            .await
            .map_err(std::io::Error::other)??;
        Ok(path)
    }
}

#[cfg_attr(not(feature = "icon"), allow(dead_code))]
fn icon_prefix(video_id: &str) -> String {
    let name: String = video_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    format!("live-notifier-{name}-")
}

#[cfg(feature = "icon")]
fn write_icon(dir: &Path, prefix: &str, icon: &[u8]) -> std::io::Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(ICON_SUFFIX)
        .tempfile_in(dir)?;
    file.write_all(icon)?;
    let (_, path) = file.keep()?;
    Ok(path)
}

#[cfg(feature = "icon")]
fn encode_icon(bytes: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    use image::{imageops::FilterType, DynamicImage};

    let thumbnail = image::load_from_memory(bytes)?;
    let icon = thumbnail.resize_exact(ICON_SIZE, ICON_SIZE, FilterType::Lanczos3);
    let icon = DynamicImage::ImageRgba8(icon.to_rgba8());

    let mut out = std::io::Cursor::new(Vec::new());
    icon.write_to(&mut out, ICON_FORMAT)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_pipeline_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = IconPipeline::disabled(Client::new()).with_dir(dir.path());

        let icon = pipeline
            .prepare("v1", Some("http://127.0.0.1:9/default.jpg"))
            .await;

        assert_eq!(None, icon);
        assert_eq!(0, std::fs::read_dir(dir.path()).unwrap().count());
    }

    #[tokio::test]
    async fn no_thumbnail_no_icon() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = IconPipeline::new(Client::new()).with_dir(dir.path());

        assert_eq!(None, pipeline.prepare("v1", None).await);
    }

    #[test]
    fn icon_prefix_is_sanitised() {
        assert_eq!("live-notifier-v1-", icon_prefix("../v1"));
        assert_eq!("live-notifier-a_b-c-", icon_prefix("a_b/c-"));
    }

    #[tokio::test]
    async fn cleanup_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icon.png");
        std::fs::write(&path, b"icon").unwrap();

        let pipeline =
            IconPipeline::new(Client::new()).with_cleanup_delay(Duration::from_millis(10));
        pipeline.schedule_cleanup(path.clone()).await.unwrap();

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn cleanup_of_missing_file_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline =
            IconPipeline::new(Client::new()).with_cleanup_delay(Duration::from_millis(1));

        pipeline
            .schedule_cleanup(dir.path().join("gone.png"))
            .await
            .unwrap();
    }

    #[cfg(feature = "icon")]
    mod conversion {
        use super::*;
        use image::{DynamicImage, ImageFormat, RgbImage};
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn thumbnail_bytes() -> Vec<u8> {
            let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(
                120,
                90,
                image::Rgb([200, 30, 30]),
            ));
            let mut out = std::io::Cursor::new(Vec::new());
            image.write_to(&mut out, ImageFormat::Png).unwrap();
            out.into_inner()
        }

        #[tokio::test]
        async fn thumbnail_becomes_square_icon() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/vi/v1/default.jpg"))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(thumbnail_bytes()))
                .mount(&server)
                .await;

            let dir = tempfile::tempdir().unwrap();
            let pipeline = IconPipeline::new(Client::new()).with_dir(dir.path());
            let url = format!("{}/vi/v1/default.jpg", server.uri());

            let icon = pipeline.prepare("v1", Some(&url)).await.unwrap();

            assert!(icon.starts_with(dir.path()));
            let name = icon.file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with("live-notifier-v1-"));
            assert!(name.ends_with(ICON_SUFFIX));
            let written = image::open(&icon).unwrap();
            assert_eq!((ICON_SIZE, ICON_SIZE), (written.width(), written.height()));
        }

        #[cfg(unix)]
        #[tokio::test]
        async fn existing_symlink_is_not_followed() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/vi/v1/default.jpg"))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(thumbnail_bytes()))
                .mount(&server)
                .await;

            let dir = tempfile::tempdir().unwrap();
            let victim = dir.path().join("victim.txt");
            std::fs::write(&victim, "precious data").unwrap();
            let planted = dir.path().join(format!("live-notifier-v1{ICON_SUFFIX}"));
            std::os::unix::fs::symlink(&victim, &planted).unwrap();

            let pipeline = IconPipeline::new(Client::new()).with_dir(dir.path());
            let url = format!("{}/vi/v1/default.jpg", server.uri());
            let icon = pipeline.prepare("v1", Some(&url)).await.unwrap();

            assert_ne!(planted, icon);
            assert_eq!("precious data", std::fs::read_to_string(&victim).unwrap());
            assert!(!std::fs::symlink_metadata(&icon).unwrap().file_type().is_symlink());
            assert!(image::open(&icon).is_ok());
        }

        #[tokio::test]
        async fn undecodable_thumbnail_gives_no_icon() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/broken.jpg"))
                .respond_with(ResponseTemplate::new(200).set_body_string("not an image"))
                .mount(&server)
                .await;

            let dir = tempfile::tempdir().unwrap();
            let pipeline = IconPipeline::new(Client::new()).with_dir(dir.path());
            let url = format!("{}/broken.jpg", server.uri());

            assert_eq!(None, pipeline.prepare("v1", Some(&url)).await);
            assert_eq!(0, std::fs::read_dir(dir.path()).unwrap().count());
        }

        #[tokio::test]
        async fn missing_thumbnail_gives_no_icon() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(404))
                .mount(&server)
                .await;

            let pipeline = IconPipeline::new(Client::new());
            let url = format!("{}/missing.jpg", server.uri());

            assert_eq!(None, pipeline.prepare("v1", Some(&url)).await);
        }
    }
}
