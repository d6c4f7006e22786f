pub mod channel_titles;
pub mod error;
pub mod icon;
pub mod live_checker;
pub mod notified;
pub mod notifier;
pub mod youtube_api;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use error::ConfigError;

const CONFIG_FILE: &str = "config.json";
const DEFAULT_CHECK_INTERVAL: u64 = 300;

/// The configuration settings of the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_key: String,
    pub channel_ids: Vec<String>,
    pub check_interval: u64,
}

/// `config.json` as written by the user, before validation.
#[derive(Serialize, Deserialize, Debug, Default)]
struct RawSettings {
    #[serde(rename = "API_KEY", default)]
    api_key: Option<String>,
    #[serde(rename = "CHANNEL_IDS", default)]
    channel_ids: Option<Vec<String>>,
    #[serde(rename = "CHANNEL_ID", default, skip_serializing)]
    channel_id: Option<String>,
    #[serde(rename = "CHECK_INTERVAL", default)]
    check_interval: Option<u64>,
}

impl RawSettings {
    fn template() -> Self {
        Self {
            api_key: Some(String::new()),
            channel_ids: Some(Vec::new()),
            channel_id: None,
            check_interval: Some(DEFAULT_CHECK_INTERVAL),
        }
    }
}

impl TryFrom<RawSettings> for Settings {
    type Error = ConfigError;

    fn try_from(raw: RawSettings) -> Result<Self, Self::Error> {
        let api_key = raw
            .api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let mut channel_ids: Vec<String> = Vec::new();
        for id in raw.channel_ids.into_iter().flatten().chain(raw.channel_id) {
            let id = id.trim();
            if !id.is_empty() && !channel_ids.iter().any(|known| known == id) {
                channel_ids.push(id.to_string());
            }
        }
        if channel_ids.is_empty() {
            return Err(ConfigError::NoChannels);
        }

        let check_interval = raw.check_interval.unwrap_or(DEFAULT_CHECK_INTERVAL);
        if check_interval == 0 {
            return Err(ConfigError::ZeroInterval);
        }

        Ok(Self {
            api_key,
            channel_ids,
            check_interval,
        })
    }
}

impl Settings {
    /// Parse and validate the contents of a `config.json`.
    ///
    /// `CHANNEL_ID` is the single-channel field of older configs. It is merged
    /// after `CHANNEL_IDS`, blank and repeated ids are dropped.
    ///
    /// # Examples
    /// ```
    /// use live_notifier::Settings;
    ///
    /// let settings = Settings::from_json(r#"{"API_KEY": "k", "CHANNEL_ID": "UCabc"}"#).unwrap();
    ///
    /// assert_eq!(vec![String::from("UCabc")], settings.channel_ids);
    /// assert_eq!(300, settings.check_interval);
    /// ```
    ///
    /// # Errors
    /// Will return an error if the json is malformed, the api key is blank, no channel is
    /// listed, or the interval is zero.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawSettings = serde_json::from_str(json)?;
        Self::try_from(raw)
    }

    /// Populate settings from the first `config.json` found in `paths`.
    ///
    /// When none of the directories has one, a template is written to the last
    /// directory so the user has something to fill in, and an error is still returned.
    ///
    /// # Examples
    /// ```no_run
    /// use std::path::PathBuf;
    /// use live_notifier::Settings;
    ///
    /// let paths = vec![PathBuf::from("./")];
    /// let settings = Settings::read_config(&paths).unwrap();
    /// ```
    ///
    /// # Errors
    /// Will return an error if no config file exists, it cannot be read, or it does not pass
    /// validation.
    pub fn read_config(paths: &[PathBuf]) -> Result<Self, ConfigError> {
        for path in paths {
            let file = path.join(CONFIG_FILE);
            if file.exists() {
                let data = std::fs::read_to_string(&file)
                    .map_err(|source| ConfigError::Io { path: file, source })?;
                return Self::from_json(&data);
            }
        }

        let local_path = paths.last().map_or_else(|| Path::new(""), PathBuf::as_path);
        Err(write_template(local_path))
    }
}

fn write_template(dir: &Path) -> ConfigError {
    let file = dir.join(CONFIG_FILE);
    let data = match serde_json::to_string_pretty(&RawSettings::template()) {
        Ok(data) => data,
        Err(error) => return error.into(),
    };
    let written = std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&file, data));
    match written {
        Ok(()) => ConfigError::NotFound(file),
        Err(source) => ConfigError::Io { path: file, source },
    }
}
