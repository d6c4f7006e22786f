use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::Command,
    sync::Arc,
    time::Duration,
};

use notify_rust::Notification;
use tracing::info;

use super::{error::NotifyError, youtube_api::LiveBroadcast};

pub const APP_NAME: &str = "Live Notifier";
const DISPLAY_DURATION: Duration = Duration::from_secs(10);
#[cfg(all(unix, not(target_os = "macos")))]
const SOUND_NAME: &str = "message-new-instant";
#[cfg(not(all(unix, not(target_os = "macos"))))]
const SOUND_NAME: &str = "Default";
#[cfg(all(unix, not(target_os = "macos")))]
const OPEN_ACTION: &str = "default";
#[cfg(all(unix, not(target_os = "macos")))]
const OPEN_LABEL: &str = "Watch";

/// What gets shown to the user for one broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub body: String,
    pub icon: Option<PathBuf>,
    pub open_url: Option<String>,
}

impl Notice {
    /// Titled with the channel name. When there is no icon the thumbnail url is added to
    /// the text instead.
    ///
    /// # Examples
    /// ```
    /// use live_notifier::{LiveBroadcast, Notice};
    ///
    /// let broadcast = LiveBroadcast {
    ///     video_id: String::from("v1"),
    ///     title: String::from("Stream A"),
    ///     channel_title: String::from("Chan"),
    ///     watch_url: String::from("https://www.youtube.com/watch?v=v1"),
    ///     thumbnail_url: None,
    /// };
    /// let notice = Notice::for_broadcast(&broadcast, None);
    ///
    /// assert_eq!("Chan", notice.title);
    /// assert_eq!("Stream A\nhttps://www.youtube.com/watch?v=v1", notice.body);
    /// ```
    #[must_use]
    pub fn for_broadcast(broadcast: &LiveBroadcast, icon: Option<PathBuf>) -> Self {
        let mut body = format!("{}\n{}", broadcast.title, broadcast.watch_url);
        if icon.is_none() {
            if let Some(thumbnail) = &broadcast.thumbnail_url {
                body.push('\n');
                body.push_str(thumbnail);
            }
        }

        Self {
            title: broadcast.channel_title.clone(),
            body,
            icon,
            open_url: Some(broadcast.watch_url.clone()),
        }
    }
}

/// A way of putting a notification on the desktop.
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    /// Show `notice`. Blocking, callers run it off the async workers.
    ///
    /// # Errors
    /// Will return an error if the backend fails to display the notification.
    fn render(&self, notice: &Notice) -> Result<(), NotifyError>;
}

/// Native notifications through `notify-rust`, with a sound and an action opening the
/// broadcast in the browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn name(&self) -> &'static str {
        "desktop"
    }

    fn render(&self, notice: &Notice) -> Result<(), NotifyError> {
        show_with_action(&desktop_notification(notice), notice.open_url.clone())
    }
}

fn desktop_notification(notice: &Notice) -> Notification {
    let mut notification = Notification::new();
    notification
        .appname(APP_NAME)
        .summary(&notice.title)
        .body(&notice.body);
    #[cfg(all(unix, not(target_os = "macos")))]
    notification.hint(notify_rust::Hint::SoundName(SOUND_NAME.to_string()));
    #[cfg(not(all(unix, not(target_os = "macos"))))]
    notification.sound_name(SOUND_NAME);
    if let Some(icon) = &notice.icon {
        notification.icon(&icon.to_string_lossy());
    }
    // Only the default action, drawn as one button or run on a click of the body.
    #[cfg(all(unix, not(target_os = "macos")))]
    if notice.open_url.is_some() {
        notification.action(OPEN_ACTION, OPEN_LABEL);
    }
    notification
}

#[cfg(all(unix, not(target_os = "macos")))]
fn show_with_action(
    notification: &Notification,
    open_url: Option<String>,
) -> Result<(), NotifyError> {
    let handle = notification.show()?;
    let Some(url) = open_url else {
        return Ok(());
    };

    // Blocks until the notification is clicked or closed.
    std::thread::spawn(move || {
        handle.wait_for_action(|action| {
            if action == OPEN_ACTION {
                if let Err(error) = webbrowser::open(&url) {
                    tracing::warn!(%url, %error, "unable to open browser");
                }
            }
        });
    });
    Ok(())
}

// Only freedesktop servers report actions back, elsewhere the url stays in the body text.
#[cfg(not(all(unix, not(target_os = "macos"))))]
fn show_with_action(
    notification: &Notification,
    _open_url: Option<String>,
) -> Result<(), NotifyError> {
    notification.show()?;
    Ok(())
}

/// Fallback that shells out to `notify-send`. No click action.
///
/// `notify-send` talks to the same notification server, it only helps where the server
/// answers libnotify but not the D-Bus connection `notify-rust` opens itself.
#[derive(Debug, Clone)]
pub struct NotifySendNotifier {
    program: String,
    duration: Duration,
}

impl NotifySendNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::with_program("notify-send")
    }

    #[must_use]
    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_string(),
            duration: DISPLAY_DURATION,
        }
    }

    /// Whether the program can be found, either as a path or on `PATH`.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        find_program(&self.program, std::env::var_os("PATH").as_deref())
    }

    fn command(&self, notice: &Notice) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("--app-name")
            .arg(APP_NAME)
            .arg("--expire-time")
            .arg(self.duration.as_millis().to_string());
        if let Some(icon) = &notice.icon {
            command.arg("--icon").arg(icon);
        }
        command.arg(&notice.title).arg(&notice.body);
        command
    }
}

fn find_program(program: &str, search_path: Option<&OsStr>) -> bool {
    let program = Path::new(program);
    if program.components().count() > 1 {
        return program.is_file();
    }
    search_path.is_some_and(|paths| {
        std::env::split_paths(paths).any(|dir| dir.join(program).is_file())
    })
}

impl Default for NotifySendNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for NotifySendNotifier {
    fn name(&self) -> &'static str {
        "notify-send"
    }

    fn render(&self, notice: &Notice) -> Result<(), NotifyError> {
        let status = self.command(notice).status()?;
        if status.success() {
            Ok(())
        } else {
            Err(NotifyError::Command(status))
        }
    }
}

/// Pick the backend once at startup. On freedesktop systems the native backend is used
/// when a notification server answers, otherwise `notify-send` if it is installed.
#[cfg(all(unix, not(target_os = "macos")))]
#[must_use]
pub fn select_notifier() -> Arc<dyn Notifier> {
    let error = match notify_rust::get_server_information() {
        Ok(server) => {
            info!(server = %server.name, "using desktop notifications");
            return Arc::new(DesktopNotifier);
        }
        Err(error) => error,
    };

    let fallback = NotifySendNotifier::new();
    if fallback.is_installed() {
        tracing::warn!(
            %error,
            "no answer from the notification server, falling back to notify-send"
        );
        Arc::new(fallback)
    } else {
        tracing::warn!(%error, "no notification server found and notify-send is not installed");
        Arc::new(DesktopNotifier)
    }
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
#[must_use]
pub fn select_notifier() -> Arc<dyn Notifier> {
    info!("using desktop notifications");
    Arc::new(DesktopNotifier)
}
