//! Application constants and the immutable start-up configuration.
//!
//! Everything the window shell and the webview need is collected into a
//! [`KioskConfig`] once in `main` and passed down explicitly.

use std::path::PathBuf;
use std::time::Duration;

use crate::autofill::AutofillSettings;

/// Window title shown by the task bar and the custom title bar.
pub const APP_TITLE: &str = "Kiosk Browser";

/// Address that enables login auto-fill when loaded.
pub const DEFAULT_TRIGGER_URL: &str = "http://10.0.10.27/";

/// Loaded when no URL has been saved yet.
pub const BLANK_URL: &str = "about:blank";

/// Desktop Chrome identification presented to the remote server.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";

/// Credentials file name, resolved next to the executable.
pub const CREDENTIALS_FILE_NAME: &str = "credentials.ini";

/// Login form inputs filled by the auto-fill script.
pub const USER_FIELD_ID: &str = "Editbox1";
pub const PASSWORD_FIELD_ID: &str = "Editbox2";

/// Delay before the first fill attempt after a page load (milliseconds)
pub const INITIAL_AUTOFILL_DELAY_MS: u64 = 250;

/// Base delay between fill attempts; retry `n` waits `n` times this (milliseconds)
pub const AUTOFILL_RETRY_DELAY_MS: u64 = 500;

/// Total fill attempts per page load, including the first one
pub const MAX_AUTOFILL_ATTEMPTS: u32 = 3;

/// Gap between filling the user field and the password field (milliseconds)
pub const FIELD_FILL_DELAY_MS: u64 = 250;

/// Two title-bar presses closer than this form a double-click.
pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(300);

/// How long the credentials dialog shows its success message before closing.
pub const DIALOG_CLOSE_DELAY: Duration = Duration::from_millis(1200);

/// Size of the main window when it is not maximized (logical pixels).
pub const WINDOW_WIDTH: f64 = 1280.0;
pub const WINDOW_HEIGHT: f64 = 800.0;

/// Credentials dialog size (logical pixels).
pub const DIALOG_WIDTH: f64 = 320.0;
pub const DIALOG_HEIGHT: f64 = 360.0;

/// Height of the custom title bar (logical pixels).
#[cfg(target_os = "windows")]
pub const TITLE_BAR_HEIGHT: f64 = 28.0;
#[cfg(not(target_os = "windows"))]
pub const TITLE_BAR_HEIGHT: f64 = 32.0;

/// Rendering switches for the platform webview, decided once at start-up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineSettings {
    /// Environment variables that must be set before the toolkit initialises.
    pub environment: Vec<(&'static str, &'static str)>,
    /// Extra Chromium switches for WebView2.
    #[cfg(target_os = "windows")]
    pub browser_args: Option<String>,
}

impl EngineSettings {
    #[cfg(target_os = "linux")]
    pub fn for_current_platform() -> Self {
        // Software rendering: GPU compositing is unreliable on the thin clients
        // this runs on.
        Self {
            environment: vec![
                ("WEBKIT_DISABLE_COMPOSITING_MODE", "1"),
                ("WEBKIT_DISABLE_DMABUF_RENDERER", "1"),
            ],
        }
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    pub fn for_current_platform() -> Self {
        Self::default()
    }

    #[cfg(target_os = "windows")]
    pub fn for_current_platform() -> Self {
        Self {
            environment: Vec::new(),
            browser_args: Some(
                "--enable-gpu-rasterization --ignore-gpu-blocklist --enable-zero-copy".to_string(),
            ),
        }
    }

    /// Export the environment switches. Must run before the event loop exists.
    pub fn apply_environment(&self) {
        for (key, value) in &self.environment {
            if std::env::var_os(key).is_none() {
                tracing::debug!("Setting {}={}", key, value);
                std::env::set_var(key, value);
            }
        }
    }
}

/// Immutable configuration for one kiosk session.
#[derive(Debug, Clone)]
pub struct KioskConfig {
    /// Page opened at start-up; `None` falls back to [`BLANK_URL`].
    pub start_url: Option<String>,
    pub title: String,
    pub icon: Option<PathBuf>,
    pub user_agent: String,
    pub devtools: bool,
    /// Webview cache/profile directory.
    pub data_dir: PathBuf,
    pub autofill: AutofillSettings,
    pub engine: EngineSettings,
}

impl KioskConfig {
    pub fn start_url(&self) -> &str {
        self.start_url.as_deref().unwrap_or(BLANK_URL)
    }
}

/// Default webview data directory: the user cache dir, or the temp dir.
pub fn default_data_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("kiosk-browser")
}

/// Expand `~` in user-supplied paths.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}
