//! Data models shared by the store, the CLI and the webview IPC channels.

use serde::{Deserialize, Serialize};

/// Saved login for the kiosk site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Page to open at start-up (may be empty)
    #[serde(default)]
    pub url: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            url: url.into(),
        }
    }

    /// Both login fields are filled in.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// Credentials as reported by `credentials show`.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialsSummary {
    /// Credentials file location
    pub path: String,
    pub username: Option<String>,
    /// Always masked
    pub password: Option<String>,
    pub url: Option<String>,
}

/// Messages posted by the title bar (`window.ipc.postMessage`).
///
/// `x`/`y` are the pointer's screen coordinates in CSS pixels.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ChromeMessage {
    Press { x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Release,
    Close,
    Minimize,
    ToggleFullscreen,
    Credentials,
}

/// Messages posted by the credentials dialog.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum DialogMessage {
    Save {
        username: String,
        password: String,
        #[serde(default)]
        url: String,
    },
    Cancel,
}

/// Kind of acknowledgement shown inside the credentials dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_completeness() {
        assert!(Credentials::new("alice", "secret1", "").is_complete());
        assert!(!Credentials::new("", "secret1", "http://x/").is_complete());
        assert!(!Credentials::new("alice", "", "http://x/").is_complete());
    }

    #[test]
    fn test_chrome_message_deserialization() {
        let msg: ChromeMessage = serde_json::from_str(r#"{"cmd":"press","x":10.5,"y":4}"#).unwrap();
        assert_eq!(msg, ChromeMessage::Press { x: 10.5, y: 4.0 });

        let msg: ChromeMessage = serde_json::from_str(r#"{"cmd":"toggle_fullscreen"}"#).unwrap();
        assert_eq!(msg, ChromeMessage::ToggleFullscreen);

        assert!(serde_json::from_str::<ChromeMessage>(r#"{"cmd":"reboot"}"#).is_err());
    }

    #[test]
    fn test_dialog_message_url_is_optional() {
        let msg: DialogMessage =
            serde_json::from_str(r#"{"cmd":"save","username":"a","password":"b"}"#).unwrap();
        assert_eq!(
            msg,
            DialogMessage::Save {
                username: "a".into(),
                password: "b".into(),
                url: String::new()
            }
        );
    }

    #[test]
    fn test_notice_level_serialization() {
        assert_eq!(serde_json::to_string(&NoticeLevel::Warning).unwrap(), r#""warning""#);
    }
}
