//! Credentials management dialog.
//!
//! A small decorated window with a three-field form, owned by the main window
//! and modal over it. The page posts [`DialogMessage`]s; the app answers with
//! notices via [`CredentialsDialog::notify`].

use anyhow::{Context, Result};
use serde_json::json;
use tao::dpi::LogicalSize;
use tao::event_loop::{EventLoopProxy, EventLoopWindowTarget};
use tao::window::{Window, WindowBuilder, WindowId};
use wry::{WebView, WebViewBuilder};

use super::{attach_filling, script_json};
use crate::app::UserEvent;
use crate::config::{DIALOG_HEIGHT, DIALOG_WIDTH};
use crate::models::{Credentials, DialogMessage, NoticeLevel};

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
  body { font-family: sans-serif; font-size: 13px; margin: 16px; }
  label { display: block; margin-top: 10px; }
  input { width: 100%; box-sizing: border-box; padding: 4px; margin-top: 4px; }
  #save {
    margin-top: 16px; width: 100%; padding: 8px; border: none; border-radius: 4px;
    background-color: #4CAF50; color: white; cursor: pointer;
  }
  #save:hover { background-color: #45a049; }
  #notice { margin-top: 10px; min-height: 1.2em; }
  #notice.success { color: #2e7d32; }
  #notice.warning { color: #b26a00; }
  #notice.error { color: #c62828; }
</style>
</head>
<body>
<form id="form" autocomplete="off">
  <div>Enter your access credentials:</div>
  <label>Username:<input id="username" placeholder="Enter your username"></label>
  <label>Password:<input id="password" type="password" placeholder="Enter your password"></label>
  <label>URL:<input id="url" placeholder="Enter the URL"></label>
  <button id="save" type="submit">Save Credentials</button>
  <div id="notice"></div>
</form>
<script>
(() => {
  const initial = {{INITIAL}};
  const field = (id) => document.getElementById(id);
  field('username').value = initial.username;
  field('password').value = initial.password;
  field('url').value = initial.url;

  field('form').addEventListener('submit', (e) => {
    e.preventDefault();
    window.ipc.postMessage(JSON.stringify({
      cmd: 'save',
      username: field('username').value,
      password: field('password').value,
      url: field('url').value,
    }));
  });
  document.addEventListener('keydown', (e) => {
    if (e.key === 'Escape') window.ipc.postMessage(JSON.stringify({ cmd: 'cancel' }));
  });

  window.showNotice = (level, text) => {
    const notice = field('notice');
    notice.className = level;
    notice.textContent = text;
  };
})();
</script>
</body>
</html>
"#;

/// Trim the submitted fields; `None` unless username and password are both present.
pub fn validate_form(username: &str, password: &str, url: &str) -> Option<Credentials> {
    let credentials = Credentials::new(username.trim(), password.trim(), url.trim());
    credentials.is_complete().then_some(credentials)
}

/// Form markup pre-filled with `initial`.
pub fn render(initial: &Credentials) -> String {
    let values = json!({
        "username": initial.username,
        "password": initial.password,
        "url": initial.url,
    });
    TEMPLATE.replace("{{INITIAL}}", &script_json(&values))
}

/// Keep the dialog above its parent (and only its parent).
#[cfg(target_os = "linux")]
fn owned_by(builder: WindowBuilder, parent: &Window) -> WindowBuilder {
    use tao::platform::unix::{WindowBuilderExtUnix, WindowExtUnix};
    builder.with_transient_for(parent.gtk_window())
}

#[cfg(target_os = "windows")]
fn owned_by(builder: WindowBuilder, parent: &Window) -> WindowBuilder {
    use tao::platform::windows::{WindowBuilderExtWindows, WindowExtWindows};
    builder.with_owner_window(parent.hwnd() as _)
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
fn owned_by(builder: WindowBuilder, _parent: &Window) -> WindowBuilder {
    builder
}

/// Block input to the parent while the dialog is up.
#[cfg(target_os = "linux")]
fn make_modal(window: &Window) {
    use gtk::prelude::GtkWindowExt;
    use tao::platform::unix::WindowExtUnix;
    window.gtk_window().set_modal(true);
}

#[cfg(not(target_os = "linux"))]
fn make_modal(_window: &Window) {}

/// An open credentials dialog.
pub struct CredentialsDialog {
    webview: WebView,
    window: Window,
    serial: u64,
}

impl CredentialsDialog {
    pub fn open(
        target: &EventLoopWindowTarget<UserEvent>,
        parent: &Window,
        proxy: &EventLoopProxy<UserEvent>,
        serial: u64,
        initial: &Credentials,
    ) -> Result<Self> {
        let builder = WindowBuilder::new()
            .with_title("Manage Credentials")
            .with_inner_size(LogicalSize::new(DIALOG_WIDTH, DIALOG_HEIGHT))
            .with_resizable(false);

        let window = owned_by(builder, parent)
            .build(target)
            .context("Failed to create credentials dialog")?;
        make_modal(&window);

        let proxy = proxy.clone();
        let builder = WebViewBuilder::new()
            .with_html(render(initial))
            .with_ipc_handler(move |req| {
                match serde_json::from_str::<DialogMessage>(req.body()) {
                    Ok(msg) => {
                        let _ = proxy.send_event(UserEvent::Dialog(msg));
                    }
                    Err(e) => tracing::warn!("Ignoring dialog message: {}", e),
                }
            });

        let webview = attach_filling(&window, builder)?;
        tracing::debug!("Credentials dialog opened");

        Ok(Self {
            webview,
            window,
            serial,
        })
    }

    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn focus(&self) {
        self.window.set_focus();
    }

    /// Show an acknowledgement line under the form.
    pub fn notify(&self, level: NoticeLevel, text: &str) {
        let script = format!(
            "window.showNotice({}, {});",
            script_json(&level),
            script_json(text)
        );
        if let Err(e) = self.webview.evaluate_script(&script) {
            tracing::warn!("Failed to update credentials dialog: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_form_trims() {
        assert_eq!(
            validate_form("  alice ", "secret1\t", " http://10.0.10.27/ "),
            Some(Credentials::new("alice", "secret1", "http://10.0.10.27/"))
        );
    }

    #[test]
    fn test_validate_form_requires_both_fields() {
        assert_eq!(validate_form("alice", "   ", "http://x/"), None);
        assert_eq!(validate_form("", "secret1", ""), None);
        assert!(validate_form("alice", "secret1", "").is_some());
    }

    #[test]
    fn test_render_prefills_form() {
        let html = render(&Credentials::new("alice", "s3</script>", "http://x/"));
        assert!(html.contains(r#""username":"alice""#));
        assert!(html.contains(r#""url":"http://x/""#));
        assert!(!html.contains("s3</script>"));
        assert!(!html.contains("{{INITIAL}}"));
    }
}
