//! Custom title bar rendered in its own small webview.
//!
//! Pointer gestures and button clicks are forwarded to Rust as
//! [`ChromeMessage`]s over `window.ipc`.

use anyhow::{Context, Result};
use tao::event_loop::EventLoopProxy;
use tao::window::Window;
use wry::{WebView, WebViewBuilder};

use super::{escape_html, Bounds, WebviewHost};
use crate::app::UserEvent;
use crate::models::ChromeMessage;

const FULLSCREEN_GLYPH: &str = "\u{25A1}";
const RESTORE_GLYPH: &str = "\u{1F5D7}";

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
  html, body { margin: 0; height: 100%; overflow: hidden; user-select: none; }
  #bar {
    display: flex; align-items: center; gap: 8px; height: 100%;
    padding: 0 10px; box-sizing: border-box;
    background-color: #222; color: white;
    font-family: sans-serif; cursor: default;
  }
  #title { font-weight: bold; font-size: 11px; flex: 1; white-space: nowrap; overflow: hidden; }
  button {
    background-color: #444; border: none; color: white; font-weight: bold;
    min-width: 24px; min-height: 24px; border-radius: 3px; cursor: pointer;
  }
  button:hover { background-color: #666; }
  button:active { background-color: #888; }
  #credentials { font-size: 10px; padding: 0 8px; }
  #close { background-color: #e81123; }
</style>
</head>
<body>
<div id="bar">
  <span id="title">{{TITLE}}</span>
  <button id="credentials" data-cmd="credentials">&#x1F511; Credentials</button>
  <button id="fullscreen" data-cmd="toggle_fullscreen">{{FULLSCREEN_GLYPH}}</button>
  <button id="minimize" data-cmd="minimize">&#x2014;</button>
  <button id="close" data-cmd="close">&#x2715;</button>
</div>
<script>
(() => {
  const post = (msg) => window.ipc.postMessage(JSON.stringify(msg));
  const bar = document.getElementById('bar');

  bar.addEventListener('pointerdown', (e) => {
    if (e.button !== 0 || e.target.closest('button')) return;
    bar.setPointerCapture(e.pointerId);
    post({ cmd: 'press', x: e.screenX, y: e.screenY });
  });
  bar.addEventListener('pointermove', (e) => {
    if (bar.hasPointerCapture(e.pointerId)) {
      post({ cmd: 'move', x: e.screenX, y: e.screenY });
    }
  });
  const finish = (e) => {
    if (!bar.hasPointerCapture(e.pointerId)) return;
    bar.releasePointerCapture(e.pointerId);
    post({ cmd: 'release' });
  };
  bar.addEventListener('pointerup', finish);
  bar.addEventListener('pointercancel', finish);

  document.querySelectorAll('button[data-cmd]').forEach((button) => {
    button.addEventListener('click', () => post({ cmd: button.dataset.cmd }));
  });
  window.addEventListener('contextmenu', (e) => e.preventDefault());

  window.setFullscreenGlyph = (fullscreen) => {
    document.getElementById('fullscreen').textContent =
      fullscreen ? '{{RESTORE_GLYPH}}' : '{{FULLSCREEN_GLYPH}}';
  };
})();
</script>
</body>
</html>
"#;

/// Title bar markup with `title` filled in.
pub fn render(title: &str) -> String {
    TEMPLATE
        .replace("{{TITLE}}", &escape_html(title))
        .replace("{{FULLSCREEN_GLYPH}}", FULLSCREEN_GLYPH)
        .replace("{{RESTORE_GLYPH}}", RESTORE_GLYPH)
}

/// Decode one IPC message from the title bar.
pub fn parse_message(body: &str) -> Option<ChromeMessage> {
    match serde_json::from_str(body) {
        Ok(msg) => Some(msg),
        Err(e) => {
            tracing::warn!("Ignoring title bar message {:?}: {}", body, e);
            None
        }
    }
}

/// The title bar strip across the top of the main window.
pub struct TitleBar {
    webview: WebView,
}

impl TitleBar {
    pub fn build(
        host: &WebviewHost,
        window: &Window,
        title: &str,
        proxy: &EventLoopProxy<UserEvent>,
        bounds: Bounds,
    ) -> Result<Self> {
        let proxy = proxy.clone();
        let builder = WebViewBuilder::new()
            .with_html(render(title))
            .with_bounds(bounds.into())
            .with_ipc_handler(move |req| {
                if let Some(msg) = parse_message(req.body()) {
                    let _ = proxy.send_event(UserEvent::Chrome(msg));
                }
            });

        let webview = host.attach(window, builder)?;
        Ok(Self { webview })
    }

    /// Swap the fullscreen button glyph.
    pub fn show_fullscreen(&self, fullscreen: bool) {
        let script = format!("window.setFullscreenGlyph({});", fullscreen);
        if let Err(e) = self.webview.evaluate_script(&script) {
            tracing::warn!("Failed to update title bar: {}", e);
        }
    }

    pub fn set_bounds(&self, bounds: Bounds) -> Result<()> {
        self.webview
            .set_bounds(bounds.into())
            .context("Failed to resize title bar")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_escapes_title() {
        let html = render("Kiosk <Admin>");
        assert!(html.contains(r#"<span id="title">Kiosk &lt;Admin&gt;</span>"#));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_render_wires_every_command() {
        let html = render("Kiosk");
        for cmd in ["credentials", "toggle_fullscreen", "minimize", "close"] {
            assert!(html.contains(&format!(r#"data-cmd="{}""#, cmd)), "missing {}", cmd);
            let msg = format!(r#"{{"cmd":"{}"}}"#, cmd);
            assert!(parse_message(&msg).is_some(), "unparseable {}", cmd);
        }
    }

    #[test]
    fn test_parse_pointer_messages() {
        assert_eq!(
            parse_message(r#"{"cmd":"move","x":1500,"y":12.5}"#),
            Some(ChromeMessage::Move { x: 1500.0, y: 12.5 })
        );
        assert_eq!(parse_message(r#"{"cmd":"release"}"#), Some(ChromeMessage::Release));
        assert_eq!(parse_message("not json"), None);
        assert_eq!(parse_message(r#"{"cmd":"press"}"#), None);
    }
}
