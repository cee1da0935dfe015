//! Window shell: frameless window, custom title bar, page view and the
//! credentials dialog.

mod browser;
mod chrome;
mod dialog;
mod drag;
mod window;

pub use browser::PageView;
pub use chrome::TitleBar;
pub use dialog::{validate_form, CredentialsDialog};
pub use drag::TitleBarGestures;
pub use window::ShellWindow;

use anyhow::{Context, Result};
use tao::window::Window;
use wry::dpi::{LogicalPosition, LogicalSize};
use wry::{WebView, WebViewBuilder};

/// Logical-pixel rectangle for a child webview.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl From<Bounds> for wry::Rect {
    fn from(b: Bounds) -> Self {
        wry::Rect {
            position: LogicalPosition::new(b.x, b.y).into(),
            size: LogicalSize::new(b.width, b.height).into(),
        }
    }
}

/// Split a window's client area into the title bar strip and the page below it.
pub fn split_layout(width: f64, height: f64, title_bar_height: f64) -> (Bounds, Bounds) {
    let bar_height = title_bar_height.min(height).max(0.0);
    let bar = Bounds {
        x: 0.0,
        y: 0.0,
        width,
        height: bar_height,
    };
    let page = Bounds {
        x: 0.0,
        y: bar_height,
        width,
        height: (height - bar_height).max(0.0),
    };
    (bar, page)
}

/// Container that lets several webviews share one window at fixed bounds.
pub struct WebviewHost {
    #[cfg(target_os = "linux")]
    fixed: gtk::Fixed,
}

impl WebviewHost {
    #[cfg(target_os = "linux")]
    pub fn new(window: &Window) -> Result<Self> {
        use gtk::prelude::*;
        use tao::platform::unix::WindowExtUnix;

        let vbox = window
            .default_vbox()
            .context("Main window has no GTK container")?;
        let fixed = gtk::Fixed::new();
        vbox.pack_start(&fixed, true, true, 0);
        fixed.show_all();
        Ok(Self { fixed })
    }

    #[cfg(not(target_os = "linux"))]
    pub fn new(_window: &Window) -> Result<Self> {
        Ok(Self {})
    }

    #[cfg(target_os = "linux")]
    pub fn attach(&self, _window: &Window, builder: WebViewBuilder<'_>) -> Result<WebView> {
        use wry::WebViewBuilderExtUnix;
        builder
            .build_gtk(&self.fixed)
            .context("Failed to create webview")
    }

    #[cfg(not(target_os = "linux"))]
    pub fn attach(&self, window: &Window, builder: WebViewBuilder<'_>) -> Result<WebView> {
        builder
            .build_as_child(window)
            .context("Failed to create webview")
    }
}

/// Build a webview that fills `window` on its own.
pub fn attach_filling(window: &Window, builder: WebViewBuilder<'_>) -> Result<WebView> {
    #[cfg(target_os = "linux")]
    let webview = {
        use tao::platform::unix::WindowExtUnix;
        use wry::WebViewBuilderExtUnix;
        let vbox = window
            .default_vbox()
            .context("Window has no GTK container")?;
        builder.build_gtk(vbox)
    };

    #[cfg(not(target_os = "linux"))]
    let webview = builder.build(window);

    webview.context("Failed to create webview")
}

/// Escape text for use inside HTML element content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serialize `value` as JSON that is safe to embed inside a `<script>` block.
pub fn script_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace('<', "\\u003c")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}
