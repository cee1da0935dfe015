//! The page view: one embedded webview showing the kiosk site.

use anyhow::{Context, Result};
use tao::event_loop::EventLoopProxy;
use tao::window::Window;
use wry::{NewWindowResponse, PageLoadEvent, WebContext, WebView, WebViewBuilder};

#[cfg(target_os = "windows")]
use wry::WebViewBuilderExtWindows;

use super::{Bounds, WebviewHost};
use crate::app::UserEvent;
use crate::autofill::parse_script_result;
use crate::config::KioskConfig;

/// Kiosk pages get no browser context menu.
const DISABLE_CONTEXT_MENU: &str =
    "window.addEventListener('contextmenu', (e) => e.preventDefault(), true);";

/// Webview showing the remote site.
pub struct PageView {
    webview: WebView,
}

impl PageView {
    pub fn build(
        host: &WebviewHost,
        window: &Window,
        web_context: &mut WebContext,
        config: &KioskConfig,
        proxy: &EventLoopProxy<UserEvent>,
        bounds: Bounds,
    ) -> Result<Self> {
        let load_proxy = proxy.clone();
        let popup_proxy = proxy.clone();

        #[allow(unused_mut)]
        let mut builder = WebViewBuilder::new_with_web_context(web_context)
            .with_url(config.start_url())
            .with_user_agent(&config.user_agent)
            .with_devtools(config.devtools)
            .with_autoplay(true)
            .with_incognito(true)
            .with_bounds(bounds.into())
            .with_initialization_script(DISABLE_CONTEXT_MENU)
            .with_on_page_load_handler(move |event, url| {
                let finished = matches!(event, PageLoadEvent::Finished);
                tracing::debug!("Page load (finished: {}): {}", finished, url);
                let _ = load_proxy.send_event(UserEvent::PageLoad { finished, url });
            })
            // Pop-ups and target=_blank links stay in this view.
            .with_new_window_req_handler(move |url, _features| {
                let _ = popup_proxy.send_event(UserEvent::OpenInPlace(url));
                NewWindowResponse::Deny
            });

        #[cfg(target_os = "windows")]
        if let Some(args) = &config.engine.browser_args {
            builder = builder.with_additional_browser_args(args);
        }

        let webview = host.attach(window, builder)?;
        tracing::info!("Opening {}", config.start_url());

        Ok(Self { webview })
    }

    pub fn load(&self, url: &str) {
        tracing::info!("Navigating to {}", url);
        if let Err(e) = self.webview.load_url(url) {
            tracing::warn!("Failed to load {}: {}", url, e);
        }
    }

    /// Address currently shown, if the webview can report it.
    pub fn url(&self) -> Option<String> {
        self.webview.url().ok()
    }

    /// Evaluate `script` and hand its boolean result to `on_result` once the
    /// page answers.
    pub fn run_script<F>(&self, script: &str, on_result: F) -> Result<()>
    where
        F: Fn(bool) + Send + 'static,
    {
        self.webview
            .evaluate_script_with_callback(script, move |raw| {
                on_result(parse_script_result(&raw))
            })
            .context("Failed to evaluate script in page")
    }

    pub fn set_bounds(&self, bounds: Bounds) -> Result<()> {
        self.webview
            .set_bounds(bounds.into())
            .context("Failed to resize page view")
    }
}
