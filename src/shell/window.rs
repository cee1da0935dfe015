//! The frameless tao window hosting the title bar and the page.

use anyhow::{Context, Result};
use std::cell::Cell;
use std::path::Path;
use tao::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use tao::event_loop::EventLoopWindowTarget;
use tao::monitor::MonitorHandle;
use tao::window::{Fullscreen, Icon, Window, WindowBuilder};

use super::drag::{Point, Rect, Size, WindowControl};
use crate::config::{KioskConfig, WINDOW_HEIGHT, WINDOW_WIDTH};

/// Main kiosk window plus the geometry bookkeeping tao does not provide.
pub struct ShellWindow {
    window: Window,
    normal_size: Cell<PhysicalSize<u32>>,
}

impl ShellWindow {
    pub fn build<T: 'static>(target: &EventLoopWindowTarget<T>, config: &KioskConfig) -> Result<Self> {
        let mut builder = WindowBuilder::new()
            .with_title(&config.title)
            .with_decorations(false)
            .with_inner_size(LogicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT));

        if let Some(path) = &config.icon {
            match load_icon(path) {
                Ok(icon) => builder = builder.with_window_icon(Some(icon)),
                Err(e) => tracing::warn!("Ignoring window icon: {:#}", e),
            }
        }

        let window = builder.build(target).context("Failed to create main window")?;
        let normal_size = Cell::new(window.outer_size());

        Ok(Self {
            window,
            normal_size,
        })
    }

    pub fn inner(&self) -> &Window {
        &self.window
    }

    /// Remember the restored size so a drag out of maximized can reuse it.
    pub fn on_resized(&self) {
        if !self.window.is_maximized() && !self.is_fullscreen() && !self.window.is_minimized() {
            self.normal_size.set(self.window.outer_size());
        }
    }

    pub fn minimize(&self) {
        self.window.set_minimized(true);
    }

    /// Returns the new fullscreen state.
    pub fn toggle_fullscreen(&self) -> bool {
        if self.is_fullscreen() {
            self.window.set_fullscreen(None);
            false
        } else {
            self.window.set_fullscreen(Some(Fullscreen::Borderless(None)));
            true
        }
    }

    /// Cursor in physical desktop coordinates. `fallback` is the position
    /// reported by the page in CSS pixels, used when the platform cannot
    /// query the pointer.
    pub fn cursor(&self, fallback: (f64, f64)) -> Point {
        match self.window.cursor_position() {
            Ok(pos) => Point::new(pos.x.round() as i32, pos.y.round() as i32),
            Err(_) => {
                let scale = self.window.scale_factor();
                Point::new(
                    (fallback.0 * scale).round() as i32,
                    (fallback.1 * scale).round() as i32,
                )
            }
        }
    }

    /// Title-bar height in physical pixels.
    pub fn physical_height(&self, logical: f64) -> u32 {
        (logical * self.window.scale_factor()).round() as u32
    }
}

impl WindowControl for ShellWindow {
    type Screen = MonitorHandle;

    fn is_maximized(&self) -> bool {
        self.window.is_maximized()
    }

    fn is_fullscreen(&self) -> bool {
        self.window.fullscreen().is_some()
    }

    fn set_maximized(&self, maximized: bool) {
        self.window.set_maximized(maximized);
    }

    fn outer_position(&self) -> Point {
        self.window
            .outer_position()
            .map(|p| Point::new(p.x, p.y))
            .unwrap_or_default()
    }

    fn set_outer_position(&self, position: Point) {
        self.window
            .set_outer_position(PhysicalPosition::new(position.x, position.y));
    }

    fn normal_size(&self) -> Size {
        let size = self.normal_size.get();
        Size {
            width: size.width,
            height: size.height,
        }
    }

    fn current_screen(&self) -> Option<MonitorHandle> {
        self.window.current_monitor()
    }

    fn screen_at(&self, point: Point) -> Option<MonitorHandle> {
        self.window
            .monitor_from_point(f64::from(point.x), f64::from(point.y))
    }

    // Full monitor rectangle: tao has no work-area query, so a taskbar can
    // overlap the clamped window.
    fn screen_bounds(&self, screen: &MonitorHandle) -> Rect {
        let origin = screen.position();
        let size = screen.size();
        Rect::new(origin.x, origin.y, size.width, size.height)
    }
}

/// Decode a PNG or ICO file into a window icon.
pub fn load_icon(path: &Path) -> Result<Icon> {
    let image = image::open(path)
        .with_context(|| format!("Failed to read icon {}", path.display()))?
        .into_rgba8();
    let (width, height) = image.dimensions();
    Icon::from_rgba(image.into_raw(), width, height)
        .with_context(|| format!("Invalid icon {}", path.display()))
}
