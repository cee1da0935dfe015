//! Title-bar gestures for a frameless window: double-click to maximize,
//! drag to move, and restore-from-maximized while dragging.
//!
//! All coordinates are physical desktop pixels. The window itself is reached
//! through [`WindowControl`] so the gesture logic stays independent of tao.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size { width, height },
        }
    }

    pub fn right(&self) -> i32 {
        self.origin.x.saturating_add(self.size.width as i32)
    }

    pub fn bottom(&self) -> i32 {
        self.origin.y.saturating_add(self.size.height as i32)
    }

    #[cfg(test)]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.origin.x && p.x < self.right() && p.y >= self.origin.y && p.y < self.bottom()
    }
}

/// The window operations the gestures need.
pub trait WindowControl {
    /// Identifies a monitor.
    type Screen: Clone + PartialEq;

    fn is_maximized(&self) -> bool;
    fn is_fullscreen(&self) -> bool;
    fn set_maximized(&self, maximized: bool);
    fn outer_position(&self) -> Point;
    fn set_outer_position(&self, position: Point);
    /// Outer size the window has when neither maximized nor fullscreen.
    fn normal_size(&self) -> Size;
    fn current_screen(&self) -> Option<Self::Screen>;
    fn screen_at(&self, point: Point) -> Option<Self::Screen>;
    fn screen_bounds(&self, screen: &Self::Screen) -> Rect;
}

/// Pairs presses that land within `window` of each other.
#[derive(Debug, Clone)]
pub struct ClickTracker {
    window: Duration,
    last_press: Option<Instant>,
}

impl ClickTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_press: None,
        }
    }

    /// Record a press; `true` when it completes a double-click. A completed
    /// double-click resets the tracker so a third press starts over.
    pub fn register(&mut self, now: Instant) -> bool {
        match self.last_press {
            Some(previous) if now.saturating_duration_since(previous) < self.window => {
                self.last_press = None;
                true
            }
            _ => {
                self.last_press = Some(now);
                false
            }
        }
    }
}

#[derive(Debug, Clone)]
struct DragState {
    start_cursor: Point,
    start_window: Point,
    was_maximized: bool,
}

/// What a title-bar press did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    ToggledMaximize,
    DragStarted,
}

/// Gesture state for one title bar.
#[derive(Debug)]
pub struct TitleBarGestures<S> {
    clicks: ClickTracker,
    drag: Option<DragState>,
    current_screen: Option<S>,
    shown: bool,
}

impl<S: Clone + PartialEq> TitleBarGestures<S> {
    pub fn new(double_click_window: Duration) -> Self {
        Self {
            clicks: ClickTracker::new(double_click_window),
            drag: None,
            current_screen: None,
            shown: false,
        }
    }

    #[cfg(test)]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    #[cfg(test)]
    pub fn current_screen(&self) -> Option<&S> {
        self.current_screen.as_ref()
    }

    /// Maximize on the creation screen, the first time only.
    pub fn on_first_show<W>(&mut self, window: &W)
    where
        W: WindowControl<Screen = S>,
    {
        if self.shown {
            return;
        }
        self.shown = true;
        self.current_screen = window.current_screen();
        window.set_maximized(true);
    }

    /// Primary-button press inside the title bar at `cursor`.
    pub fn press<W>(
        &mut self,
        window: &W,
        now: Instant,
        cursor: Point,
        title_bar_height: u32,
    ) -> PressOutcome
    where
        W: WindowControl<Screen = S>,
    {
        if self.clicks.register(now) {
            self.drag = None;
            window.set_maximized(!window.is_maximized());
            return PressOutcome::ToggledMaximize;
        }

        let was_maximized = window.is_maximized();
        let start_window = if was_maximized {
            window.set_maximized(false);
            let position = restored_position(window, cursor, title_bar_height);
            window.set_outer_position(position);
            position
        } else {
            window.outer_position()
        };

        self.drag = Some(DragState {
            start_cursor: cursor,
            start_window,
            was_maximized,
        });
        PressOutcome::DragStarted
    }

    /// Pointer moved while the button is held.
    pub fn drag_to<W>(&mut self, window: &W, cursor: Point)
    where
        W: WindowControl<Screen = S>,
    {
        let Some(drag) = self.drag.as_mut() else {
            return;
        };

        if let Some(screen) = window.screen_at(cursor) {
            if self.current_screen.as_ref() != Some(&screen) {
                tracing::debug!("Drag crossed onto another screen");
                self.current_screen = Some(screen);
                drag.was_maximized = false;
            }
        }

        if window.is_maximized() || window.is_fullscreen() {
            return;
        }

        window.set_outer_position(Point::new(
            drag.start_window.x + (cursor.x - drag.start_cursor.x),
            drag.start_window.y + (cursor.y - drag.start_cursor.y),
        ));
    }

    /// Button released: end the drag, re-maximizing a window that was
    /// restored by this gesture.
    pub fn release<W>(&mut self, window: &W)
    where
        W: WindowControl<Screen = S>,
    {
        if let Some(drag) = self.drag.take() {
            if drag.was_maximized {
                window.set_maximized(true);
            }
        }
    }
}

/// Where to put a window just restored from maximized so the cursor lands
/// mid-width, half a title bar down, without leaving the screen.
fn restored_position<W: WindowControl>(window: &W, cursor: Point, title_bar_height: u32) -> Point {
    let size = window.normal_size();
    let x = cursor.x - (size.width / 2) as i32;
    let y = cursor.y - (title_bar_height / 2) as i32;

    let Some(bounds) = window
        .current_screen()
        .or_else(|| window.screen_at(cursor))
        .map(|screen| window.screen_bounds(&screen))
    else {
        return Point::new(x, y);
    };

    Point::new(
        x.min(bounds.right() - size.width as i32).max(bounds.origin.x),
        y.min(bounds.bottom() - size.height as i32).max(bounds.origin.y),
    )
}
