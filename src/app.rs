//! The kiosk application: owns every component and dispatches events from
//! the single tao event loop.
//!
//! Timers, webview callbacks and IPC messages are all funnelled back into the
//! loop as [`UserEvent`]s, so component state is only ever touched from the
//! loop thread.

use anyhow::Result;
use std::time::Instant;
use tao::event::{Event, StartCause, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy, EventLoopWindowTarget};
use tao::monitor::MonitorHandle;
use wry::WebContext;

use crate::autofill::{AttemptOutcome, AutofillSequencer, ScheduledAttempt};
use crate::config::{KioskConfig, DIALOG_CLOSE_DELAY, DOUBLE_CLICK_WINDOW, TITLE_BAR_HEIGHT};
use crate::credentials::CredentialStore;
use crate::models::{ChromeMessage, Credentials, DialogMessage, NoticeLevel};
use crate::scheduler::Scheduler;
use crate::shell::{
    split_layout, validate_form, CredentialsDialog, PageView, ShellWindow, TitleBar,
    TitleBarGestures, WebviewHost,
};

/// Events posted to the loop by timers, webviews and IPC handlers.
#[derive(Debug, Clone)]
pub enum UserEvent {
    Chrome(ChromeMessage),
    Dialog(DialogMessage),
    PageLoad { finished: bool, url: String },
    /// The page asked for a new window; load its URL in place instead.
    OpenInPlace(String),
    AutofillDue { generation: u64 },
    AutofillResult { generation: u64, filled: bool },
    CloseDialog { serial: u64 },
}

/// Start the GUI. Only returns on start-up failure.
pub fn run(config: KioskConfig, store: CredentialStore) -> Result<()> {
    config.engine.apply_environment();

    let event_loop = EventLoopBuilder::<UserEvent>::with_user_event().build();
    let proxy = event_loop.create_proxy();
    let mut app = KioskApp::new(&event_loop, config, store, proxy)?;

    event_loop.run(move |event, target, control_flow| {
        *control_flow = ControlFlow::Wait;
        app.handle(event, target, control_flow);
    })
}

/// What to do with a title-bar message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChromeRoute {
    Handle,
    FocusDialog,
    Ignore,
}

/// The credentials dialog is modal: while it is open the title bar only
/// brings it back to the front.
fn route_chrome(msg: &ChromeMessage, dialog_open: bool) -> ChromeRoute {
    if !dialog_open {
        return ChromeRoute::Handle;
    }
    match msg {
        ChromeMessage::Press { .. } | ChromeMessage::Credentials => ChromeRoute::FocusDialog,
        _ => ChromeRoute::Ignore,
    }
}

struct KioskApp {
    // Webviews are declared before the windows they live in so they drop first.
    dialog: Option<CredentialsDialog>,
    title_bar: TitleBar,
    page: PageView,
    _host: WebviewHost,
    window: ShellWindow,
    _web_context: WebContext,
    store: CredentialStore,
    gestures: TitleBarGestures<MonitorHandle>,
    autofill: AutofillSequencer,
    scheduler: Scheduler<UserEvent, EventLoopProxy<UserEvent>>,
    proxy: EventLoopProxy<UserEvent>,
    last_url: String,
    dialog_serial: u64,
}

impl KioskApp {
    fn new(
        target: &EventLoopWindowTarget<UserEvent>,
        config: KioskConfig,
        store: CredentialStore,
        proxy: EventLoopProxy<UserEvent>,
    ) -> Result<Self> {
        let window = ShellWindow::build(target, &config)?;
        let host = WebviewHost::new(window.inner())?;

        let size = window.inner().inner_size().to_logical::<f64>(window.inner().scale_factor());
        let (bar_bounds, page_bounds) = split_layout(size.width, size.height, TITLE_BAR_HEIGHT);

        let mut web_context = WebContext::new(Some(config.data_dir.clone()));
        let title_bar = TitleBar::build(&host, window.inner(), &config.title, &proxy, bar_bounds)?;
        let page = PageView::build(
            &host,
            window.inner(),
            &mut web_context,
            &config,
            &proxy,
            page_bounds,
        )?;

        let scheduler = Scheduler::new(proxy.clone())?;
        let autofill = AutofillSequencer::new(config.autofill.clone());
        tracing::info!(
            "Auto-fill armed for {} ({} attempts)",
            autofill.settings().trigger_url,
            autofill.settings().max_attempts
        );

        Ok(Self {
            dialog: None,
            title_bar,
            page,
            _host: host,
            window,
            _web_context: web_context,
            last_url: config.start_url().to_string(),
            store,
            gestures: TitleBarGestures::new(DOUBLE_CLICK_WINDOW),
            autofill,
            scheduler,
            proxy,
            dialog_serial: 0,
        })
    }

    fn handle(
        &mut self,
        event: Event<'_, UserEvent>,
        target: &EventLoopWindowTarget<UserEvent>,
        control_flow: &mut ControlFlow,
    ) {
        match event {
            Event::NewEvents(StartCause::Init) => {
                self.gestures.on_first_show(&self.window);
            }
            Event::WindowEvent {
                window_id, event, ..
            } => {
                if window_id == self.window.inner().id() {
                    match event {
                        WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                            self.window.on_resized();
                            self.layout();
                        }
                        WindowEvent::CloseRequested => {
                            tracing::info!("Main window closed");
                            *control_flow = ControlFlow::Exit;
                        }
                        _ => {}
                    }
                } else if matches!(event, WindowEvent::CloseRequested)
                    && self.dialog.as_ref().is_some_and(|d| d.window_id() == window_id)
                {
                    self.dialog = None;
                }
            }
            Event::UserEvent(event) => self.handle_user_event(event, target, control_flow),
            _ => {}
        }
    }

    fn handle_user_event(
        &mut self,
        event: UserEvent,
        target: &EventLoopWindowTarget<UserEvent>,
        control_flow: &mut ControlFlow,
    ) {
        match event {
            UserEvent::Chrome(msg) => self.handle_chrome(msg, target, control_flow),
            UserEvent::Dialog(msg) => self.handle_dialog(msg),
            UserEvent::PageLoad { finished, url } => {
                if let Some(attempt) = self.autofill.on_page_load(finished, &url) {
                    self.schedule_attempt(attempt);
                }
                self.last_url = url;
            }
            UserEvent::OpenInPlace(url) => self.page.load(&url),
            UserEvent::AutofillDue { generation } => self.run_autofill(generation),
            UserEvent::AutofillResult { generation, filled } => {
                self.on_autofill_result(generation, filled)
            }
            UserEvent::CloseDialog { serial } => {
                if self.dialog.as_ref().is_some_and(|d| d.serial() == serial) {
                    self.dialog = None;
                }
            }
        }
    }

    fn handle_chrome(
        &mut self,
        msg: ChromeMessage,
        target: &EventLoopWindowTarget<UserEvent>,
        control_flow: &mut ControlFlow,
    ) {
        match route_chrome(&msg, self.dialog.is_some()) {
            ChromeRoute::Handle => {}
            ChromeRoute::FocusDialog => {
                if let Some(dialog) = &self.dialog {
                    dialog.focus();
                }
                return;
            }
            ChromeRoute::Ignore => return,
        }

        match msg {
            ChromeMessage::Press { x, y } => {
                let cursor = self.window.cursor((x, y));
                let bar_height = self.window.physical_height(TITLE_BAR_HEIGHT);
                let outcome = self
                    .gestures
                    .press(&self.window, Instant::now(), cursor, bar_height);
                tracing::trace!("Title bar press at {:?}: {:?}", cursor, outcome);
            }
            ChromeMessage::Move { x, y } => {
                let cursor = self.window.cursor((x, y));
                self.gestures.drag_to(&self.window, cursor);
            }
            ChromeMessage::Release => self.gestures.release(&self.window),
            ChromeMessage::Close => {
                tracing::info!("Close requested from title bar");
                *control_flow = ControlFlow::Exit;
            }
            ChromeMessage::Minimize => self.window.minimize(),
            ChromeMessage::ToggleFullscreen => {
                let fullscreen = self.window.toggle_fullscreen();
                self.title_bar.show_fullscreen(fullscreen);
            }
            ChromeMessage::Credentials => self.open_dialog(target),
        }
    }

    fn open_dialog(&mut self, target: &EventLoopWindowTarget<UserEvent>) {
        if let Some(dialog) = &self.dialog {
            dialog.focus();
            return;
        }

        let initial = self.store.load().unwrap_or_else(|| {
            Credentials::new("", "", self.store.load_url().unwrap_or_default())
        });

        self.dialog_serial += 1;
        match CredentialsDialog::open(
            target,
            self.window.inner(),
            &self.proxy,
            self.dialog_serial,
            &initial,
        ) {
            Ok(dialog) => self.dialog = Some(dialog),
            Err(e) => tracing::error!("{:#}", e),
        }
    }

    fn handle_dialog(&mut self, msg: DialogMessage) {
        let Some(dialog) = &self.dialog else {
            return;
        };

        match msg {
            DialogMessage::Save {
                username,
                password,
                url,
            } => {
                let Some(credentials) = validate_form(&username, &password, &url) else {
                    dialog.notify(
                        NoticeLevel::Warning,
                        "Please fill in both username and password.",
                    );
                    return;
                };

                if self.store.save(&credentials) {
                    dialog.notify(NoticeLevel::Success, "Credentials saved successfully.");
                    self.scheduler.schedule(
                        DIALOG_CLOSE_DELAY,
                        UserEvent::CloseDialog {
                            serial: dialog.serial(),
                        },
                    );
                } else {
                    dialog.notify(
                        NoticeLevel::Error,
                        "Could not save the credentials. Check the file permissions.",
                    );
                }
            }
            DialogMessage::Cancel => self.dialog = None,
        }
    }

    fn schedule_attempt(&self, attempt: ScheduledAttempt) {
        self.scheduler.schedule(
            attempt.delay,
            UserEvent::AutofillDue {
                generation: attempt.generation,
            },
        );
    }

    fn run_autofill(&mut self, generation: u64) {
        let url = self.page.url().unwrap_or_else(|| self.last_url.clone());
        let store = &self.store;
        let Some(injection) = self
            .autofill
            .on_attempt_due(generation, &url, || store.load())
        else {
            return;
        };

        let generation = injection.generation;
        let proxy = self.proxy.clone();
        let result = self.page.run_script(&injection.script, move |filled| {
            let _ = proxy.send_event(UserEvent::AutofillResult { generation, filled });
        });

        if let Err(e) = result {
            tracing::warn!("{:#}", e);
            self.on_autofill_result(generation, false);
        }
    }

    fn on_autofill_result(&mut self, generation: u64, filled: bool) {
        if let AttemptOutcome::Retry(attempt) = self.autofill.on_result(generation, filled) {
            self.schedule_attempt(attempt);
        }
    }

    fn layout(&self) {
        let window = self.window.inner();
        let size = window.inner_size().to_logical::<f64>(window.scale_factor());
        let (bar, page) = split_layout(size.width, size.height, TITLE_BAR_HEIGHT);

        if let Err(e) = self.title_bar.set_bounds(bar) {
            tracing::warn!("{:#}", e);
        }
        if let Err(e) = self.page.set_bounds(page) {
            tracing::warn!("{:#}", e);
        }
    }
}
