//! Delayed delivery of events back to the GUI event loop.
//!
//! Timers sleep on a small tokio runtime and then post their event through an
//! [`EventSink`]; all handling happens on the event-loop thread. A scheduled
//! event cannot be withdrawn, receivers decide on delivery whether it still
//! matters.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};

/// Somewhere a timer can deliver its event.
pub trait EventSink<T>: Clone + Send + 'static {
    /// Returns `false` when the receiving side has gone away.
    fn deliver(&self, event: T) -> bool;
}

impl<T: Send + 'static> EventSink<T> for tao::event_loop::EventLoopProxy<T> {
    fn deliver(&self, event: T) -> bool {
        self.send_event(event).is_ok()
    }
}

impl<T: Send + 'static> EventSink<T> for std::sync::mpsc::Sender<T> {
    fn deliver(&self, event: T) -> bool {
        self.send(event).is_ok()
    }
}

/// Fire-and-forget timers feeding one event sink.
pub struct Scheduler<T, S> {
    runtime: Runtime,
    sink: S,
    _event: std::marker::PhantomData<fn(T)>,
}

impl<T, S> Scheduler<T, S>
where
    T: Send + 'static,
    S: EventSink<T>,
{
    pub fn new(sink: S) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("kiosk-timer")
            .enable_time()
            .build()
            .context("Failed to create timer runtime")?;

        Ok(Self {
            runtime,
            sink,
            _event: std::marker::PhantomData,
        })
    }

    /// Deliver `event` after `delay`.
    pub fn schedule(&self, delay: Duration, event: T) {
        let sink = self.sink.clone();
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if !sink.deliver(event) {
                tracing::debug!("Event loop closed, dropping timer event");
            }
        });
    }
}
