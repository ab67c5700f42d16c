//! Periodic background refresh
//!
//! A [`Refresher`] owns one thread that wakes every `interval`, asks the
//! source whether the document changed, and if so rebuilds and publishes a
//! new graph. Cycles run with a fixed delay after the previous one finished,
//! so they never overlap. A failing cycle is logged and the last good graph
//! stays published.

use crate::error::{Error, Result};
use crate::query::GraphService;
use crate::shared::GraphSummary;
use crate::source::SnapshotSource;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Options for background refresh
#[derive(Debug, Clone)]
pub struct RefreshOptions {
    /// Delay between the end of one cycle and the start of the next
    /// (default: 30 seconds)
    pub interval: Duration,
    /// Skip the rebuild when the source reports no newer modification time
    pub skip_unchanged: bool,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            skip_unchanged: true,
        }
    }
}

/// What one refresh cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Reloaded(GraphSummary),
    Unchanged,
}

/// Run a single refresh cycle in the calling thread
pub fn refresh_once<S: SnapshotSource>(
    service: &GraphService<S>,
    options: &RefreshOptions,
) -> Result<RefreshOutcome> {
    if options.skip_unchanged {
        if let Some(previous) = service.snapshot().source_modified {
            let modified = service.last_modified()?;
            if modified <= previous {
                return Ok(RefreshOutcome::Unchanged);
            }
            tracing::debug!(%previous, %modified, "document changed");
        }
    }
    service.reload().map(RefreshOutcome::Reloaded)
}

type ReloadCallback = Box<dyn Fn(&GraphSummary) + Send + 'static>;

/// Configures and starts a background refresh thread
pub struct Refresher<S> {
    service: Arc<GraphService<S>>,
    options: RefreshOptions,
    on_reload: Option<ReloadCallback>,
}

impl<S: SnapshotSource + 'static> Refresher<S> {
    pub fn new(service: Arc<GraphService<S>>, options: RefreshOptions) -> Self {
        Self {
            service,
            options,
            on_reload: None,
        }
    }

    /// Start refreshing with no reload callback
    pub fn spawn(service: Arc<GraphService<S>>, options: RefreshOptions) -> Result<RefreshHandle> {
        Self::new(service, options).start()
    }

    /// Call `callback` after every cycle that published a new graph
    pub fn on_reload(mut self, callback: impl Fn(&GraphSummary) + Send + 'static) -> Self {
        self.on_reload = Some(Box::new(callback));
        self
    }

    pub fn start(self) -> Result<RefreshHandle> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let Refresher {
            service,
            options,
            on_reload,
        } = self;

        tracing::info!(
            document = service.document_id(),
            interval_ms = options.interval.as_millis() as u64,
            "starting background refresh"
        );

        let thread = thread::Builder::new()
            .name("cellgraph-refresh".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(options.interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }

                match refresh_once(&service, &options) {
                    Ok(RefreshOutcome::Reloaded(summary)) => {
                        tracing::info!(%summary, "refresh cycle reloaded graph");
                        if let Some(callback) = &on_reload {
                            callback(&summary);
                        }
                    }
                    Ok(RefreshOutcome::Unchanged) => {
                        tracing::debug!("refresh cycle found no changes");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "refresh cycle failed, keeping previous graph");
                    }
                }
            })
            .map_err(|e| Error::Refresh(format!("could not spawn refresh thread: {e}")))?;

        Ok(RefreshHandle {
            stop: Some(stop_tx),
            thread: Some(thread),
        })
    }
}

/// Running refresh thread; stops it when dropped
pub struct RefreshHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Signal the thread and wait for the current cycle to finish
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().map_or(false, |t| !t.is_finished())
    }

    fn shutdown(&mut self) -> Result<()> {
        if let Some(stop) = self.stop.take() {
            // a full or disconnected channel means the thread is already stopping
            let _ = stop.try_send(());
        }
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| Error::Refresh("refresh thread panicked".into())),
            None => Ok(()),
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!(error = %e, "refresh thread did not stop cleanly");
        }
    }
}
