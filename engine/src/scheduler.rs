//! Render trigger scheduling.
//!
//! Two producers request renders: file-change events from the watcher and a
//! periodic tick. Each request runs on its own task. A FIFO async mutex
//! serializes the render body, so a request that arrives while another render
//! is running waits for it instead of being dropped or merged.
//!
//! File-change events pass a [`Debounce`] gate first. The gate is checked on
//! the event loop without touching the render lock.
//!
//! Every trigger gets a job id. The wait for the lock, the render itself and
//! the outcome are logged inside one `render` span carrying that id.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::utils::debounce::Debounce;
use crate::utils::logfile::{trim_log_file, MAX_LOG_LINES, TRIM_LOG_LINES};
use crate::watcher::WatchEvent;

/// Default interval between periodic renders.
pub const DEFAULT_TICK_SECS: u64 = 240;

/// Something that produces and applies a wallpaper.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Runs one full render and returns the path of the written image.
    ///
    /// `job_id` identifies this render; it is already attached to the
    /// current span.
    ///
    /// # Errors
    ///
    /// Returns an error if the render was skipped or failed. The scheduler
    /// logs it and carries on.
    async fn render(&self, job_id: Uuid) -> Result<PathBuf>;
}

#[async_trait]
impl<R: Renderer + ?Sized> Renderer for Arc<R> {
    async fn render(&self, job_id: Uuid) -> Result<PathBuf> {
        (**self).render(job_id).await
    }
}

/// Why a render was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// The to-do file changed.
    FileChanged,
    /// The periodic timer fired.
    Tick,
    /// Requested directly, e.g. from the command line.
    Manual,
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FileChanged => "file_changed",
            Self::Tick => "tick",
            Self::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// Serializes renders requested by the watcher and the timer.
#[derive(Debug)]
pub struct Scheduler<R> {
    renderer: R,
    debounce: Debounce,
    render_lock: Mutex<()>,
    tick_interval: Duration,
    log_path: Option<PathBuf>,
    stop_ticker: Notify,
}

impl<R: Renderer + 'static> Scheduler<R> {
    /// Creates a scheduler with the given debounce window and tick interval.
    pub fn new(renderer: R, debounce_window: Duration, tick_interval: Duration) -> Self {
        Self {
            renderer,
            debounce: Debounce::new(debounce_window),
            render_lock: Mutex::new(()),
            tick_interval,
            log_path: None,
            stop_ticker: Notify::new(),
        }
    }

    /// Trims this log file before every periodic render.
    #[must_use]
    pub fn with_log_file(mut self, path: PathBuf) -> Self {
        self.log_path = Some(path);
        self
    }

    /// Returns the wrapped renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Applies the debounce gate to a file-change event observed at `now`.
    ///
    /// Returns `true` if the event should trigger a render.
    pub fn on_file_change(&self, now: Instant) -> bool {
        let accepted = self.debounce.accept(now);
        if !accepted {
            debug!("File change within debounce window, ignoring");
        }
        accepted
    }

    /// Waits for the render lock, runs one render and logs the outcome.
    ///
    /// # Errors
    ///
    /// Returns the render error after logging it.
    pub async fn trigger(&self, reason: TriggerReason) -> Result<PathBuf> {
        let job_id = Uuid::new_v4();
        let span = info_span!("render", %job_id, %reason);
        self.render_serialized(job_id).instrument(span).await
    }

    async fn render_serialized(&self, job_id: Uuid) -> Result<PathBuf> {
        let _guard = self.render_lock.lock().await;
        debug!("Render lock acquired");

        let result = self.renderer.render(job_id).await;
        match &result {
            Ok(path) => info!(path = %path.display(), "Wallpaper updated"),
            Err(EngineError::NothingToRender) => {
                warn!("Nothing to render, keeping previous wallpaper");
            }
            Err(e) => error!(error = %e, "Render failed"),
        }
        result
    }

    /// Runs [`Self::trigger`] on its own task.
    pub fn spawn_trigger(self: &Arc<Self>, reason: TriggerReason) -> JoinHandle<Result<PathBuf>> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move { scheduler.trigger(reason).await })
    }

    /// Renders immediately, then once per tick interval, until stopped.
    ///
    /// Each tick waits for its render to finish before the next interval
    /// starts counting. A stop request is only honoured between ticks, so a
    /// tick render that has started always completes.
    pub async fn run_ticker(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = self.stop_ticker.notified() => {
                    debug!("Periodic updates stopped");
                    return;
                }
                _ = interval.tick() => {}
            }
            info!("Periodic wallpaper update");
            self.trim_log();
            // Errors are already logged by trigger.
            let _ = self.trigger(TriggerReason::Tick).await;
        }
    }

    /// Drives both producers until `shutdown` resolves.
    ///
    /// On shutdown the ticker is stopped between ticks and any render holding
    /// the lock is allowed to finish. Renders still queued behind the lock
    /// are not started.
    pub async fn run<F>(self: Arc<Self>, mut watch_rx: mpsc::Receiver<WatchEvent>, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        let ticker = tokio::spawn(Arc::clone(&self).run_ticker());
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }

                event = watch_rx.recv() => match event {
                    Some(WatchEvent::TodoChanged(path)) => {
                        if self.on_file_change(Instant::now()) {
                            info!(path = %path.display(), "Change detected, updating wallpaper");
                            self.spawn_trigger(TriggerReason::FileChanged);
                        }
                    }
                    None => {
                        warn!("Watch channel closed, continuing with periodic updates only");
                        (&mut shutdown).await;
                        info!("Shutdown signal received");
                        break;
                    }
                },
            }
        }

        self.stop_ticker.notify_one();
        if let Err(e) = ticker.await {
            error!(error = %e, "Periodic update task failed");
        }
        let _guard = self.render_lock.lock().await;
        debug!("No render in flight, scheduler stopped");
    }

    fn trim_log(&self) {
        let Some(path) = &self.log_path else {
            return;
        };
        if let Err(e) = trim_log_file(path, MAX_LOG_LINES, TRIM_LOG_LINES) {
            warn!(path = %path.display(), error = %e, "Failed to trim log file");
        }
    }
}
