//! Debounce gate for file-change bursts.
//!
//! Editors usually produce several file system events for a single save
//! (truncate, write, metadata update, sometimes a rename). The gate accepts
//! the first event of a burst and rejects every following event until the
//! window has elapsed since the last *accepted* one.
//!
//! The check is a timestamp compare behind a short-lived lock, so it can be
//! called from the event loop without waiting on an in-flight render.
//!
//! # Example
//!
//! ```
//! use std::time::{Duration, Instant};
//! use todopaper_engine::utils::debounce::Debounce;
//!
//! let gate = Debounce::new(Duration::from_secs(2));
//! let start = Instant::now();
//!
//! assert!(gate.accept(start));
//! assert!(!gate.accept(start + Duration::from_millis(500)));
//! assert!(gate.accept(start + Duration::from_secs(3)));
//! ```

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::trace;

/// Default debounce window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 2000;

/// Leading-edge debounce over a fixed window.
#[derive(Debug)]
pub struct Debounce {
    /// Events closer than this to the last accepted event are dropped.
    window: Duration,
    /// When the last event was accepted.
    last_accepted: Mutex<Option<Instant>>,
}

impl Debounce {
    /// Creates a gate with the given window. A zero window accepts everything.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: Mutex::new(None),
        }
    }

    /// Creates a gate with the default 2 second window.
    #[must_use]
    pub fn with_default_window() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DEBOUNCE_MS))
    }

    /// Returns the configured window.
    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Decides whether an event observed at `now` passes the gate.
    ///
    /// Accepts when no event has been accepted yet or when strictly more than
    /// the window has elapsed since the last accepted one. Accepting records
    /// `now` as the new reference point; rejected events do not extend the
    /// window.
    pub fn accept(&self, now: Instant) -> bool {
        let mut last = self
            .last_accepted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let accepted = match *last {
            _ if self.window.is_zero() => true,
            None => true,
            Some(prev) => now.saturating_duration_since(prev) > self.window,
        };

        if accepted {
            *last = Some(now);
        }

        trace!(accepted, window_ms = self.window.as_millis(), "Debounce check");
        accepted
    }

    /// Returns when the last event was accepted, if any.
    #[must_use]
    pub fn last_accepted(&self) -> Option<Instant> {
        *self
            .last_accepted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Debounce {
    fn default() -> Self {
        Self::with_default_window()
    }
}
