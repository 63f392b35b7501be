//! Integration tests for render triggering.
//!
//! These tests verify that concurrent triggers never overlap, that none of
//! them is lost, and that bursts of file changes are debounced.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use todopaper_engine::error::{EngineError, Result};
use todopaper_engine::scheduler::{Renderer, Scheduler, TriggerReason};
use todopaper_engine::watcher::WatchEvent;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

// =============================================================================
// Test Helpers
// =============================================================================

/// Renderer that takes a while and tracks how many renders overlap.
#[derive(Default)]
struct SlowRenderer {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    completed: AtomicUsize,
    fail_every_other: bool,
    extra_delay: Duration,
}

#[async_trait]
impl Renderer for SlowRenderer {
    async fn render(&self, _job_id: Uuid) -> Result<PathBuf> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(20) + self.extra_delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let n = self.completed.fetch_add(1, Ordering::SeqCst);

        if self.fail_every_other && n % 2 == 1 {
            Err(EngineError::NothingToRender)
        } else {
            Ok(PathBuf::from("/tmp/background.png"))
        }
    }
}

fn scheduler(renderer: SlowRenderer) -> Arc<Scheduler<SlowRenderer>> {
    Arc::new(Scheduler::new(
        renderer,
        Duration::from_secs(2),
        Duration::from_secs(3600),
    ))
}

// =============================================================================
// Mutual exclusion
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_triggers_run_one_at_a_time() {
    let s = scheduler(SlowRenderer::default());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let reason = if i % 2 == 0 {
                TriggerReason::FileChanged
            } else {
                TriggerReason::Tick
            };
            s.spawn_trigger(reason)
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(s.renderer().completed.load(Ordering::SeqCst), 8);
    assert_eq!(s.renderer().max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_renders_do_not_block_later_ones() {
    let s = scheduler(SlowRenderer {
        fail_every_other: true,
        ..SlowRenderer::default()
    });

    let handles: Vec<_> = (0..6)
        .map(|_| s.spawn_trigger(TriggerReason::Manual))
        .collect();

    let mut failures = 0;
    for handle in handles {
        if handle.await.unwrap().is_err() {
            failures += 1;
        }
    }

    assert_eq!(failures, 3);
    assert_eq!(s.renderer().completed.load(Ordering::SeqCst), 6);
    assert_eq!(s.renderer().max_in_flight.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Event loop
// =============================================================================

#[tokio::test]
async fn test_burst_of_changes_renders_once() {
    let s = scheduler(SlowRenderer::default());
    let (tx, rx) = mpsc::channel(16);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(Arc::clone(&s).run(rx, async move {
        let _ = stop_rx.await;
    }));

    for _ in 0..5 {
        tx.send(WatchEvent::TodoChanged(PathBuf::from("todo.md")))
            .await
            .unwrap();
    }
    tokio::time::sleep(Duration::from_millis(300)).await;

    stop_tx.send(()).unwrap();
    handle.await.unwrap();

    // The immediate tick plus one render for the whole burst.
    assert_eq!(s.renderer().completed.load(Ordering::SeqCst), 2);
    assert_eq!(s.renderer().max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_closed_watch_channel_waits_for_shutdown() {
    let s = scheduler(SlowRenderer::default());
    let (tx, rx) = mpsc::channel::<WatchEvent>(1);
    drop(tx);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(Arc::clone(&s).run(rx, async move {
        let _ = stop_rx.await;
    }));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!handle.is_finished());

    stop_tx.send(()).unwrap();
    handle.await.unwrap();
    assert_eq!(s.renderer().completed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_shutdown_lets_running_tick_render_finish() {
    let s = scheduler(SlowRenderer {
        extra_delay: Duration::from_millis(300),
        ..SlowRenderer::default()
    });
    let (_tx, rx) = mpsc::channel::<WatchEvent>(1);

    // Shutdown arrives while the immediate tick render is still sleeping.
    Arc::clone(&s)
        .run(rx, tokio::time::sleep(Duration::from_millis(50)))
        .await;

    assert_eq!(s.renderer().completed.load(Ordering::SeqCst), 1);
    assert_eq!(s.renderer().in_flight.load(Ordering::SeqCst), 0);
}
