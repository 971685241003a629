pub mod backend;
pub mod index;
pub mod watchset;
mod worker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::TrackerConfig;
use crate::project::PipelineSource;

use backend::NotifyBackend;
use worker::WatchWorker;

/// Lifecycle of the background tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Stopped,
    Starting,
    Watching,
    Rebuilding,
    Stopping,
}

/// Pending pass-changed notifications, shared between the worker and the UI
/// tick.
///
/// Order across passes carries no meaning and duplicates are allowed: a
/// notification is an idempotent "re-check this pass". The queue stays
/// bounded in practice because the consumer drains it every tick.
#[derive(Default)]
pub struct NotificationChannel {
    queue: Mutex<Vec<String>>,
}

impl NotificationChannel {
    pub fn push(&self, pass: String) {
        self.lock().push(pass);
    }

    /// Return and clear everything queued so far.
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// State shared between the controller and the worker thread.
pub(crate) struct TrackerShared {
    pub(crate) notifications: NotificationChannel,
    stop: AtomicBool,
    state: Mutex<TrackerState>,
}

impl TrackerShared {
    pub(crate) fn new() -> Self {
        Self {
            notifications: NotificationChannel::default(),
            stop: AtomicBool::new(false),
            state: Mutex::new(TrackerState::Stopped),
        }
    }

    pub(crate) fn set_state(&self, state: TrackerState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub(crate) fn state(&self) -> TrackerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

/// Owner of the background file-change watcher.
///
/// At most one worker runs at a time. Enabling while running is a no-op;
/// disabling is synchronous and joins the worker before returning, so no
/// watch handle survives past `set_tracking(false)`. A worker that stopped
/// itself (no usable notification mechanism) reads as not tracking and a
/// later enable starts fresh.
pub struct FileTracker {
    pipeline: Arc<dyn PipelineSource>,
    config: TrackerConfig,
    shared: Arc<TrackerShared>,
    worker: Option<JoinHandle<()>>,
}

impl FileTracker {
    pub fn new(pipeline: Arc<dyn PipelineSource>, config: TrackerConfig) -> Self {
        Self {
            pipeline,
            config,
            shared: Arc::new(TrackerShared::new()),
            worker: None,
        }
    }

    pub fn set_tracking(&mut self, enabled: bool) {
        if enabled {
            self.start();
        } else {
            self.stop();
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.worker.is_some() && self.shared.state() != TrackerState::Stopped
    }

    pub fn state(&self) -> TrackerState {
        self.shared.state()
    }

    /// Pass names whose sources changed on disk since the last drain. Call
    /// once per UI tick.
    pub fn drain_changed_passes(&self) -> Vec<String> {
        self.shared.notifications.drain()
    }

    fn start(&mut self) {
        if let Some(worker) = self.worker.take() {
            if self.shared.state() != TrackerState::Stopped {
                // Already running.
                self.worker = Some(worker);
                return;
            }
            // The worker exited on its own; reap it and start over.
            let _ = worker.join();
        }

        eprintln!("[tracker] starting to track file changes");
        self.shared.stop.store(false, Ordering::Relaxed);
        self.shared.set_state(TrackerState::Starting);

        let pipeline = Arc::clone(&self.pipeline);
        let shared = Arc::clone(&self.shared);
        let config = self.config.clone();
        self.worker = Some(thread::spawn(move || {
            let poll_interval = Duration::from_millis(config.poll_interval_ms);
            let backend = match NotifyBackend::create(config.force_poll, poll_interval) {
                Ok(backend) => backend,
                Err(err) => {
                    // No notification mechanism at all. Report tracking as
                    // stopped instead of retrying in a tight loop; the user
                    // can re-enable for a fresh attempt.
                    eprintln!("[tracker] cannot initialize file change tracking: {err:#}");
                    shared.set_state(TrackerState::Stopped);
                    return;
                }
            };
            WatchWorker::new(pipeline, shared, config, Box::new(backend)).run();
        }));
    }

    fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        eprintln!("[tracker] stopping file change tracking");
        self.shared.stop.store(true, Ordering::Relaxed);
        let _ = worker.join();
        self.shared.set_state(TrackerState::Stopped);
    }
}

impl Drop for FileTracker {
    fn drop(&mut self) {
        self.stop();
    }
}
