use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, bail};
use notify::{Config, Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};

/// Opaque identifier for one directory watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchToken(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawChangeKind {
    /// File contents (or write metadata) changed.
    Modified,
    /// Anything else: create, remove, rename, access.
    Other,
}

/// One decoded change record: which watched directory it came from and the
/// changed entry's path relative to that directory.
#[derive(Debug, Clone)]
pub struct RawChange {
    pub token: WatchToken,
    pub relative_path: PathBuf,
    pub is_directory: bool,
    pub kind: RawChangeKind,
}

/// Platform file-change notification behind a uniform add/remove/wait
/// surface, so no OS or `notify` type reaches the worker loop.
pub trait WatchBackend: Send {
    fn add_watch(&mut self, dir: &Path) -> anyhow::Result<WatchToken>;

    fn remove_watch(&mut self, token: WatchToken);

    /// Wait for change events across all current watches, at most `timeout`.
    /// A timeout is not an error: it returns an empty batch so the caller can
    /// observe stop requests between waits.
    fn wait_for_events(&mut self, timeout: Duration) -> anyhow::Result<Vec<RawChange>>;
}

/// [`WatchBackend`] backed by the `notify` crate: native kernel notifications
/// (inotify, FSEvents, ReadDirectoryChangesW) or its timestamp-polling
/// watcher where no native mechanism is usable.
pub struct NotifyBackend {
    watcher: Box<dyn Watcher + Send>,
    rx: mpsc::Receiver<notify::Result<Event>>,
    dirs: Vec<(WatchToken, PathBuf)>,
    next_token: usize,
}

impl NotifyBackend {
    pub fn recommended() -> anyhow::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| {
                let _ = tx.send(result);
            },
            Config::default(),
        )
        .context("failed to create native file watcher")?;
        Ok(Self::from_parts(Box::new(watcher), rx))
    }

    pub fn polling(interval: Duration) -> anyhow::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let watcher = PollWatcher::new(
            move |result: notify::Result<Event>| {
                let _ = tx.send(result);
            },
            Config::default().with_poll_interval(interval),
        )
        .context("failed to create polling file watcher")?;
        Ok(Self::from_parts(Box::new(watcher), rx))
    }

    /// Pick the native backend, falling back to polling when it cannot start.
    /// Errors only when neither mechanism comes up.
    pub fn create(force_poll: bool, poll_interval: Duration) -> anyhow::Result<Self> {
        if force_poll {
            return Self::polling(poll_interval);
        }
        match Self::recommended() {
            Ok(backend) => Ok(backend),
            Err(err) => {
                eprintln!(
                    "[tracker] native change notifications unavailable ({err:#}), falling back to polling"
                );
                Self::polling(poll_interval)
            }
        }
    }

    fn from_parts(
        watcher: Box<dyn Watcher + Send>,
        rx: mpsc::Receiver<notify::Result<Event>>,
    ) -> Self {
        Self {
            watcher,
            rx,
            dirs: Vec::new(),
            next_token: 0,
        }
    }

    fn decode(&self, result: notify::Result<Event>, out: &mut Vec<RawChange>) {
        let event = match result {
            Ok(event) => event,
            // Transient stream error: skip the record, keep the watch alive.
            Err(err) => {
                eprintln!("[tracker] change event error: {err}");
                return;
            }
        };

        let kind = if matches!(event.kind, EventKind::Modify(_)) {
            RawChangeKind::Modified
        } else {
            RawChangeKind::Other
        };

        for path in &event.paths {
            // Roots never overlap, so at most one watched directory matches.
            let Some((token, dir)) = self.dirs.iter().find(|(_, dir)| path.starts_with(dir))
            else {
                continue;
            };
            let Ok(relative) = path.strip_prefix(dir) else {
                continue;
            };
            if relative.as_os_str().is_empty() {
                // The watched directory itself.
                continue;
            }
            out.push(RawChange {
                token: *token,
                relative_path: relative.to_path_buf(),
                is_directory: path.is_dir(),
                kind,
            });
        }
    }
}

impl WatchBackend for NotifyBackend {
    fn add_watch(&mut self, dir: &Path) -> anyhow::Result<WatchToken> {
        self.watcher
            .watch(dir, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {}", dir.display()))?;
        let token = WatchToken(self.next_token);
        self.next_token += 1;
        self.dirs.push((token, dir.to_path_buf()));
        Ok(token)
    }

    fn remove_watch(&mut self, token: WatchToken) {
        if let Some(pos) = self.dirs.iter().position(|(t, _)| *t == token) {
            let (_, dir) = self.dirs.remove(pos);
            if let Err(err) = self.watcher.unwatch(&dir) {
                eprintln!("[tracker] failed to unwatch {}: {err}", dir.display());
            }
        }
    }

    fn wait_for_events(&mut self, timeout: Duration) -> anyhow::Result<Vec<RawChange>> {
        let mut out = Vec::new();
        let first = match self.rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => return Ok(out),
            Err(mpsc::RecvTimeoutError::Disconnected) => bail!("change event stream disconnected"),
        };
        self.decode(first, &mut out);
        // One wakeup per batch: drain whatever else is already queued.
        while let Ok(result) = self.rx.try_recv() {
            self.decode(result, &mut out);
        }
        Ok(out)
    }
}
