use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::TrackerConfig;
use crate::project::{PipelineSource, ShaderPass};

use super::backend::{RawChange, RawChangeKind, WatchBackend, WatchToken};
use super::index::{PassFileIndex, PassListFingerprint};
use super::watchset::WatchSet;
use super::{TrackerShared, TrackerState};

/// Native handles for the current watch set, one per surviving root.
/// Always drained before the set is rebuilt and on worker exit.
#[derive(Default)]
struct HandleTable {
    entries: Vec<(WatchToken, usize)>,
}

impl HandleTable {
    fn acquire(backend: &mut dyn WatchBackend, set: &WatchSet) -> Self {
        let mut entries = Vec::with_capacity(set.len());
        for (root_idx, root) in set.roots.iter().enumerate() {
            match backend.add_watch(&root.dir) {
                Ok(token) => entries.push((token, root_idx)),
                // Missing or unreadable directory: watching continues for the
                // others and the next rebuild retries this one.
                Err(err) => eprintln!("[tracker] cannot watch {}: {err:#}", root.dir.display()),
            }
        }
        Self { entries }
    }

    fn release(&mut self, backend: &mut dyn WatchBackend) {
        for (token, _) in self.entries.drain(..) {
            backend.remove_watch(token);
        }
    }

    fn root_of(&self, token: WatchToken) -> Option<usize> {
        self.entries
            .iter()
            .find(|(t, _)| *t == token)
            .map(|&(_, root_idx)| root_idx)
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The background control loop.
///
/// Each iteration takes a pass-list snapshot from the pipeline, rebuilds the
/// index and watch set when the snapshot no longer matches, then waits
/// (bounded) for change events and publishes the owning pass names. The
/// worker exclusively owns the backend, index, watch set and handle table;
/// the notification channel inside [`TrackerShared`] is the only shared
/// structure.
pub(super) struct WatchWorker {
    pipeline: Arc<dyn PipelineSource>,
    shared: Arc<TrackerShared>,
    config: TrackerConfig,
    backend: Box<dyn WatchBackend>,
    index: PassFileIndex,
    watch_set: WatchSet,
    handles: HandleTable,
    fingerprint: PassListFingerprint,
}

impl WatchWorker {
    pub(super) fn new(
        pipeline: Arc<dyn PipelineSource>,
        shared: Arc<TrackerShared>,
        config: TrackerConfig,
        backend: Box<dyn WatchBackend>,
    ) -> Self {
        Self {
            pipeline,
            shared,
            config,
            backend,
            index: PassFileIndex::default(),
            watch_set: WatchSet::default(),
            handles: HandleTable::default(),
            fingerprint: PassListFingerprint::default(),
        }
    }

    pub(super) fn run(mut self) {
        self.shared.set_state(TrackerState::Watching);

        while !self.shared.stop_requested() {
            thread::sleep(Duration::from_millis(self.config.loop_sleep_ms));

            let passes = self.pipeline.passes();
            let project_path = self.pipeline.project_path();
            if self.needs_rebuild(&passes, project_path.as_deref()) {
                self.rebuild(&passes, project_path.as_deref());
            }

            if self.handles.is_empty() {
                // Nothing to watch; back off before checking the pipeline again.
                thread::sleep(Duration::from_millis(self.config.idle_sleep_ms));
                continue;
            }

            self.pump();
        }

        self.shared.set_state(TrackerState::Stopping);
        self.handles.release(self.backend.as_mut());
        self.shared.set_state(TrackerState::Stopped);
    }

    /// Whether the watched-file collection is stale against the snapshot.
    fn needs_rebuild(&self, passes: &[ShaderPass], project_path: Option<&Path>) -> bool {
        if self.watch_set.is_empty() {
            return true;
        }
        if PassListFingerprint::capture(passes, project_path) != self.fingerprint {
            return true;
        }
        // A pass may point at new files without the count or flags moving.
        passes.iter().any(|pass| {
            !self.index.contains_path(&self.pipeline.resolve(&pass.vs))
                || !self.index.contains_path(&self.pipeline.resolve(&pass.fs))
                || pass
                    .stage_path(crate::project::ShaderStage::Geometry)
                    .is_some_and(|gs| !self.index.contains_path(&self.pipeline.resolve(gs)))
        })
    }

    fn rebuild(&mut self, passes: &[ShaderPass], project_path: Option<&Path>) {
        self.shared.set_state(TrackerState::Rebuilding);
        self.handles.release(self.backend.as_mut());

        let pipeline = Arc::clone(&self.pipeline);
        self.index = PassFileIndex::build(passes, &move |stored| pipeline.resolve(stored));
        self.watch_set = WatchSet::build(&self.index);
        self.handles = HandleTable::acquire(self.backend.as_mut(), &self.watch_set);
        self.fingerprint = PassListFingerprint::capture(passes, project_path);

        self.shared.set_state(TrackerState::Watching);
    }

    /// One bounded event wait, translated and published.
    fn pump(&mut self) {
        let timeout = Duration::from_millis(self.config.event_timeout_ms);
        match self.backend.wait_for_events(timeout) {
            Ok(changes) => {
                for change in &changes {
                    for pass in self.translate(change) {
                        self.shared.notifications.push(pass);
                    }
                }
            }
            // Transient read failure counts as an empty batch.
            Err(err) => eprintln!("[tracker] failed to read change events: {err:#}"),
        }
    }

    /// Map one raw change back to the passes whose sources it touched.
    ///
    /// Only modifications of non-directory entries count. The full path is
    /// the watched root joined with the relative path, matched against the
    /// root's own file subset; entries no longer in the index simply drop.
    fn translate(&self, change: &RawChange) -> Vec<String> {
        if change.is_directory || change.kind != RawChangeKind::Modified {
            return Vec::new();
        }
        let Some(root_idx) = self.handles.root_of(change.token) else {
            return Vec::new();
        };
        let root = &self.watch_set.roots[root_idx];
        let full_path = root.dir.join(&change.relative_path);

        root.files
            .iter()
            .filter_map(|&file_idx| {
                let file = &self.index.files()[file_idx];
                (file.path == full_path).then(|| file.pass.clone())
            })
            .collect()
    }
}
