use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::project::{ShaderPass, ShaderStage};

/// One shader source file the tracker cares about, together with the pass it
/// belongs to. Several entries may share a path when passes reuse a file;
/// every (pass, stage) owner gets its own entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedFile {
    pub path: PathBuf,
    pub pass: String,
    pub stage: ShaderStage,
}

/// Mapping between pipeline passes and the files they read from disk, in both
/// directions: pass to files (the entry list) and file to passes (`by_path`).
///
/// The index is derived data. It is rebuilt whole whenever the pass list or
/// the project path changes; there is no incremental update.
#[derive(Debug, Default)]
pub struct PassFileIndex {
    files: Vec<WatchedFile>,
    by_path: HashMap<PathBuf, Vec<usize>>,
}

impl PassFileIndex {
    /// Build the index from a pass-list snapshot. `resolve` turns a stored
    /// (usually project-relative) path into an absolute one.
    ///
    /// Vertex and fragment sources are always included; the geometry source
    /// only when the pass has the stage switched on.
    pub fn build(passes: &[ShaderPass], resolve: &dyn Fn(&str) -> PathBuf) -> Self {
        let mut index = Self::default();
        for pass in passes {
            index.insert(resolve(&pass.vs), &pass.name, ShaderStage::Vertex);
            index.insert(resolve(&pass.fs), &pass.name, ShaderStage::Fragment);
            if pass.geometry_active()
                && let Some(gs) = &pass.gs
            {
                index.insert(resolve(gs), &pass.name, ShaderStage::Geometry);
            }
        }
        index
    }

    fn insert(&mut self, path: PathBuf, pass: &str, stage: ShaderStage) {
        self.by_path
            .entry(path.clone())
            .or_default()
            .push(self.files.len());
        self.files.push(WatchedFile {
            path,
            pass: pass.to_string(),
            stage,
        });
    }

    pub fn files(&self) -> &[WatchedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.by_path.contains_key(path)
    }

    /// Every watched-file entry referencing `path`, one per owning
    /// (pass, stage). Unknown paths yield nothing.
    pub fn entries_for(&self, path: &Path) -> impl Iterator<Item = &WatchedFile> {
        self.by_path
            .get(path)
            .into_iter()
            .flatten()
            .map(|&i| &self.files[i])
    }
}

/// Point-in-time shape of the pass list used to decide when a rebuild is due:
/// pass count, per-pass geometry activity, and the active project path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassListFingerprint {
    pass_count: usize,
    geometry_flags: Vec<bool>,
    project_path: Option<PathBuf>,
}

impl PassListFingerprint {
    pub fn capture(passes: &[ShaderPass], project_path: Option<&Path>) -> Self {
        Self {
            pass_count: passes.len(),
            geometry_flags: passes.iter().map(ShaderPass::geometry_active).collect(),
            project_path: project_path.map(Path::to_path_buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass(name: &str, vs: &str, fs: &str, gs: Option<&str>) -> ShaderPass {
        ShaderPass {
            name: name.into(),
            vs: vs.into(),
            fs: fs.into(),
            gs: gs.map(Into::into),
            gs_used: None,
        }
    }

    fn resolve(stored: &str) -> PathBuf {
        Path::new("/proj").join(stored)
    }

    #[test]
    fn test_pass_with_two_stages_yields_two_entries() {
        let index = PassFileIndex::build(&[pass("P1", "a.hlsl", "b.hlsl", None)], &resolve);
        assert_eq!(index.len(), 2);
        assert!(index.contains_path(Path::new("/proj/a.hlsl")));
        assert!(index.contains_path(Path::new("/proj/b.hlsl")));
    }

    #[test]
    fn test_pass_with_geometry_yields_three_entries() {
        let index = PassFileIndex::build(
            &[pass("P1", "a.hlsl", "b.hlsl", Some("g.hlsl"))],
            &resolve,
        );
        assert_eq!(index.len(), 3);
        let stages: Vec<_> = index
            .entries_for(Path::new("/proj/g.hlsl"))
            .map(|f| f.stage)
            .collect();
        assert_eq!(stages, vec![ShaderStage::Geometry]);
    }

    #[test]
    fn test_inactive_geometry_is_excluded() {
        let mut p = pass("P1", "a.hlsl", "b.hlsl", Some("g.hlsl"));
        p.gs_used = Some(false);
        let index = PassFileIndex::build(&[p], &resolve);
        assert_eq!(index.len(), 2);
        assert!(!index.contains_path(Path::new("/proj/g.hlsl")));
    }

    #[test]
    fn test_shared_file_maps_to_both_passes() {
        let index = PassFileIndex::build(
            &[
                pass("P1", "shared.hlsl", "p1.hlsl", None),
                pass("P2", "shared.hlsl", "p2.hlsl", None),
            ],
            &resolve,
        );
        let owners: Vec<_> = index
            .entries_for(Path::new("/proj/shared.hlsl"))
            .map(|f| f.pass.as_str())
            .collect();
        assert_eq!(owners, vec!["P1", "P2"]);
    }

    #[test]
    fn test_every_entry_maps_back_to_a_pass() {
        let index = PassFileIndex::build(
            &[
                pass("P1", "a.hlsl", "b.hlsl", Some("g.hlsl")),
                pass("P2", "c.hlsl", "d.hlsl", None),
            ],
            &resolve,
        );
        for file in index.files() {
            assert!(
                index.entries_for(&file.path).any(|f| f.pass == file.pass),
                "reverse lookup lost {} for {}",
                file.pass,
                file.path.display()
            );
        }
    }

    #[test]
    fn test_fingerprint_tracks_geometry_toggle() {
        let mut passes = vec![pass("P1", "a.hlsl", "b.hlsl", Some("g.hlsl"))];
        let before = PassListFingerprint::capture(&passes, None);

        passes[0].gs_used = Some(false);
        let after = PassListFingerprint::capture(&passes, None);
        assert_ne!(before, after, "geometry toggle must change the fingerprint");
    }

    #[test]
    fn test_fingerprint_tracks_project_path() {
        let passes = vec![pass("P1", "a.hlsl", "b.hlsl", None)];
        let a = PassListFingerprint::capture(&passes, Some(Path::new("/proj/a.toml")));
        let b = PassListFingerprint::capture(&passes, Some(Path::new("/proj/b.toml")));
        assert_ne!(a, b);
    }
}
