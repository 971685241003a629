use std::path::PathBuf;

use super::index::PassFileIndex;

/// A directory the tracker monitors, with the indices (into the
/// [`PassFileIndex`] entry list) of the watched files living under it.
#[derive(Debug)]
pub struct WatchRoot {
    pub dir: PathBuf,
    pub files: Vec<usize>,
}

/// Minimal set of directories covering every watched file.
///
/// Invariant: roots are pairwise non-overlapping. No root appears twice and
/// no root is an ancestor of another; nested shader folders collapse into
/// their ancestor so each one costs a single native watch handle.
#[derive(Debug, Default)]
pub struct WatchSet {
    pub roots: Vec<WatchRoot>,
}

impl WatchSet {
    /// Reduce the parent directories of the indexed files to a minimal root
    /// set and record which files fall under each surviving root.
    ///
    /// Containment is component-wise (`Path::starts_with`), so `shaders/ab`
    /// is not treated as living under `shaders/a`. When the same directory
    /// appears twice the first occurrence survives.
    pub fn build(index: &PassFileIndex) -> Self {
        let mut dirs: Vec<PathBuf> = Vec::with_capacity(index.len());
        for file in index.files() {
            match file.path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => dirs.push(parent.to_path_buf()),
                _ => eprintln!(
                    "[tracker] no parent directory for {}, not watching it",
                    file.path.display()
                ),
            }
        }

        let mut removed = vec![false; dirs.len()];
        for i in 0..dirs.len() {
            if removed[i] {
                continue;
            }
            for j in 0..dirs.len() {
                if i == j || removed[j] {
                    continue;
                }
                if dirs[j].starts_with(&dirs[i]) {
                    removed[j] = true;
                }
            }
        }

        let mut roots: Vec<WatchRoot> = dirs
            .into_iter()
            .zip(removed)
            .filter(|(_, removed)| !removed)
            .map(|(dir, _)| WatchRoot {
                dir,
                files: Vec::new(),
            })
            .collect();

        // Minimality makes the covering root unique for every file.
        for (file_idx, file) in index.files().iter().enumerate() {
            if let Some(root) = roots.iter_mut().find(|r| file.path.starts_with(&r.dir)) {
                root.files.push(file_idx);
            }
        }

        Self { roots }
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ShaderPass;
    use std::path::Path;

    fn pass(name: &str, vs: &str, fs: &str) -> ShaderPass {
        ShaderPass {
            name: name.into(),
            vs: vs.into(),
            fs: fs.into(),
            gs: None,
            gs_used: None,
        }
    }

    fn build(passes: &[ShaderPass]) -> (PassFileIndex, WatchSet) {
        let index = PassFileIndex::build(passes, &|stored| Path::new("/proj").join(stored));
        let set = WatchSet::build(&index);
        (index, set)
    }

    #[test]
    fn test_shared_directory_collapses_to_one_root() {
        let (_, set) = build(&[pass("P1", "a.hlsl", "b.hlsl")]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.roots[0].dir, Path::new("/proj"));
        assert_eq!(set.roots[0].files, vec![0, 1]);
    }

    #[test]
    fn test_subdirectory_collapses_into_ancestor() {
        let (index, set) = build(&[
            pass("P1", "a.hlsl", "sub/b.hlsl"),
            pass("P2", "sub/deeper/c.hlsl", "d.hlsl"),
        ]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.roots[0].dir, Path::new("/proj"));
        assert_eq!(
            set.roots[0].files.len(),
            index.len(),
            "every file must be covered by the surviving root"
        );
    }

    #[test]
    fn test_disjoint_directories_stay_separate() {
        let index = PassFileIndex::build(
            &[pass("P1", "/proj/a/x.hlsl", "/other/y.hlsl")],
            &|stored| PathBuf::from(stored),
        );
        let set = WatchSet::build(&index);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_sibling_with_common_name_prefix_is_not_contained() {
        let index = PassFileIndex::build(
            &[pass("P1", "/proj/a/x.hlsl", "/proj/ab/y.hlsl")],
            &|stored| PathBuf::from(stored),
        );
        let set = WatchSet::build(&index);
        assert_eq!(
            set.len(),
            2,
            "/proj/ab is a sibling of /proj/a, not a subdirectory"
        );
    }

    #[test]
    fn test_roots_are_pairwise_non_overlapping() {
        let (_, set) = build(&[
            pass("P1", "a.hlsl", "sub/b.hlsl"),
            pass("P2", "sub/c.hlsl", "other/d.hlsl"),
        ]);
        for (i, a) in set.roots.iter().enumerate() {
            for (j, b) in set.roots.iter().enumerate() {
                if i != j {
                    assert!(
                        !a.dir.starts_with(&b.dir),
                        "{} overlaps {}",
                        a.dir.display(),
                        b.dir.display()
                    );
                }
            }
        }
    }

    #[test]
    fn test_every_file_covered_by_exactly_one_root() {
        let (index, set) = build(&[
            pass("P1", "a.hlsl", "sub/b.hlsl"),
            pass("P2", "sub/c.hlsl", "sub/deep/d.hlsl"),
        ]);
        for file_idx in 0..index.len() {
            let covering = set
                .roots
                .iter()
                .filter(|r| r.files.contains(&file_idx))
                .count();
            assert_eq!(covering, 1, "file {file_idx} covered by {covering} roots");
        }
    }
}
