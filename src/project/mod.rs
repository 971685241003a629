use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Shader stage within a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
}

impl ShaderStage {
    /// Short label used in panel titles and listings.
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Vertex => "VS",
            Self::Fragment => "FS",
            Self::Geometry => "GS",
        }
    }
}

/// One pipeline pass: a named grouping of shader sources.
///
/// Paths are stored as written in the project file, usually relative to the
/// project root. A pass can keep a geometry path configured while the stage
/// itself is switched off (`gs-used = false`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaderPass {
    pub name: String,
    pub vs: String,
    pub fs: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gs: Option<String>,
    /// Whether the geometry stage participates. Defaults to the presence of
    /// a `gs` path.
    #[serde(rename = "gs-used", default, skip_serializing_if = "Option::is_none")]
    pub gs_used: Option<bool>,
}

impl ShaderPass {
    pub fn geometry_active(&self) -> bool {
        self.gs.is_some() && self.gs_used.unwrap_or(true)
    }

    /// The stored path for a stage, or `None` when the stage is inactive.
    pub fn stage_path(&self, stage: ShaderStage) -> Option<&str> {
        match stage {
            ShaderStage::Vertex => Some(&self.vs),
            ShaderStage::Fragment => Some(&self.fs),
            ShaderStage::Geometry => {
                if self.geometry_active() {
                    self.gs.as_deref()
                } else {
                    None
                }
            }
        }
    }
}

/// A shader project: a TOML file with `[[pass]]` tables.
///
/// ```toml
/// name = "demo"
///
/// [[pass]]
/// name = "Scene"
/// vs = "shaders/scene.vert"
/// fs = "shaders/scene.frag"
/// gs = "shaders/scene.geom"
/// gs-used = false
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShaderProject {
    pub name: Option<String>,
    #[serde(rename = "pass", default)]
    pub passes: Vec<ShaderPass>,
    /// Absolute path of the loaded project file. `None` for a project that
    /// has not been saved anywhere yet.
    #[serde(skip)]
    file: Option<PathBuf>,
}

impl ShaderProject {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read project file {}", path.display()))?;
        let mut project: ShaderProject = toml::from_str(&text)
            .with_context(|| format!("failed to parse project file {}", path.display()))?;
        // Canonical so that watch roots and event paths compare equal.
        project.file = Some(path.canonicalize().unwrap_or_else(|_| path.to_path_buf()));
        Ok(project)
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Directory the project file lives in; pass paths resolve against it.
    pub fn root(&self) -> Option<&Path> {
        self.file.as_deref().and_then(Path::parent)
    }

    /// Turn a stored pass path into an absolute filesystem path.
    pub fn resolve(&self, stored: &str) -> PathBuf {
        let path = Path::new(stored);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.root() {
            Some(root) => root.join(path),
            None => path.to_path_buf(),
        }
    }

    pub fn pass(&self, name: &str) -> Option<&ShaderPass> {
        self.passes.iter().find(|p| p.name == name)
    }

    /// Read the contents of a pass source file.
    pub fn load_source(&self, stored: &str) -> Result<String> {
        let path = self.resolve(stored);
        fs::read_to_string(&path)
            .with_context(|| format!("failed to read shader source {}", path.display()))
    }

    /// Write the contents of a pass source file.
    pub fn save_source(&self, stored: &str, text: &str) -> Result<()> {
        let path = self.resolve(stored);
        fs::write(&path, text)
            .with_context(|| format!("failed to write shader source {}", path.display()))
    }
}

/// Read-only view of the pipeline the tracker polls every iteration.
///
/// Implementations return point-in-time snapshots; the tracker never holds a
/// lock across an iteration and never mutates pipeline state.
pub trait PipelineSource: Send + Sync {
    fn passes(&self) -> Vec<ShaderPass>;
    fn project_path(&self) -> Option<PathBuf>;
    fn resolve(&self, stored: &str) -> PathBuf;
}

/// External compile service. The editor saves a pass's sources and asks this
/// to rebuild it; what "rebuild" means belongs to the embedding application.
pub trait Compiler: Send {
    fn recompile(&mut self, pass: &str);
}

/// Compile service stand-in that reports what would be rebuilt.
pub struct EchoCompiler;

impl Compiler for EchoCompiler {
    fn recompile(&mut self, pass: &str) {
        println!("recompiling {pass}");
    }
}

/// Shared handle to the live project, usable as a [`PipelineSource`].
///
/// The editor thread mutates the project through this handle while the
/// tracker thread takes snapshots of it; each access holds the lock only for
/// the duration of one call.
pub struct ProjectHandle {
    inner: Mutex<ShaderProject>,
}

impl ProjectHandle {
    pub fn new(project: ShaderProject) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(project),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ShaderProject> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Swap in a new project (open, reload, close-and-new). The tracker picks
    /// the change up on its next iteration.
    pub fn replace(&self, project: ShaderProject) {
        *self.lock() = project;
    }

    pub fn snapshot(&self) -> ShaderProject {
        self.lock().clone()
    }

    pub fn pass(&self, name: &str) -> Option<ShaderPass> {
        self.lock().pass(name).cloned()
    }

    pub fn load_source(&self, stored: &str) -> Result<String> {
        self.lock().load_source(stored)
    }

    pub fn save_source(&self, stored: &str, text: &str) -> Result<()> {
        self.lock().save_source(stored, text)
    }
}

impl PipelineSource for ProjectHandle {
    fn passes(&self) -> Vec<ShaderPass> {
        self.lock().passes.clone()
    }

    fn project_path(&self) -> Option<PathBuf> {
        self.lock().file.clone()
    }

    fn resolve(&self, stored: &str) -> PathBuf {
        self.lock().resolve(stored)
    }
}
