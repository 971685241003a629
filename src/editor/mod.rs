use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use anyhow::{Result, bail};

use crate::config::EditorPrefs;
use crate::project::{Compiler, PipelineSource, ProjectHandle, ShaderStage};
use crate::tracker::FileTracker;

/// One open edit panel: a pass stage and its text buffer.
///
/// The text-editing widget itself lives in the embedding UI; the panel keeps
/// the boundary state the UI needs: the buffer, whether it diverged from
/// disk (`dirty`) and whether the file changed under it (`external_change`).
#[derive(Debug)]
pub struct EditorPanel {
    pub pass: String,
    pub stage: ShaderStage,
    /// Stored (usually project-relative) path, as written in the pass.
    pub source: String,
    /// Resolved absolute path.
    pub path: PathBuf,
    pub text: String,
    pub dirty: bool,
    pub external_change: bool,
}

impl EditorPanel {
    /// Window title, e.g. `Scene (FS)`.
    pub fn title(&self) -> String {
        format!("{} ({})", self.pass, self.stage.short_name())
    }
}

/// The set of open edit panels and the policy glue around them: open with
/// dedupe, save, compile, and the per-tick handling of externally changed
/// files.
pub struct Workspace {
    project: Arc<ProjectHandle>,
    prefs: EditorPrefs,
    compiler: Box<dyn Compiler>,
    panels: Vec<EditorPanel>,
    /// Panel the embedding UI should focus on its next frame.
    focus: Option<usize>,
}

impl Workspace {
    pub fn new(project: Arc<ProjectHandle>, prefs: EditorPrefs, compiler: Box<dyn Compiler>) -> Self {
        Self {
            project,
            prefs,
            compiler,
            panels: Vec::new(),
            focus: None,
        }
    }

    pub fn panels(&self) -> &[EditorPanel] {
        &self.panels
    }

    /// Index the UI should focus, set by [`Workspace::open`] when the file is
    /// already open. Cleared on read.
    pub fn take_focus_request(&mut self) -> Option<usize> {
        self.focus.take()
    }

    /// Open an edit panel for one stage of a pass.
    ///
    /// If any open panel already shows the same file (possibly under another
    /// pass or stage) that panel is focused instead of opening a second copy.
    /// With `use_external_editor` set, the file is handed to the system
    /// opener and no panel is created.
    pub fn open(&mut self, pass_name: &str, stage: ShaderStage) -> Result<()> {
        let Some(pass) = self.project.pass(pass_name) else {
            bail!("no pass named {pass_name} in the project");
        };
        let Some(stored) = pass.stage_path(stage) else {
            bail!("pass {pass_name} has no active {} stage", stage.short_name());
        };
        let path = self.project.resolve(stored);

        if self.prefs.use_external_editor {
            open_external(&path);
            return Ok(());
        }

        if let Some(existing) = self.panels.iter().position(|p| p.path == path) {
            self.focus = Some(existing);
            return Ok(());
        }

        let text = self.project.load_source(stored)?;
        self.panels.push(EditorPanel {
            pass: pass_name.to_string(),
            stage,
            source: stored.to_string(),
            path,
            text,
            dirty: false,
            external_change: false,
        });
        self.focus = Some(self.panels.len() - 1);
        Ok(())
    }

    /// Replace a panel's buffer, marking it dirty. This is the seam the text
    /// widget writes through.
    pub fn set_text(&mut self, panel: usize, text: String) {
        if let Some(p) = self.panels.get_mut(panel) {
            p.text = text;
            p.dirty = true;
        }
    }

    pub fn save(&mut self, panel: usize) -> Result<()> {
        let Some(p) = self.panels.get_mut(panel) else {
            bail!("no panel {panel}");
        };
        self.project.save_source(&p.source, &p.text)?;
        p.dirty = false;
        p.external_change = false;
        Ok(())
    }

    pub fn save_all(&mut self) -> Result<()> {
        for panel in 0..self.panels.len() {
            self.save(panel)?;
        }
        Ok(())
    }

    /// Save the panel's sources, then ask the compile service to rebuild the
    /// owning pass.
    pub fn compile(&mut self, panel: usize) -> Result<()> {
        self.save(panel)?;
        let pass = self.panels[panel].pass.clone();
        self.compiler.recompile(&pass);
        Ok(())
    }

    /// Remove a panel, returning it so the caller can still inspect unsaved
    /// state (the save-changes prompt is the embedding UI's business).
    pub fn close(&mut self, panel: usize) -> Option<EditorPanel> {
        if panel >= self.panels.len() {
            return None;
        }
        self.focus = None;
        Some(self.panels.remove(panel))
    }

    pub fn close_all(&mut self) {
        self.panels.clear();
        self.focus = None;
    }

    /// A pipeline pass was renamed; keep open panels pointing at it.
    pub fn rename_pass(&mut self, old: &str, new: &str) {
        for panel in self.panels.iter_mut().filter(|p| p.pass == old) {
            panel.pass = new.to_string();
        }
    }

    /// (pass, stage) for every open panel, for project persistence.
    pub fn opened_files(&self) -> Vec<(String, ShaderStage)> {
        self.panels
            .iter()
            .map(|p| (p.pass.clone(), p.stage))
            .collect()
    }

    /// Buffer contents of every open panel, for project persistence.
    pub fn opened_files_data(&self) -> Vec<String> {
        self.panels.iter().map(|p| p.text.clone()).collect()
    }

    /// Restore buffer contents saved by [`Workspace::opened_files_data`].
    /// Restored buffers count as unsaved edits.
    pub fn set_opened_files_data(&mut self, data: &[String]) {
        for (panel, text) in self.panels.iter_mut().zip(data) {
            panel.text = text.clone();
            panel.dirty = true;
        }
    }

    /// Drain the tracker once and apply the external-change policy. Returns
    /// the drained pass names so the embedding UI can prompt or badge them.
    pub fn tick(&mut self, tracker: &FileTracker) -> Vec<String> {
        let changed = tracker.drain_changed_passes();
        self.apply_external_changes(&changed);
        changed
    }

    /// For each changed pass: recompile when configured, and reload every
    /// clean panel of that pass from disk. Panels with unsaved edits are
    /// never overwritten, only marked.
    pub fn apply_external_changes(&mut self, changed: &[String]) {
        for pass in changed {
            if self.prefs.recompile_on_change {
                self.compiler.recompile(pass);
            }
            for panel in self.panels.iter_mut().filter(|p| &p.pass == pass) {
                if panel.dirty || !self.prefs.auto_reload {
                    panel.external_change = true;
                    continue;
                }
                match fs::read_to_string(&panel.path) {
                    Ok(text) => {
                        panel.text = text;
                        panel.external_change = false;
                    }
                    Err(err) => {
                        eprintln!(
                            "warning: failed to reload {}: {err}",
                            panel.path.display()
                        );
                        panel.external_change = true;
                    }
                }
            }
        }
    }
}

/// Hand a file to the platform's default opener. Best effort.
fn open_external(path: &Path) {
    #[cfg(target_os = "macos")]
    let mut command = Command::new("open");
    #[cfg(all(unix, not(target_os = "macos")))]
    let mut command = Command::new("xdg-open");
    #[cfg(windows)]
    let mut command = {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    };

    command.arg(path);
    if let Err(err) = command.spawn() {
        eprintln!("warning: failed to open {} externally: {err}", path.display());
    }
}
