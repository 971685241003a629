use std::path::Path;

use serde::Deserialize;

/// Configuration loaded from `shader-edit.toml` at the project root.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub tracker: TrackerConfig,
    pub editor: EditorPrefs,
}

/// Settings for the background file-change tracker.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Start tracking file changes as soon as a project is opened.
    pub enabled: bool,
    /// Use the polling backend even when native notifications are available.
    pub force_poll: bool,
    /// Scan interval of the polling backend, in milliseconds.
    pub poll_interval_ms: u64,
    /// Bounded wait for change events per loop iteration, in milliseconds.
    /// Stop requests are observed within roughly this period.
    pub event_timeout_ms: u64,
    /// Fixed sleep between loop iterations, in milliseconds.
    pub loop_sleep_ms: u64,
    /// Sleep when there is nothing to watch, in milliseconds.
    pub idle_sleep_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            force_poll: false,
            poll_interval_ms: 250,
            event_timeout_ms: 1000,
            loop_sleep_ms: 10,
            idle_sleep_ms: 500,
        }
    }
}

/// Editor-surface preferences.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EditorPrefs {
    /// Reload unmodified panels when their file changes on disk. Panels with
    /// unsaved edits are only marked, never overwritten.
    pub auto_reload: bool,
    /// Recompile a pass whenever one of its sources changes on disk.
    pub recompile_on_change: bool,
    /// Open sources in the system editor instead of an in-app panel.
    pub use_external_editor: bool,
}

impl Default for EditorPrefs {
    fn default() -> Self {
        Self {
            auto_reload: true,
            recompile_on_change: false,
            use_external_editor: false,
        }
    }
}

impl EditorConfig {
    /// Load configuration from `shader-edit.toml` in the given root directory.
    ///
    /// Returns the default configuration if the file does not exist or cannot
    /// be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join("shader-edit.toml");

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    eprintln!("warning: failed to parse shader-edit.toml: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                eprintln!("warning: failed to read shader-edit.toml: {err}. Using defaults.");
                Self::default()
            }
        }
    }
}
