use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Editor core for shader pipeline projects.
///
/// shader-edit loads a TOML project describing pipeline passes (vertex,
/// fragment, optional geometry sources per pass) and tracks external changes
/// to those sources on disk.
#[derive(Parser, Debug)]
#[command(name = "shader-edit", version, about, long_about = None, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List a project's passes, their source files and the directories the
    /// tracker would watch.
    Passes {
        /// Path to the project file.
        project: PathBuf,

        /// Output as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },

    /// Track the project's shader sources and print a line whenever a pass's
    /// source changes on disk.
    Watch {
        /// Path to the project file.
        project: PathBuf,

        /// Stop after this many seconds instead of running until killed.
        #[arg(long)]
        duration: Option<u64>,

        /// Ask the (stub) compile service to rebuild changed passes.
        #[arg(long)]
        recompile: bool,

        /// Use the polling backend instead of native notifications.
        #[arg(long)]
        poll: bool,
    },
}
