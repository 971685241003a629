mod cli;

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use shader_edit::config::EditorConfig;
use shader_edit::editor::Workspace;
use shader_edit::project::{EchoCompiler, ProjectHandle, ShaderProject};
use shader_edit::tracker::FileTracker;
use shader_edit::tracker::index::PassFileIndex;
use shader_edit::tracker::watchset::WatchSet;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Passes { project, json } => {
            let project = ShaderProject::load(&project)?;
            print_passes(&project, json);
        }
        Commands::Watch {
            project,
            duration,
            recompile,
            poll,
        } => {
            let loaded = ShaderProject::load(&project)?;
            let root = loaded
                .root()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| ".".into());
            let config = EditorConfig::load(&root);

            let mut tracker_config = config.tracker.clone();
            tracker_config.force_poll |= poll;
            if !tracker_config.enabled {
                eprintln!(
                    "warning: file change tracking is disabled in shader-edit.toml; watching anyway"
                );
            }
            let mut prefs = config.editor.clone();
            prefs.recompile_on_change |= recompile;

            let handle = ProjectHandle::new(loaded);
            let mut tracker = FileTracker::new(handle.clone(), tracker_config);
            let mut workspace = Workspace::new(handle, prefs, Box::new(EchoCompiler));

            tracker.set_tracking(true);
            println!(
                "watching {} (edit shader sources to see notifications)",
                project.display()
            );

            let started = Instant::now();
            loop {
                thread::sleep(Duration::from_millis(100));
                for pass in workspace.tick(&tracker) {
                    println!("changed: {pass}");
                }
                if let Some(secs) = duration
                    && started.elapsed() >= Duration::from_secs(secs)
                {
                    break;
                }
            }
            tracker.set_tracking(false);
        }
    }

    Ok(())
}

fn print_passes(project: &ShaderProject, json: bool) {
    let index = PassFileIndex::build(&project.passes, &|stored| project.resolve(stored));
    let watch_set = WatchSet::build(&index);

    if json {
        let roots: Vec<_> = watch_set
            .roots
            .iter()
            .map(|r| {
                serde_json::json!({
                    "dir": r.dir,
                    "files": r.files.len(),
                })
            })
            .collect();
        let out = serde_json::json!({
            "name": project.name,
            "passes": project.passes,
            "watch_roots": roots,
        });
        println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
        return;
    }

    println!(
        "Project: {} ({} pass(es))",
        project.name.as_deref().unwrap_or("unnamed"),
        project.passes.len()
    );
    for pass in &project.passes {
        println!();
        println!("{}", pass.name);
        println!("  VS {}", pass.vs);
        println!("  FS {}", pass.fs);
        if let Some(gs) = &pass.gs {
            let suffix = if pass.geometry_active() { "" } else { " (off)" };
            println!("  GS {gs}{suffix}");
        }
    }

    println!();
    println!("Watching {} director(ies):", watch_set.len());
    for root in &watch_set.roots {
        println!("  {} ({} file(s))", root.dir.display(), root.files.len());
    }
}
