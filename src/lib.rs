//! Editor core for shader pipeline projects.
//!
//! A project is a collection of named passes, each referencing up to three
//! shader source files (vertex, fragment, optional geometry). This crate
//! provides the pieces an editor UI builds on:
//!
//! - [`project`]: the project model and the seams to external services
//!   (pipeline snapshots, path resolution, the compile service).
//! - [`editor`]: per-file edit panels with open/focus dedupe, dirty tracking,
//!   save and compile triggers, and the per-tick policy for externally
//!   changed files.
//! - [`tracker`]: the background file-change tracker. It derives the watched
//!   file set from the pass list, monitors a minimal set of directories, and
//!   maps raw filesystem events back to pass names.
//! - [`config`]: `shader-edit.toml` settings.
//!
//! Rendering, the text-editing widget itself, and shader compilation are all
//! outside this crate; they plug in through the traits in [`project`].

pub mod config;
pub mod editor;
pub mod project;
pub mod tracker;
