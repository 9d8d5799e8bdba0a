//! Development server support.
//!
//! The [`DevController`] keeps the plugin context in step with the
//! filesystem: it recomputes the context when routes or the config file
//! change, invalidates the context-derived virtual modules when the result
//! differs, and pushes route metadata to the browser over an [`HmrChannel`].
//! Hosts feed it [`FsEvent`]s from their own watcher or from [`FileWatcher`].

pub mod controller;
pub mod hmr;
pub mod watcher;

pub use controller::{ControllerState, DevController, UpdateOutcome};
pub use hmr::{BroadcastHmrChannel, HMR_EVENT, HmrChannel, HmrEvent};
pub use watcher::FileWatcher;

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsEventKind {
    Add,
    Change,
    Unlink,
}

/// A filesystem change reported by the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub kind: FsEventKind,
    pub path: PathBuf,
}

impl FsEvent {
    pub fn new(kind: FsEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    pub fn add(path: impl Into<PathBuf>) -> Self {
        Self::new(FsEventKind::Add, path)
    }

    pub fn change(path: impl Into<PathBuf>) -> Self {
        Self::new(FsEventKind::Change, path)
    }

    pub fn unlink(path: impl Into<PathBuf>) -> Self {
        Self::new(FsEventKind::Unlink, path)
    }
}

/// The bundler's module graph, as far as the controller needs it.
pub trait ModuleGraph: Send + Sync {
    /// Drop the cached module so the next request loads it again.
    fn invalidate(&self, id: &str);
}
