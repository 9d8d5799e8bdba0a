//! `notify` adapter producing [`FsEvent`]s for hosts without a watcher.
//!
//! Watches the project root recursively, skipping hidden paths (except the
//! `.server` and `.client` directories routes may import from) and the
//! configured ignore patterns.

use super::{FsEvent, FsEventKind};
use crate::error::{Error, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Default patterns skipped by [`FileWatcher`].
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &["node_modules", "build", "*.log"];

const MARKER_DIRECTORIES: &[&str] = &[".server", ".client"];

/// Recursive watcher forwarding changes over a tokio channel.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `root`.
    ///
    /// Repeated events for the same path within `debounce_ms` are dropped.
    pub fn new(
        root: PathBuf,
        ignore_patterns: Vec<String>,
        debounce_ms: u64,
    ) -> Result<(Self, mpsc::Receiver<FsEvent>)> {
        if !root.is_dir() {
            return Err(Error::io(
                &root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "watch root is not a directory"),
            ));
        }

        let (tx, rx) = mpsc::channel(100);
        let debounce = Duration::from_millis(debounce_ms);
        let mut last_event: Option<(PathBuf, FsEventKind, Instant)> = None;
        let watch_root = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else {
                return;
            };
            for (kind, path) in classify(&event) {
                if should_ignore(&path, &watch_root, &ignore_patterns) {
                    continue;
                }

                let now = Instant::now();
                if let Some((last_path, last_kind, at)) = &last_event {
                    if *last_path == path && *last_kind == kind && now.duration_since(*at) < debounce {
                        continue;
                    }
                }
                last_event = Some((path.clone(), kind, now));

                if tx.blocking_send(FsEvent::new(kind, path)).is_err() {
                    return;
                }
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        tracing::debug!(root = %root.display(), "watching for file changes");

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher").field("root", &self.root).finish_non_exhaustive()
    }
}

/// Split a notify event into per-path changes.
///
/// A rename with both ends becomes an unlink of the old path and an add of
/// the new one. Backends that cannot tell the ends apart report
/// `RenameMode::Any`, so each path is classified by whether it exists now.
fn classify(event: &Event) -> Vec<(FsEventKind, PathBuf)> {
    match event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => vec![
            (FsEventKind::Unlink, event.paths[0].clone()),
            (FsEventKind::Add, event.paths[1].clone()),
        ],
        EventKind::Modify(ModifyKind::Name(RenameMode::Any | RenameMode::Other)) => event
            .paths
            .iter()
            .map(|path| {
                let kind = if path.exists() {
                    FsEventKind::Add
                } else {
                    FsEventKind::Unlink
                };
                (kind, path.clone())
            })
            .collect(),
        _ => match event_kind(&event.kind) {
            Some(kind) => event.paths.iter().map(|path| (kind, path.clone())).collect(),
            None => Vec::new(),
        },
    }
}

fn event_kind(kind: &EventKind) -> Option<FsEventKind> {
    match kind {
        EventKind::Create(_) => Some(FsEventKind::Add),
        EventKind::Remove(_) => Some(FsEventKind::Unlink),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(FsEventKind::Unlink),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(FsEventKind::Add),
        EventKind::Modify(_) => Some(FsEventKind::Change),
        _ => None,
    }
}

fn should_ignore(path: &Path, root: &Path, ignore_patterns: &[String]) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return true;
    };
    let relative_str = relative.to_string_lossy().replace('\\', "/");

    for pattern in ignore_patterns {
        if let Some(ext) = pattern.strip_prefix('*') {
            if relative_str.ends_with(ext) {
                return true;
            }
        } else if relative_str == *pattern
            || relative_str.starts_with(&format!("{}/", pattern))
            || relative_str.contains(&format!("/{}/", pattern))
        {
            return true;
        }
    }

    relative.components().any(|component| {
        let name = component.as_os_str().to_string_lossy();
        name.starts_with('.')
            && name != "."
            && name != ".."
            && !MARKER_DIRECTORIES.contains(&&*name)
    })
}
