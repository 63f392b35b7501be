//! File watcher for the to-do file.
//!
//! Editors often save by writing a temporary file and renaming it over the
//! old one, which replaces the inode. The watcher therefore subscribes to
//! the parent directory (non-recursive) and filters events down to the
//! to-do file's name.
//!
//! The notify callback only classifies events and forwards them with
//! `try_send`; debouncing and rendering happen on the receiving side.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use notify::event::{CreateKind, ModifyKind};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

/// Events emitted by the file watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// The to-do file was created, written, or replaced.
    TodoChanged(PathBuf),
}

/// Errors that can occur while setting up the watcher.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Failed to initialize the file system watcher.
    #[error("failed to create watcher: {0}")]
    WatcherInit(#[from] notify::Error),

    /// The directory containing the to-do file does not exist.
    #[error("watch directory does not exist: {0}")]
    DirectoryNotFound(PathBuf),

    /// The watched path has no file name component.
    #[error("not a file path: {0}")]
    InvalidPath(PathBuf),
}

/// Result type for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Watches a single file for changes.
#[derive(Debug)]
pub struct FileWatcher {
    /// Dropping this stops the subscription.
    #[allow(dead_code)]
    watcher: RecommendedWatcher,

    /// The file being watched.
    path: PathBuf,
}

impl FileWatcher {
    /// Starts watching `path`, sending a [`WatchEvent`] on every change.
    ///
    /// The file itself does not have to exist yet, but its directory does.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory is missing or the platform
    /// watcher cannot be initialized.
    pub fn new(path: PathBuf, event_sender: mpsc::Sender<WatchEvent>) -> Result<Self> {
        let file_name = path
            .file_name()
            .map(OsString::from)
            .ok_or_else(|| WatcherError::InvalidPath(path.clone()))?;
        let watch_dir = match path.parent() {
            Some(dir) if dir.as_os_str().is_empty() => PathBuf::from("."),
            Some(dir) => dir.to_path_buf(),
            None => return Err(WatcherError::InvalidPath(path.clone())),
        };

        if !watch_dir.is_dir() {
            return Err(WatcherError::DirectoryNotFound(watch_dir));
        }

        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| {
                handle_notify_event(res, &file_name, &event_sender);
            },
            Config::default(),
        )?;
        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

        info!(
            path = %path.display(),
            watch_dir = %watch_dir.display(),
            "Watching to-do file"
        );

        Ok(Self { watcher, path })
    }

    /// Returns the file being watched.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn handle_notify_event(
    res: std::result::Result<Event, notify::Error>,
    file_name: &OsString,
    sender: &mpsc::Sender<WatchEvent>,
) {
    let event = match res {
        Ok(event) => event,
        Err(e) => {
            error!(error = %e, "File watcher error");
            return;
        }
    };

    trace!(kind = ?event.kind, paths = ?event.paths, "Received notify event");

    if let Some(path) = classify(&event, file_name) {
        debug!(path = %path.display(), "To-do file changed");
        // Never block the notify thread; a full channel already has a
        // pending change queued.
        if let Err(e) = sender.try_send(WatchEvent::TodoChanged(path)) {
            warn!(error = %e, "Failed to queue change event");
        }
    }
}

/// Returns the changed path if `event` concerns the watched file.
fn classify(event: &Event, file_name: &OsString) -> Option<PathBuf> {
    let relevant = matches!(
        event.kind,
        EventKind::Create(CreateKind::File | CreateKind::Any)
            | EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Name(_) | ModifyKind::Any)
    );
    if !relevant {
        return None;
    }

    event
        .paths
        .iter()
        .find(|p| p.file_name() == Some(file_name.as_os_str()))
        .cloned()
}
