//! Watch event types and translation from raw notify events.

use std::fmt;
use std::path::PathBuf;

use notify::EventKind;
use notify::event::ModifyKind;

use crate::utils::path::normalize_path;

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchKind {
    Created,
    Modified,
    Deleted,
    Moved,
}

impl WatchKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Moved => "moved",
        }
    }
}

/// A single filesystem change, consumed once by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: WatchKind,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: WatchKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

impl fmt::Display for WatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.path.display())
    }
}

/// Map a notify event kind onto a [`WatchKind`].
///
/// Metadata-only changes (mtime/atime/chmod) and access events are dropped.
pub fn classify(kind: &EventKind) -> Option<WatchKind> {
    match kind {
        EventKind::Create(_) => Some(WatchKind::Created),
        EventKind::Remove(_) => Some(WatchKind::Deleted),
        EventKind::Modify(ModifyKind::Name(_)) => Some(WatchKind::Moved),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(WatchKind::Modified),
        _ => None,
    }
}

/// Translate one raw notify event into watch events, one per path.
pub fn translate(event: &notify::Event) -> Vec<WatchEvent> {
    let Some(kind) = classify(&event.kind) else {
        return Vec::new();
    };
    event
        .paths
        .iter()
        .map(|path| WatchEvent::new(normalize_path(path), kind))
        .collect()
}
