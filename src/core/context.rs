//! Identity of the running application.

use std::path::PathBuf;

use super::Mode;

/// Resolved once at startup and shared read-only for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppContext {
    /// Working directory the server was started in (absolute).
    pub directory: PathBuf,
    /// Application name, the directory's base name unless configured.
    pub name: String,
    /// Absolute, normalized path of the application source file.
    pub source_path: PathBuf,
    /// HTTP port the publisher listens on.
    pub port: u16,
    pub mode: Mode,
}

impl AppContext {
    /// Source file name used in log lines and Lua chunk names.
    pub fn source_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }

    /// Document id shared by every Document this application produces.
    ///
    /// Stable across reloads so browser links survive them.
    pub fn docid(&self) -> String {
        let id: String = self
            .name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
            .collect();
        if id.is_empty() { "app".to_string() } else { id }
    }
}

#[cfg(test)]
pub(crate) fn test_context(dir: &std::path::Path, mode: Mode) -> AppContext {
    AppContext {
        directory: dir.to_path_buf(),
        name: "demo".into(),
        source_path: dir.join("doc.lua"),
        port: 5006,
        mode,
    }
}
