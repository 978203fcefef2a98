//! Load failure type.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Position in the application source a failure points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A failed load, carrying the full human-readable trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
        }
    }

    /// The source file could not be read.
    pub fn io(path: &Path, err: &std::io::Error) -> Self {
        Self::new(format!("failed to read {}: {}", path.display(), err))
    }

    /// Convert an interpreter error, locating the first reference to `chunk`.
    pub fn from_lua(err: &mlua::Error, chunk: &str) -> Self {
        let message = err.to_string();
        let location = locate(&message, chunk);
        Self { message, location }
    }

    /// Execution panicked inside a native callback.
    pub fn panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self::new(format!("panic while executing source: {detail}"))
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for LoadError {}

/// `<file>:<line>:` as Lua prints positions.
static POSITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^ \t\r\n:\[\]]+):([0-9]+):").expect("valid position regex"));

/// Find the first `chunk:line:` position in a trace.
fn locate(message: &str, chunk: &str) -> Option<SourceLocation> {
    POSITION
        .captures_iter(message)
        .filter(|caps| &caps[1] == chunk)
        .find_map(|caps| {
            let line = caps[2].parse().ok()?;
            Some(SourceLocation {
                file: chunk.to_string(),
                line,
            })
        })
}
