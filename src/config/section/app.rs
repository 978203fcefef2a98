//! `[app]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [app]
//! source = "doc.lua"    # Source file inside the working directory
//! name = "sliders"      # Overrides the directory-derived name
//! ```

use serde::{Deserialize, Serialize};

/// Default application source file name.
pub const DEFAULT_SOURCE: &str = "doc.lua";

/// Application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// Source file name, relative to the working directory.
    pub source: String,

    /// Application name. `None` means the directory's base name.
    pub name: Option<String>,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            name: None,
        }
    }
}
