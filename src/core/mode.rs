//! Server mode selected on the command line.

use std::fmt;

/// Whether source changes are reloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `livedoc develop`: the reload state machine is active.
    Develop,
    /// `livedoc run`: the watcher runs but every event is discarded.
    Run,
}

impl Mode {
    /// Check if this is development mode.
    #[inline]
    pub const fn is_develop(self) -> bool {
        matches!(self, Self::Develop)
    }

    /// Short name exposed to application scripts.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Develop => "develop",
            Self::Run => "run",
        }
    }

    /// Human label for the startup banner.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Develop => "development",
            Self::Run => "production",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
