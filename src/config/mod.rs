//! Application configuration for `livedoc.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── app        # [app]
//! │   └── serve      # [serve]
//! ├── types/         # Utility types
//! │   └── error      # ConfigError
//! └── mod.rs         # AppConfig (this file)
//! ```
//!
//! The file is optional. Values are resolved as CLI flag > config file >
//! built-in default.

pub mod section;
pub mod types;

pub use section::{AppSection, DEFAULT_PORT, DEFAULT_SOURCE, ServeConfig};
pub use types::ConfigError;

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::ServeArgs;
use crate::core::{AppContext, Mode};
use crate::log;
use crate::utils::path::normalize_path;

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing livedoc.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Absolute path to the config file, whether or not it exists
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Working directory the application lives in
    #[serde(skip)]
    pub root: PathBuf,

    /// Application settings
    #[serde(default)]
    pub app: AppSection,

    /// Publisher settings
    #[serde(default)]
    pub serve: ServeConfig,
}

impl AppConfig {
    /// Load configuration for the current working directory.
    pub fn load(config: &Path, args: &ServeArgs) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        Self::load_in(&cwd, config, args)
    }

    /// Load configuration rooted at `root`, then apply CLI overrides.
    pub fn load_in(root: &Path, config: &Path, args: &ServeArgs) -> Result<Self> {
        let config_path = root.join(config);

        let mut loaded = if config_path.is_file() {
            Self::from_path(&config_path)?
        } else {
            crate::debug!("config"; "{} not found, using defaults", config_path.display());
            Self::default()
        };

        loaded.config_path = config_path;
        loaded.root = normalize_path(root);
        loaded.apply_serve_args(args);
        loaded.validate()?;
        Ok(loaded)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::from)?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    // ========================================================================
    // CLI options
    // ========================================================================

    /// Apply serve command options.
    fn apply_serve_args(&mut self, args: &ServeArgs) {
        Self::update_option(&mut self.serve.interface, args.interface.as_ref());
        Self::update_option(&mut self.serve.port, args.port.as_ref());
        if args.no_open {
            self.serve.open = false;
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    fn validate(&self) -> Result<(), ConfigError> {
        let source = Path::new(&self.app.source);
        let mut components = source.components();
        let plain_name = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !plain_name {
            return Err(ConfigError::Validation(format!(
                "app.source must be a file name inside the working directory, got `{}`",
                self.app.source
            )));
        }

        if let Some(name) = &self.app.name
            && name.trim().is_empty()
        {
            return Err(ConfigError::Validation("app.name must not be empty".into()));
        }

        if self.serve.port != 0 && self.serve.websocket_port() == self.serve.port {
            return Err(ConfigError::Validation(format!(
                "serve.ws_port must differ from serve.port ({})",
                self.serve.port
            )));
        }

        Ok(())
    }

    // ========================================================================
    // application context
    // ========================================================================

    /// Resolve the application identity.
    ///
    /// Fails with [`ConfigError::MissingSource`] when the source file is not
    /// in the working directory.
    pub fn resolve_context(&self, mode: Mode) -> Result<AppContext, ConfigError> {
        let source = self.root.join(&self.app.source);
        if !source.is_file() {
            return Err(ConfigError::MissingSource {
                file: self.app.source.clone(),
                dir: self.root.clone(),
            });
        }

        let name = self.app.name.clone().unwrap_or_else(|| {
            self.root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "app".to_string())
        });

        Ok(AppContext {
            directory: self.root.clone(),
            name,
            source_path: normalize_path(&source),
            port: self.serve.port,
            mode,
        })
    }
}

/// Parse config and reject unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> AppConfig {
    let (parsed, ignored) = AppConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
