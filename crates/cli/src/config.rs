// ==============================================================================
// basedtyping.toml Configuration
// ==============================================================================
//
// Discovers and loads `basedtyping.toml` files. Command line flags override
// anything set here.
//
// Example basedtyping.toml:
//
// ```toml
// mode = "user-initiated"
// extension = true
// ```

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use py_check::EvalMode;
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE: &str = "basedtyping.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    #[default]
    CodeAnalysis,
    UserInitiated,
}

impl From<Mode> for EvalMode {
    fn from(value: Mode) -> Self {
        match value {
            Mode::CodeAnalysis => EvalMode::CodeAnalysis,
            Mode::UserInitiated => EvalMode::UserInitiated,
        }
    }
}

/// Top-level `basedtyping.toml` configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BasedTypingConfig {
    /// Evaluation mode types are revealed under.
    pub mode: Mode,

    /// Whether the extension's provider is installed. Turning it off shows
    /// what the plain engine infers.
    pub extension: bool,
}

impl Default for BasedTypingConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            extension: true,
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("could not read {}", .path.display())]
    #[diagnostic(code(based_typing::config::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {}", .path.display())]
    #[diagnostic(code(based_typing::config::parse), help("expected `mode` and `extension` keys only"))]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Walk up from `start_dir` looking for `basedtyping.toml`. Returns the first
/// match.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let mut dir = start_dir;
    loop {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
}

/// Read and parse a `basedtyping.toml` file.
pub fn load_config(path: &Path) -> Result<BasedTypingConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
