mod config;
mod reveal;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{Diagnostic, NamedSource, Report};
use thiserror::Error;

use crate::config::{find_config, load_config, BasedTypingConfig, ConfigError, Mode};
use crate::reveal::{reveal, RevealOptions};

#[derive(Parser, Debug)]
#[command(author, version, about = "Reveal the types the basedtyping rules infer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the type of every assignment target and function in a file
    Reveal {
        /// Python file to analyse
        file: PathBuf,

        /// Only print these declarations (repeatable)
        #[arg(long = "name", value_name = "NAME")]
        names: Vec<String>,

        /// Evaluation mode, overrides basedtyping.toml
        #[arg(long, value_enum)]
        mode: Option<Mode>,

        /// Show plain engine results without the extension
        #[arg(long)]
        no_extension: bool,

        /// Explicit basedtyping.toml instead of searching upwards from FILE
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Error, Diagnostic)]
enum CliError {
    #[error("could not read {}", .path.display())]
    #[diagnostic(code(based_typing::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

/// An explicit `--config` must load; a discovered one that fails is reported
/// and ignored.
fn resolve_config(file: &Path, explicit: Option<&Path>) -> Result<BasedTypingConfig, CliError> {
    if let Some(path) = explicit {
        return Ok(load_config(path)?);
    }

    let start = file
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let start = std::fs::canonicalize(start).unwrap_or_else(|_| start.to_path_buf());
    let Some(path) = find_config(&start) else {
        return Ok(BasedTypingConfig::default());
    };

    log::debug!("using {}", path.display());
    match load_config(&path) {
        Ok(config) => Ok(config),
        Err(err) => {
            log::warn!("ignoring {}: {err}", path.display());
            Ok(BasedTypingConfig::default())
        }
    }
}

fn run_reveal(
    file: PathBuf,
    names: Vec<String>,
    mode: Option<Mode>,
    no_extension: bool,
    config: Option<PathBuf>,
) -> miette::Result<()> {
    let settings = resolve_config(&file, config.as_deref())?;
    let source = std::fs::read_to_string(&file).map_err(|source| CliError::Read {
        path: file.clone(),
        source,
    })?;

    let options = RevealOptions {
        names,
        mode: mode.unwrap_or(settings.mode).into(),
        extension: settings.extension && !no_extension,
    };

    match reveal(&source, &options) {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            Ok(())
        }
        Err(err) => Err(Report::new(err)
            .with_source_code(NamedSource::new(file.display().to_string(), source))),
    }
}

fn main() -> miette::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Reveal {
            file,
            names,
            mode,
            no_extension,
            config,
        } => run_reveal(file, names, mode, no_extension, config),
    }
}
