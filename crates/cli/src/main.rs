// vgcache - replay viewport cache event logs headlessly
//
// Output is always a single JSON value on stdout; diagnostics go to stderr
// (set RUST_LOG=debug to see every merge).

mod exit_codes;
mod replay;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;

use viewgrid_config::CacheSettings;
use viewgrid_core::Selection;
use viewgrid_engine::{CacheOptions, Dimensions, UrlRules};

use exit_codes::{EXIT_ERROR, EXIT_IO, EXIT_PARSE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "vgcache")]
#[command(about = "Replay spreadsheet viewport events and inspect the cache")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an event log and print the resulting cache snapshot
    #[command(after_help = "\
Examples:
  vgcache replay session.jsonl
  vgcache replay session.jsonl --selection B2:C9
  vgcache replay session.jsonl --query Revenue --query A:A --pretty")]
    Replay {
        /// JSONL file with one event per line
        log: PathBuf,

        /// Select this reference after replaying (overrides the log)
        #[arg(long, value_name = "REF")]
        selection: Option<String>,

        /// Report labels, mappings and cells for a reference. Repeatable.
        #[arg(long, value_name = "REF")]
        query: Vec<String>,
    },

    /// Replay an event log and show how a label resolves
    Resolve {
        /// JSONL file with one event per line
        log: PathBuf,

        /// Label to resolve
        label: String,
    },

    /// Show effective settings, or write a default settings file
    Config {
        /// Write the commented default file if none exists
        #[arg(long)]
        init: bool,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Replay { log, selection, query } => {
            load_settings(cli.config.as_ref()).and_then(|settings| cmd_replay(&settings, log, selection, query, cli.pretty))
        }
        Commands::Resolve { log, label } => {
            load_settings(cli.config.as_ref()).and_then(|settings| cmd_resolve(&settings, log, &label, cli.pretty))
        }
        Commands::Config { init } => cmd_config(cli.config, init, cli.pretty),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<viewgrid_config::ConfigError> for CliError {
    fn from(err: viewgrid_config::ConfigError) -> Self {
        use viewgrid_config::ConfigError;
        match err {
            ConfigError::Io { .. } => CliError::io(err.to_string()),
            ConfigError::Parse { .. } | ConfigError::Invalid { .. } => CliError::parse(err.to_string()),
        }
    }
}

// ============================================================================
// Settings
// ============================================================================

/// An explicit `--config` must load; the default location falls back quietly.
fn load_settings(path: Option<&PathBuf>) -> Result<CacheSettings, CliError> {
    match path {
        Some(path) => Ok(CacheSettings::load_from(path)?),
        None => Ok(CacheSettings::load()),
    }
}

fn cache_options(settings: &CacheSettings) -> CacheOptions {
    CacheOptions {
        dimensions: Dimensions {
            column_width: settings.default_column_width,
            row_height: settings.default_row_height,
        },
        url_rules: UrlRules {
            wildcard_segment: settings.wildcard_segment.clone(),
            spreadsheet_segment: settings.spreadsheet_segment.clone(),
            cell_segment: settings.cell_segment.clone(),
            label_segment: settings.label_segment.clone(),
        },
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| CliError::general(e.to_string()))?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", json).map_err(|e| CliError::io(e.to_string()))
}

// ============================================================================
// replay
// ============================================================================

fn cmd_replay(
    settings: &CacheSettings,
    log: PathBuf,
    selection: Option<String>,
    queries: Vec<String>,
    pretty: bool,
) -> Result<(), CliError> {
    let events = replay::read_events(&log)?;
    let count = events.len();
    let mut cache = replay::replay(events, cache_options(settings));

    if let Some(text) = selection {
        let selection = text
            .parse::<Selection>()
            .map_err(|e| CliError::args(format!("--selection {text:?}: {e}")))?;
        cache.set_selection(Some(selection));
    }

    let queries = queries
        .iter()
        .map(|q| replay::query(&cache, q))
        .collect::<Result<Vec<_>, _>>()?;

    let report = replay::ReplayReport {
        events: count,
        snapshot: cache.snapshot(),
        queries,
    };
    print_json(&report, pretty)
}

// ============================================================================
// resolve
// ============================================================================

fn cmd_resolve(settings: &CacheSettings, log: PathBuf, label: &str, pretty: bool) -> Result<(), CliError> {
    let events = replay::read_events(&log)?;
    let cache = replay::replay(events, cache_options(settings));
    let resolution = replay::resolve(&cache, label)?;
    print_json(&resolution, pretty)
}

// ============================================================================
// config
// ============================================================================

#[derive(Serialize)]
struct ConfigReport {
    path: String,
    exists: bool,
    written: bool,
    settings: CacheSettings,
}

fn cmd_config(path: Option<PathBuf>, init: bool, pretty: bool) -> Result<(), CliError> {
    let explicit = path.is_some();
    let path = path.unwrap_or_else(CacheSettings::config_path);

    let written = if init { CacheSettings::write_default_file(&path)? } else { false };
    let exists = path.exists();
    let settings = if exists || explicit {
        CacheSettings::load_from(&path)?
    } else {
        CacheSettings::default()
    };

    print_json(
        &ConfigReport {
            path: path.to_string_lossy().to_string(),
            exists,
            written,
            settings,
        },
        pretty,
    )
}
