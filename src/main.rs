mod app;
mod buffer;
mod config;
mod input;
mod matcher;
mod model;
mod session;
mod viewport;

use std::env;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{BarPosition, LogConfig, Overrides};
use model::Catalog;
use session::Outcome;

const LOG_ENV: &str = "LINEPICK_LOG";

#[derive(Debug, Parser)]
#[command(
    name = "linepick",
    version,
    about = "Pick one line from stdin with an incremental filter"
)]
struct Cli {
    /// Match case-insensitively
    #[arg(short = 'i', long)]
    case_insensitive: bool,

    /// Draw the picker on the top rows of the terminal
    #[arg(short = 't', long, conflicts_with = "bottom")]
    top: bool,

    /// Draw the picker on the bottom rows of the terminal
    #[arg(short = 'b', long)]
    bottom: bool,

    /// Label shown before the query
    #[arg(short = 'p', long)]
    prompt: Option<String>,

    /// List matches vertically in this many rows
    #[arg(short = 'l', long)]
    lines: Option<usize>,

    /// Override config path. If omitted, linepick checks ./linepick.toml, ./.linepick.toml, and then ~/.config/linepick/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write diagnostics to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Write an example config to the global config path (or --config) and exit
    #[arg(long)]
    init_config: bool,

    /// Overwrite an existing file with --init-config
    #[arg(long, requires = "init_config")]
    force: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        let bar = if self.top {
            Some(BarPosition::Top)
        } else if self.bottom {
            Some(BarPosition::Bottom)
        } else {
            None
        };
        Overrides {
            case_insensitive: self.case_insensitive,
            prompt: self.prompt.clone(),
            bar,
            lines: self.lines,
            log_file: self.log_file.clone(),
        }
    }
}

fn main() {
    match run() {
        Ok(Some(Outcome::Accepted(text))) => println!("{text}"),
        Ok(Some(Outcome::Cancelled)) => process::exit(1),
        Ok(None) => {}
        Err(err) => {
            eprintln!("error: {err:#}");
            process::exit(1);
        }
    }
}

/// `None` when the invocation did not run a picker session.
fn run() -> Result<Option<Outcome>> {
    let cli = Cli::parse();

    if cli.init_config {
        let path = match cli.config.clone() {
            Some(path) => path,
            None => config::global_config_path()?,
        };
        config::write_example_config(&path, cli.force)?;
        eprintln!("wrote {}", path.display());
        return Ok(None);
    }

    let cwd = env::current_dir()?;
    let loaded = config::load(&cwd, cli.config.as_deref())?;
    let config = loaded.config.apply(cli.overrides());
    config.validate()?;
    init_logging(&config.log)?;
    if let Some(path) = loaded.path.as_deref() {
        info!(path = %path.display(), "loaded config");
    }

    let catalog = Catalog::read_from(io::stdin().lock())?;
    info!(items = catalog.len(), "read candidates");

    app::run_tui(catalog, config.session_options(), config.bar).map(Some)
}

/// Installs a file-backed subscriber. Without a log file nothing is installed,
/// so the terminal never sees diagnostics.
fn init_logging(log: &LogConfig) -> Result<()> {
    let Some(path) = log.file.as_deref() else {
        return Ok(());
    };
    let file = open_log_file(path)?;
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&log.level))
        .with_context(|| format!("invalid log level {:?}", log.level))?;

    // A subscriber installed by an embedding test harness is left alone.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init();
    Ok(())
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}
