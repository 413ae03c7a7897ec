use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use crate::buffer::DEFAULT_CAPACITY;
use crate::matcher::CaseMode;
use crate::session::SessionOptions;

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub case_insensitive: bool,
    #[serde(default, deserialize_with = "deserialize_prompt")]
    pub prompt: Option<String>,
    #[serde(default)]
    pub bar: BarPosition,
    #[serde(default)]
    pub lines: usize,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            prompt: None,
            bar: BarPosition::default(),
            lines: 0,
            capacity: default_capacity(),
            log: LogConfig::default(),
        }
    }
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BarPosition {
    #[default]
    Inline,
    Top,
    Bottom,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PromptConfig {
    Enabled(bool),
    Text(String),
}

/// `prompt = false` and `prompt = ""` both mean no prompt label. `true` carries
/// no text to show, so it is rejected.
fn deserialize_prompt<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<PromptConfig>::deserialize(deserializer)? {
        Some(PromptConfig::Enabled(true)) => Err(D::Error::custom(
            "prompt = true has no label; give the prompt text or false",
        )),
        Some(PromptConfig::Text(text)) if !text.is_empty() => Ok(Some(text)),
        _ => Ok(None),
    }
}

/// Values given on the command line; each one wins over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub case_insensitive: bool,
    pub prompt: Option<String>,
    pub bar: Option<BarPosition>,
    pub lines: Option<usize>,
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn apply(mut self, overrides: Overrides) -> Self {
        self.case_insensitive |= overrides.case_insensitive;
        if let Some(prompt) = overrides.prompt {
            self.prompt = Some(prompt);
        }
        if let Some(bar) = overrides.bar {
            self.bar = bar;
        }
        if let Some(lines) = overrides.lines {
            self.lines = lines;
        }
        if let Some(file) = overrides.log_file {
            self.log.file = Some(file);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            bail!("capacity must be at least 1 byte");
        }
        Ok(())
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            case: if self.case_insensitive {
                CaseMode::Insensitive
            } else {
                CaseMode::Sensitive
            },
            prompt: self.prompt.clone(),
            lines: self.lines,
            capacity: self.capacity,
        }
    }
}

/// Resolves the config file: `explicit_path` when given, otherwise the first
/// existing discovery candidate, otherwise built-in defaults.
pub fn load(cwd: &Path, explicit_path: Option<&Path>) -> Result<LoadedConfig> {
    let path = match explicit_path {
        Some(path) => Some(path.to_path_buf()),
        None => discovery_candidates(cwd)
            .into_iter()
            .find(|candidate| candidate.exists()),
    };
    let config = match path.as_deref() {
        Some(path) => load_from_path(path)?,
        None => Config::default(),
    };
    Ok(LoadedConfig { config, path })
}

fn discovery_candidates(cwd: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![cwd.join("linepick.toml"), cwd.join(".linepick.toml")];
    if let Ok(global_path) = global_config_path() {
        candidates.push(global_path);
    }
    candidates
}

pub fn global_config_path() -> Result<PathBuf> {
    let config_root = dirs::config_dir().context("unable to resolve OS config directory")?;
    Ok(config_root.join("linepick").join("config.toml"))
}

pub fn write_example_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn load_from_path(path: &Path) -> Result<Config> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
}

const EXAMPLE_CONFIG: &str = r#"# linepick config
#
# Every key is optional. Command-line flags win over this file.

# Match case-insensitively (same as -i).
case_insensitive = false

# Label drawn before the query (same as -p). Use false to disable.
# prompt = "run:"

# Where the picker is drawn: "inline", "top" or "bottom" (same as -t / -b).
bar = "inline"

# Number of vertical list rows; 0 keeps everything on one line (same as -l).
lines = 0

# Maximum query length in bytes.
capacity = 8191

[log]
# Diagnostics go to this file; nothing is logged when it is unset.
# file = "/tmp/linepick.log"
# Filter used when LINEPICK_LOG is not set.
level = "info"
"#;
