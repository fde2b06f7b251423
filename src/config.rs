//! Configuration management for Fanout.
//!
//! Settings arrive from four layers with a fixed precedence: compiled-in
//! defaults, a `KEY=VALUE` config file, the inherited process environment,
//! and explicit CLI flags (strongest). The `Overlay` resolves each key once
//! at startup; nothing re-reads the environment after that.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::worker::ArgTemplate;

/// Fully resolved run configuration.
///
/// Built once from defaults, config file, environment, and CLI flags, in
/// that precedence order; immutable for the rest of the run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub mode: Mode,
    pub backend: Backend,
    pub keep_open: bool,
    /// Flat worker count, if given directly.
    pub count: Option<usize>,
    /// Window/pane layout pair, if given.
    pub windows: Option<usize>,
    pub panes: Option<usize>,
    /// Launcher tokens, already split and alias-resolved.
    pub launcher: Vec<String>,
    pub script: Option<String>,
    pub title_prefix: String,
    pub log_dir: String,
    pub workdir: String,
    pub split: SplitDirection,
    pub encoding: String,
    /// Delay between background spawns, milliseconds.
    pub spawn_delay_ms: u64,
    /// Extra worker arguments with `${i}` placeholders.
    pub extras: Vec<ArgTemplate>,
}

/// Run mode: visible terminal surfaces or a flat background pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Terminal,
    Background,
}

/// Terminal backend used in terminal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Tmux,
}

impl Backend {
    /// Executable the batched session command is handed to.
    pub fn program(self) -> &'static str {
        match self {
            Backend::Tmux => "tmux",
        }
    }
}

/// Direction a pane split grows in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitDirection {
    Horizontal,
    Vertical,
}

impl SplitDirection {
    /// The tmux `split-window` flag for this direction.
    pub fn tmux_flag(self) -> &'static str {
        match self {
            SplitDirection::Horizontal => "-h",
            SplitDirection::Vertical => "-v",
        }
    }
}

pub fn parse_mode(value: &str) -> Result<Mode> {
    match value.to_lowercase().as_str() {
        "terminal" => Ok(Mode::Terminal),
        "background" => Ok(Mode::Background),
        _ => Err(anyhow!("invalid mode: {}", value)),
    }
}

pub fn parse_backend(value: &str) -> Result<Backend> {
    match value.to_lowercase().as_str() {
        "tmux" => Ok(Backend::Tmux),
        _ => Err(anyhow!("invalid terminal backend: {}", value)),
    }
}

pub fn parse_split(value: &str) -> Result<SplitDirection> {
    match value.to_lowercase().as_str() {
        "h" | "horizontal" => Ok(SplitDirection::Horizontal),
        "v" | "vertical" => Ok(SplitDirection::Vertical),
        _ => Err(anyhow!("invalid split direction: {}", value)),
    }
}

pub fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("invalid boolean: {}", value)),
    }
}

/// Layered setting resolver.
///
/// Holds the parsed config file; the environment is consulted at resolution
/// time. Precedence per key: CLI flag > environment > file > compiled-in
/// default.
#[derive(Debug, Default, Clone)]
pub struct Overlay {
    file: HashMap<String, String>,
}

impl Overlay {
    /// Loads the config file layer. A missing default-path file is fine;
    /// an explicitly named file that cannot be read is an error.
    pub fn load(path: Option<&Path>, default_path: &Path) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p, true),
            None => (default_path, false),
        };
        if !required && !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Ok(Self {
            file: parse_env_file(&raw),
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolves one key against the live process environment.
    pub fn resolve(&self, key: &str, flag: Option<String>, default: Option<&str>) -> Option<String> {
        let env = std::env::var(key).ok();
        self.resolve_layered(key, flag, env, default)
    }

    // Environment passed explicitly so precedence is testable without
    // mutating the process environment.
    fn resolve_layered(
        &self,
        key: &str,
        flag: Option<String>,
        env: Option<String>,
        default: Option<&str>,
    ) -> Option<String> {
        flag.or(env)
            .or_else(|| self.file.get(key).cloned())
            .or_else(|| default.map(|v| v.to_string()))
    }
}

/// Parses newline-delimited `KEY=VALUE` text.
///
/// Blank lines and `#` comments are skipped, a leading `export ` is
/// stripped, and surrounding matching quotes are removed without any
/// interpretation of the value. Values are data, never code.
pub fn parse_env_file(raw: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        out.insert(key.to_string(), strip_quotes(value.trim()).to_string());
    }
    out
}

fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}
