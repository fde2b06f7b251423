//! Worker identity and argv assembly.
//!
//! A worker is one spawned instance of launcher + optional script + extra
//! arguments. Extra arguments are templates: every literal `${i}` inside
//! them is replaced by the worker's 1-based index, so `--report-${i}.html`
//! becomes `--report-3.html` for worker 3.

use anyhow::{bail, Context, Result};

/// The index placeholder recognized inside extra-argument templates.
pub const INDEX_PLACEHOLDER: &str = "${i}";

/// One raw extra argument, expanded per worker index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgTemplate(String);

impl ArgTemplate {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Substitutes every occurrence of the placeholder, as a substring,
    /// leaving all other characters untouched.
    pub fn expand(&self, index: usize) -> String {
        self.0.replace(INDEX_PLACEHOLDER, &index.to_string())
    }
}

/// Fully resolved launch parameters for one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSpec {
    /// 1-based ordinal within the run.
    pub index: usize,
    /// Unique label: title prefix + "-" + index. Doubles as the window
    /// label and the log/pid file stem.
    pub title: String,
    /// Ordered command line: launcher tokens, script, expanded extras.
    pub argv: Vec<String>,
}

/// Splits the launcher string into tokens and applies the interpreter-alias
/// policy: a leading `python` token is replaced by the configured concrete
/// interpreter path when one is available. This runs once per run, before
/// any per-worker expansion.
pub fn resolve_launcher(raw: &str, interpreter: Option<&str>) -> Result<Vec<String>> {
    let mut tokens =
        shell_words::split(raw).with_context(|| format!("failed to parse launcher: {}", raw))?;
    if tokens.is_empty() {
        bail!("launcher is empty");
    }
    if let Some(path) = interpreter {
        if tokens[0] == "python" {
            tokens[0] = path.to_string();
        }
    }
    Ok(tokens)
}

/// Assembles one worker's spec from the shared run parameters.
pub fn build_worker(
    index: usize,
    title_prefix: &str,
    launcher: &[String],
    script: Option<&str>,
    extras: &[ArgTemplate],
) -> WorkerSpec {
    let mut argv = launcher.to_vec();
    if let Some(script) = script {
        argv.push(script.to_string());
    }
    argv.extend(extras.iter().map(|template| template.expand(index)));
    WorkerSpec {
        index,
        title: format!("{}-{}", title_prefix, index),
        argv,
    }
}
