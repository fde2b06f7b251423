//! Fanout: launch N parallel copies of a command in tmux windows/panes or
//! as detached background jobs with per-worker logs.
//!
//! This is the entry point. It parses command-line arguments, layers them
//! over the environment and an optional KEY=VALUE config file, and hands
//! the resolved settings to the launch driver.

mod background;
mod compose;
mod config;
mod driver;
mod placement;
mod session;
mod worker;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use clap::builder::styling::{AnsiColor, Effects, Style};
use clap::builder::Styles;
use clap::Parser;

use crate::config::{
    parse_backend, parse_bool, parse_mode, parse_split, Overlay, Settings,
};
use crate::worker::{resolve_launcher, ArgTemplate};

const DEFAULT_CONFIG: &str = "fanout.env";

/// Command-line interface definition.
///
/// Every value here can also come from the environment or the config file
/// under the upper-cased key (NUM, MODE, LOG_DIR, ...); flags win.
#[derive(Debug, Parser)]
#[command(
    name = "fanout",
    version,
    about = "Launch parallel workers in terminal tabs/panes or the background",
    styles = help_styles(),
    color = clap::ColorChoice::Always
)]
struct Cli {
    /// Number of workers to launch.
    #[arg(short = 'n', long)]
    num: Option<usize>,
    /// Terminal windows to open (requires --panes; tabs x panes = workers).
    #[arg(long)]
    tabs: Option<usize>,
    /// Panes per window (requires --tabs).
    #[arg(long)]
    panes: Option<usize>,
    /// Run mode: "terminal" or "background".
    #[arg(long)]
    mode: Option<String>,
    /// Terminal backend ("tmux").
    #[arg(long)]
    backend: Option<String>,
    /// Keep an interactive shell open on each surface after its worker exits.
    #[arg(long)]
    keep_open: bool,
    /// Worker script path, inserted after the launcher tokens.
    #[arg(long)]
    script: Option<String>,
    /// Launcher command line prepended to every worker (shell-quoted string).
    #[arg(long)]
    launcher: Option<String>,
    /// Concrete interpreter substituted for a leading "python" launcher token.
    #[arg(long)]
    python: Option<String>,
    /// Title prefix; workers are named <prefix>-<i>.
    #[arg(long)]
    title: Option<String>,
    /// Directory for background log and pid files.
    #[arg(long)]
    log_dir: Option<String>,
    /// Working directory every worker starts in.
    #[arg(long)]
    workdir: Option<String>,
    /// Pane split direction: "h" or "v".
    #[arg(long)]
    split: Option<String>,
    /// Value exported as PYTHONIOENCODING for every worker.
    #[arg(long)]
    encoding: Option<String>,
    /// Delay between background spawns (ms).
    #[arg(long)]
    spawn_delay_ms: Option<u64>,
    /// Path to a KEY=VALUE config file (default: ./fanout.env if present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Ignore any fanout.env in the current directory.
    #[arg(long)]
    no_config: bool,
    /// Extra worker arguments (after --); ${i} expands to the 1-based
    /// worker index.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let overlay = if cli.no_config {
        Overlay::empty()
    } else {
        Overlay::load(cli.config.as_deref(), Path::new(DEFAULT_CONFIG))?
    };
    let settings = resolve_settings(&cli, &overlay)?;
    driver::run(&settings).await
}

/// Merges CLI flags with the overlay into immutable run settings.
fn resolve_settings(cli: &Cli, overlay: &Overlay) -> Result<Settings> {
    let mode = parse_mode(
        &overlay
            .resolve("MODE", cli.mode.clone(), Some("terminal"))
            .unwrap_or_default(),
    )?;
    let backend = parse_backend(
        &overlay
            .resolve("BACKEND", cli.backend.clone(), Some("tmux"))
            .unwrap_or_default(),
    )?;
    let split = parse_split(
        &overlay
            .resolve("SPLIT", cli.split.clone(), Some("v"))
            .unwrap_or_default(),
    )?;
    let keep_open = parse_bool(
        &overlay
            .resolve(
                "KEEP_OPEN",
                cli.keep_open.then(|| "1".to_string()),
                Some("0"),
            )
            .unwrap_or_default(),
    )?;

    let count = parse_positive(
        overlay.resolve("NUM", cli.num.map(|n| n.to_string()), None),
        "worker count",
    )?;
    let windows = parse_positive(
        overlay.resolve("TABS", cli.tabs.map(|n| n.to_string()), None),
        "window count",
    )?;
    let panes = parse_positive(
        overlay.resolve("PANES", cli.panes.map(|n| n.to_string()), None),
        "panes per window",
    )?;
    let spawn_delay_ms = overlay
        .resolve(
            "SPAWN_DELAY_MS",
            cli.spawn_delay_ms.map(|n| n.to_string()),
            Some("0"),
        )
        .unwrap_or_default()
        .parse::<u64>()
        .map_err(|_| anyhow!("invalid spawn delay"))?;

    let launcher_raw = overlay
        .resolve("LAUNCHER", cli.launcher.clone(), Some("python3"))
        .unwrap_or_default();
    let interpreter = overlay.resolve("PYTHON", cli.python.clone(), None);
    let launcher = resolve_launcher(&launcher_raw, interpreter.as_deref())?;

    Ok(Settings {
        mode,
        backend,
        keep_open,
        count,
        windows,
        panes,
        launcher,
        script: overlay.resolve("SCRIPT", cli.script.clone(), None),
        title_prefix: overlay
            .resolve("TITLE", cli.title.clone(), Some("worker"))
            .unwrap_or_default(),
        log_dir: overlay
            .resolve("LOG_DIR", cli.log_dir.clone(), Some("logs"))
            .unwrap_or_default(),
        workdir: overlay
            .resolve("WORKDIR", cli.workdir.clone(), Some("."))
            .unwrap_or_default(),
        split,
        encoding: overlay
            .resolve("ENCODING", cli.encoding.clone(), Some("utf-8"))
            .unwrap_or_default(),
        spawn_delay_ms,
        extras: cli.args.iter().map(ArgTemplate::new).collect(),
    })
}

fn parse_positive(value: Option<String>, label: &str) -> Result<Option<usize>> {
    match value {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| anyhow!("invalid {}: {}", label, raw)),
    }
}

fn help_styles() -> Styles {
    Styles::styled()
        .header(
            Style::new()
                .fg_color(Some(AnsiColor::Cyan.into()))
                .effects(Effects::BOLD),
        )
        .usage(
            Style::new()
                .fg_color(Some(AnsiColor::Green.into()))
                .effects(Effects::BOLD),
        )
        .literal(Style::new().fg_color(Some(AnsiColor::Yellow.into())))
        .placeholder(Style::new().fg_color(Some(AnsiColor::Magenta.into())))
        .valid(Style::new().fg_color(Some(AnsiColor::Green.into())))
        .invalid(
            Style::new()
                .fg_color(Some(AnsiColor::Red.into()))
                .effects(Effects::BOLD),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Backend, Mode, SplitDirection};

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("fanout").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_resolve() {
        let settings = resolve_settings(&cli(&["-n", "2"]), &Overlay::empty()).unwrap();
        assert_eq!(settings.mode, Mode::Terminal);
        assert_eq!(settings.backend, Backend::Tmux);
        assert_eq!(settings.split, SplitDirection::Vertical);
        assert!(!settings.keep_open);
        assert_eq!(settings.count, Some(2));
        assert_eq!(settings.launcher, vec!["python3"]);
        assert_eq!(settings.title_prefix, "worker");
        assert_eq!(settings.log_dir, "logs");
        assert_eq!(settings.workdir, ".");
        assert_eq!(settings.encoding, "utf-8");
        assert_eq!(settings.spawn_delay_ms, 0);
    }

    #[test]
    fn flags_override_defaults() {
        let settings = resolve_settings(
            &cli(&[
                "--tabs",
                "2",
                "--panes",
                "3",
                "--mode",
                "background",
                "--launcher",
                "node worker.js",
                "--title",
                "job",
                "--split",
                "h",
                "--keep-open",
            ]),
            &Overlay::empty(),
        )
        .unwrap();
        assert_eq!(settings.mode, Mode::Background);
        assert_eq!(settings.windows, Some(2));
        assert_eq!(settings.panes, Some(3));
        assert_eq!(settings.launcher, vec!["node", "worker.js"]);
        assert_eq!(settings.title_prefix, "job");
        assert_eq!(settings.split, SplitDirection::Horizontal);
        assert!(settings.keep_open);
    }

    #[test]
    fn trailing_args_become_templates() {
        let settings = resolve_settings(
            &cli(&["-n", "2", "--", "--report-${i}.html", "--verbose"]),
            &Overlay::empty(),
        )
        .unwrap();
        assert_eq!(settings.extras.len(), 2);
        assert_eq!(settings.extras[0].expand(3), "--report-3.html");
        assert_eq!(settings.extras[1].expand(3), "--verbose");
    }

    #[test]
    fn python_alias_resolution_applies() {
        let settings = resolve_settings(
            &cli(&["-n", "1", "--launcher", "python -u", "--python", "/venv/bin/python3"]),
            &Overlay::empty(),
        )
        .unwrap();
        assert_eq!(settings.launcher, vec!["/venv/bin/python3", "-u"]);
    }

    #[test]
    fn rejects_unrecognized_mode_and_backend() {
        assert!(resolve_settings(&cli(&["-n", "1", "--mode", "detached"]), &Overlay::empty())
            .is_err());
        assert!(resolve_settings(&cli(&["-n", "1", "--backend", "kitty"]), &Overlay::empty())
            .is_err());
    }

    #[test]
    fn rejects_garbage_counts() {
        assert!(parse_positive(Some("three".to_string()), "worker count").is_err());
        assert!(parse_positive(Some("-2".to_string()), "worker count").is_err());
        assert!(parse_positive(Some("2.5".to_string()), "worker count").is_err());
        assert_eq!(parse_positive(None, "worker count").unwrap(), None);
    }

    #[test]
    fn missing_default_config_is_fine() {
        let overlay = Overlay::load(None, Path::new("/nonexistent/fanout.env")).unwrap();
        let resolved = overlay.resolve("FANOUT_UNSET_TEST_KEY", None, Some("worker"));
        assert_eq!(resolved.as_deref(), Some("worker"));
    }
}
