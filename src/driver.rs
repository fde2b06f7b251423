//! Top-level launch loop.
//!
//! Validates the plan, composes every worker command up front (so a bad
//! token aborts with nothing spawned), then dispatches the whole batch to
//! either the terminal session queue or the background runner.

use std::time::Duration;

use anyhow::Result;

use crate::background::BackgroundRunner;
use crate::compose::{compose, ComposeContext};
use crate::config::{Mode, Settings};
use crate::placement::{place, LaunchPlan, Placement};
use crate::session::SessionQueue;
use crate::worker::{build_worker, WorkerSpec};

/// Runs one launch: validate, compose, dispatch, flush or join.
pub async fn run(settings: &Settings) -> Result<()> {
    let plan = LaunchPlan::resolve(settings.count, settings.windows, settings.panes)?;
    let prepared = prepare_workers(settings, &plan)?;

    match settings.mode {
        Mode::Terminal => dispatch_terminal(settings, prepared).await,
        Mode::Background => dispatch_background(settings, prepared).await,
    }
}

/// Builds spec, placement, and composed command for every worker before any
/// side effect. Configuration and composition errors surface here, with
/// zero workers spawned.
fn prepare_workers(
    settings: &Settings,
    plan: &LaunchPlan,
) -> Result<Vec<(WorkerSpec, Placement, String)>> {
    // Keep-open only makes sense on a visible surface.
    let ctx = ComposeContext {
        workdir: settings.workdir.clone(),
        encoding: settings.encoding.clone(),
        keep_open: settings.keep_open && settings.mode == Mode::Terminal,
    };
    let mut prepared = Vec::with_capacity(plan.total);
    for index in 1..=plan.total {
        let spec = build_worker(
            index,
            &settings.title_prefix,
            &settings.launcher,
            settings.script.as_deref(),
            &settings.extras,
        );
        let placement = place(index, plan.panes_per_window, settings.split);
        let command = compose(&ctx, &spec.title, &spec.argv)?;
        prepared.push((spec, placement, command));
    }
    Ok(prepared)
}

async fn dispatch_terminal(
    settings: &Settings,
    prepared: Vec<(WorkerSpec, Placement, String)>,
) -> Result<()> {
    let mut queue = SessionQueue::new(settings.backend, settings.title_prefix.clone());
    for (spec, placement, command) in &prepared {
        queue.enqueue(*placement, &spec.title, &settings.workdir, command);
    }
    println!(
        "opening {} worker surfaces in one {} session '{}'",
        queue.len(),
        settings.backend.program(),
        settings.title_prefix
    );
    queue.flush().await
}

async fn dispatch_background(
    settings: &Settings,
    prepared: Vec<(WorkerSpec, Placement, String)>,
) -> Result<()> {
    let mut runner = BackgroundRunner::new(&settings.log_dir)?;
    let delay = Duration::from_millis(settings.spawn_delay_ms);
    let total = prepared.len();
    for (spec, _, command) in &prepared {
        // A failed spawn loses that worker only; the rest of the batch
        // proceeds.
        if let Err(err) = runner.spawn(
            spec.index,
            &spec.title,
            &settings.workdir,
            &settings.encoding,
            command,
        ) {
            eprintln!("{:#}", err);
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
    println!(
        "spawned {}/{} background workers, logs in {}; waiting for completion",
        runner.job_count(),
        total,
        settings.log_dir
    );

    for result in runner.join_all().await {
        match result.code {
            Some(0) => println!("{} (pid {}) exited with status 0", result.title, result.pid),
            Some(code) => eprintln!(
                "{} (pid {}) exited with status {} (see {})",
                result.title,
                result.pid,
                code,
                result.log_path.display()
            ),
            None => eprintln!(
                "{} (pid {}) terminated by signal (see {})",
                result.title,
                result.pid,
                result.log_path.display()
            ),
        }
    }
    Ok(())
}
