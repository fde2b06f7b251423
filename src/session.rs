//! Batched terminal session construction.
//!
//! Opening N windows with N independent tmux invocations races the server's
//! own session bookkeeping: a second call can fire before it sees the
//! session the first one created. The queue therefore accumulates one
//! sub-command per worker and flushes them all as a single tmux process
//! invocation, sub-commands joined by the `;` argument tmux recognizes, in
//! enqueue order.

use anyhow::{bail, Context, Result};
use tokio::process::Command;

use crate::config::Backend;
use crate::placement::Placement;

/// Append-only queue of terminal sub-commands, flushed exactly once.
#[derive(Debug)]
pub struct SessionQueue {
    backend: Backend,
    session: String,
    queue: Vec<Vec<String>>,
}

impl SessionQueue {
    /// Creates an empty queue for the named session.
    pub fn new(backend: Backend, session: impl Into<String>) -> Self {
        Self {
            backend,
            session: session.into(),
            queue: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Appends one worker's sub-command. No process starts here.
    ///
    /// The very first entry creates the detached session itself; later
    /// window-openers add windows to it, and splits divide whichever window
    /// the previous sub-command left current.
    pub fn enqueue(&mut self, placement: Placement, title: &str, workdir: &str, command: &str) {
        let sub = match placement {
            Placement::NewWindow if self.queue.is_empty() => vec![
                "new-session".to_string(),
                "-d".to_string(),
                "-s".to_string(),
                self.session.clone(),
                "-n".to_string(),
                title.to_string(),
                "-c".to_string(),
                workdir.to_string(),
                command.to_string(),
            ],
            Placement::NewWindow => vec![
                "new-window".to_string(),
                "-t".to_string(),
                self.session.clone(),
                "-n".to_string(),
                title.to_string(),
                "-c".to_string(),
                workdir.to_string(),
                command.to_string(),
            ],
            Placement::SplitPane(direction) => vec![
                "split-window".to_string(),
                direction.tmux_flag().to_string(),
                "-t".to_string(),
                self.session.clone(),
                "-c".to_string(),
                workdir.to_string(),
                command.to_string(),
            ],
        };
        self.queue.push(sub);
    }

    // The single argv handed to the backend: queued sub-commands in enqueue
    // order, separated by lone `;` arguments, none trailing.
    fn invocation(&self) -> Option<(&'static str, Vec<String>)> {
        if self.queue.is_empty() {
            return None;
        }
        let mut args = Vec::new();
        for (i, sub) in self.queue.iter().enumerate() {
            if i > 0 {
                args.push(";".to_string());
            }
            args.extend(sub.iter().cloned());
        }
        Some((self.backend.program(), args))
    }

    /// Issues the batched invocation. Consumes the queue; an empty queue is
    /// a no-op. Blocks only until the backend accepts the request, never on
    /// worker completion.
    pub async fn flush(self) -> Result<()> {
        let Some((program, args)) = self.invocation() else {
            return Ok(());
        };
        let status = Command::new(program)
            .args(&args)
            .status()
            .await
            .with_context(|| format!("failed to invoke {}", program))?;
        if !status.success() {
            bail!("{} session creation failed ({})", program, status);
        }
        Ok(())
    }
}
