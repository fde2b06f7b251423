//! Shell command composition.
//!
//! Builds the single command string a worker surface runs: enter the working
//! directory, set up output encoding, run the worker argv, capture its exit
//! status, report it, and optionally keep an interactive shell open in place
//! of the finished worker. Every user-supplied token passes through
//! `shell-words` quoting; nothing is ever interpolated raw.

use anyhow::{bail, Result};

/// Inputs shared by every worker command in a run.
#[derive(Debug, Clone)]
pub struct ComposeContext {
    /// Directory the worker starts in (and keep-open shells return to).
    pub workdir: String,
    /// Value exported as `PYTHONIOENCODING` before the worker runs.
    pub encoding: String,
    /// Leave an interactive shell on the surface after the worker exits.
    pub keep_open: bool,
}

/// Quotes one token so it re-tokenizes to itself.
///
/// A token containing a NUL byte has no representation on a shell command
/// line; that is a composition error, not something to pass through.
pub fn quote_token(token: &str) -> Result<String> {
    if token.contains('\0') {
        bail!("cannot escape token containing NUL byte");
    }
    Ok(shell_words::quote(token).into_owned())
}

/// Quotes and joins a full argv into one shell fragment.
pub fn join_tokens(argv: &[String]) -> Result<String> {
    let mut parts = Vec::with_capacity(argv.len());
    for token in argv {
        parts.push(quote_token(token)?);
    }
    Ok(parts.join(" "))
}

/// Composes the full shell command for one worker.
///
/// Shape: `cd <dir> && export PYTHONIOENCODING=<enc> && <argv>; status=$?;
/// <report>; [keep-open tail]`. The status capture sits immediately after
/// the worker pipeline so it reflects the worker, not the reporting. The
/// report branches on success (stdout) versus failure (stderr); with
/// keep-open the string then re-enters the working directory and execs an
/// interactive shell regardless of the worker's outcome.
pub fn compose(ctx: &ComposeContext, title: &str, argv: &[String]) -> Result<String> {
    if argv.is_empty() {
        bail!("empty worker command for {}", title);
    }
    let dir = quote_token(&ctx.workdir)?;
    let encoding = quote_token(&ctx.encoding)?;
    let label = quote_token(title)?;
    let worker = join_tokens(argv)?;

    let mut command = format!(
        "cd {dir} && export PYTHONIOENCODING={encoding} && {worker}; status=$?; \
         if [ \"$status\" -eq 0 ]; \
         then printf '%s exited with status %s\\n' {label} \"$status\"; \
         else printf '%s exited with status %s\\n' {label} \"$status\" >&2; fi"
    );
    if ctx.keep_open {
        command.push_str(&format!("; cd {dir}; exec \"${{SHELL:-/bin/sh}}\""));
    }
    Ok(command)
}
