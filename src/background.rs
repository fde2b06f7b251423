//! Detached background execution with per-worker log capture.
//!
//! Each worker runs as its own process group with stdout and stderr
//! appended to `<logDir>/<title>.log`; the pid lands in
//! `<logDir>/<title>.pid` immediately at spawn so an operator can signal
//! workers that outlive the driver. Workers write to distinct files keyed
//! by their unique titles, so concurrent output never interleaves.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::{Child, Command};

/// One spawned background worker.
#[derive(Debug)]
pub struct BackgroundJob {
    pub index: usize,
    pub title: String,
    pub pid: u32,
    pub log_path: PathBuf,
    child: Child,
}

/// Spawns and tracks background workers for one run.
#[derive(Debug)]
pub struct BackgroundRunner {
    log_dir: PathBuf,
    jobs: Vec<BackgroundJob>,
}

impl BackgroundRunner {
    /// Creates the runner and its log directory.
    pub fn new(log_dir: impl Into<PathBuf>) -> Result<Self> {
        let log_dir = log_dir.into();
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
        Ok(Self {
            log_dir,
            jobs: Vec::new(),
        })
    }

    /// Spawns one worker detached from the driver.
    pub fn spawn(
        &mut self,
        index: usize,
        title: &str,
        workdir: &str,
        encoding: &str,
        command: &str,
    ) -> Result<()> {
        let log_path = self.log_dir.join(format!("{}.log", title));
        let pid_path = self.log_dir.join(format!("{}.pid", title));
        let stdout_log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("failed to open log file {}", log_path.display()))?;
        let stderr_log = stdout_log
            .try_clone()
            .with_context(|| format!("failed to clone log handle for {}", title))?;

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(workdir)
            .env("PYTHONIOENCODING", encoding)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_log))
            .stderr(Stdio::from(stderr_log));

        #[cfg(unix)]
        unsafe {
            cmd.pre_exec(|| {
                let _ = libc::setpgid(0, 0);
                Ok(())
            });
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x00000200;
            cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
        }

        let child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn {}", title))?;
        let pid = child.id().unwrap_or(0);
        std::fs::write(&pid_path, format!("{}\n", pid))
            .with_context(|| format!("failed to write pid file {}", pid_path.display()))?;

        self.jobs.push(BackgroundJob {
            index,
            title: title.to_string(),
            pid,
            log_path,
            child,
        });
        Ok(())
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Blocks until every spawned worker has exited.
    ///
    /// Results come back in spawn order; a `None` code means the worker was
    /// killed by a signal or could not be waited on.
    pub async fn join_all(self) -> Vec<JobResult> {
        let mut results = Vec::with_capacity(self.jobs.len());
        for mut job in self.jobs {
            let code = match job.child.wait().await {
                Ok(status) => status.code(),
                Err(err) => {
                    eprintln!("failed waiting for {}: {}", job.title, err);
                    None
                }
            };
            results.push(JobResult {
                index: job.index,
                title: job.title,
                pid: job.pid,
                code,
                log_path: job.log_path,
            });
        }
        results
    }
}

/// Outcome of one background worker, for the end-of-run summary.
#[derive(Debug)]
pub struct JobResult {
    pub index: usize,
    pub title: String,
    pub pid: u32,
    pub code: Option<i32>,
    pub log_path: PathBuf,
}
