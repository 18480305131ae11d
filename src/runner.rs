use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::config::Config;
use crate::models::{Entry, Outcome, OutcomeKind, Summary, Task};
use crate::results::ResultsFile;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChildStatus {
    exit_code: Option<i32>,
    timed_out: bool,
    elapsed: Duration,
}

/// Runs tasks one at a time, each under the same wall-clock timeout.
#[derive(Debug, Clone)]
pub struct Runner {
    timeout: Duration,
    interpreter: Vec<String>,
    log_dir: PathBuf,
    summary_path: PathBuf,
}

impl Runner {
    pub fn new(timeout: Duration, log_dir: PathBuf) -> Self {
        let summary_path = log_dir.join("summary.csv");
        Self {
            timeout,
            interpreter: Vec::new(),
            log_dir,
            summary_path,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.timeout,
            interpreter: config.interpreter.clone(),
            log_dir: config.log_dir.clone(),
            summary_path: config.summary_path(),
        }
    }

    /// Prefix every task with this command, e.g. `["python", "-u"]`.
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn summary_path(&self) -> &Path {
        &self.summary_path
    }

    /// Runs every task exactly once, in order, and returns the batch summary.
    ///
    /// For each task the log and the record line are on disk before
    /// `on_finished` is called with the 1-based position, the new entry and
    /// the running summary. Progress reporting is best-effort: an error from
    /// `on_finished` is logged and the batch continues. Task failures and
    /// timeouts are outcomes, not errors; only I/O problems with the log
    /// directory or record file abort the batch.
    pub fn run<F>(&self, tasks: &[Task], mut on_finished: F) -> Result<Summary>
    where
        F: FnMut(usize, &Entry, &Summary) -> Result<()>,
    {
        std::fs::create_dir_all(&self.log_dir)
            .with_context(|| format!("Failed to create log directory {}", self.log_dir.display()))?;
        let mut results = ResultsFile::create(&self.summary_path)?;
        let mut summary = Summary::new();

        for (index, task) in tasks.iter().enumerate() {
            let outcome = self.execute(task)?;
            tracing::info!(
                task = task.label(),
                outcome = outcome.kind().as_ref(),
                elapsed_secs = outcome.elapsed_secs(),
                "task finished"
            );

            let entry = summary.record(Entry::new(task.clone(), outcome)).clone();
            results.append(&entry)?;
            if let Err(error) = on_finished(index + 1, &entry, &summary) {
                tracing::warn!(task = task.label(), error = %format!("{error:#}"), "failed to report progress");
            }
        }

        Ok(summary)
    }

    /// Runs a single task with output captured to its log file.
    pub fn execute(&self, task: &Task) -> Result<Outcome> {
        let log_path = self.log_dir.join(task.log_file_name());
        let mut log = File::create(&log_path)
            .with_context(|| format!("Failed to create log {}", log_path.display()))?;

        let mut child = match self.spawn(task, &log) {
            Ok(child) => child,
            Err(error) => {
                tracing::warn!(task = task.label(), %error, "failed to start task");
                writeln!(log, "batchrun: failed to start {}: {error:#}", task.label())
                    .and_then(|()| log.sync_all())
                    .with_context(|| format!("Failed to write log {}", log_path.display()))?;
                return Ok(Outcome::new(
                    OutcomeKind::Failed,
                    Duration::ZERO,
                    None,
                    log_path,
                ));
            }
        };

        let status = wait_for_child(&mut child, self.timeout, task.label())?;
        let kind = OutcomeKind::classify(status.timed_out, status.exit_code);
        let elapsed = if status.timed_out {
            self.timeout
        } else {
            status.elapsed
        };

        log.sync_all()
            .with_context(|| format!("Failed to sync log {}", log_path.display()))?;

        Ok(Outcome::new(kind, elapsed, status.exit_code, log_path))
    }

    fn spawn(&self, task: &Task, log: &File) -> Result<Child> {
        let script = std::path::absolute(task.path())
            .with_context(|| format!("Failed to resolve {}", task.path().display()))?;

        let mut command = match self.interpreter.split_first() {
            Some((program, args)) => {
                let mut command = Command::new(program);
                command.args(args).arg(&script);
                command
            }
            None => Command::new(&script),
        };

        if let Some(dir) = script.parent() {
            command.current_dir(dir);
        }

        // Own process group, so a timeout can take down everything the script started.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        tracing::debug!(task = task.label(), ?command, "spawning task");

        command
            .stdin(Stdio::null())
            .stdout(Stdio::from(log.try_clone()?))
            .stderr(Stdio::from(log.try_clone()?))
            .spawn()
            .with_context(|| format!("Failed to spawn {:?}", command.get_program()))
    }
}

/// Polls `child` until it exits or `timeout` elapses. On timeout the child
/// is killed and reaped.
fn wait_for_child(child: &mut Child, timeout: Duration, label: &str) -> Result<ChildStatus> {
    let started_at = Instant::now();

    loop {
        if let Some(status) = child
            .try_wait()
            .with_context(|| format!("Failed to wait for {label}"))?
        {
            return Ok(ChildStatus {
                exit_code: status.code(),
                timed_out: false,
                elapsed: started_at.elapsed(),
            });
        }

        if started_at.elapsed() >= timeout {
            tracing::warn!(task = label, timeout_secs = timeout.as_secs_f64(), "task timed out, killing");
            if let Err(error) = kill_process_tree(child) {
                // The child may have exited between try_wait and kill.
                tracing::debug!(task = label, %error, "process group kill failed");
                let _ = child.kill();
            }
            let status = child
                .wait()
                .with_context(|| format!("Failed to reap {label} after kill"))?;
            return Ok(ChildStatus {
                exit_code: status.code(),
                timed_out: true,
                elapsed: started_at.elapsed(),
            });
        }

        thread::sleep(POLL_INTERVAL.min(timeout));
    }
}

/// Sends SIGKILL to the child's process group.
#[cfg(unix)]
fn kill_process_tree(child: &Child) -> std::io::Result<()> {
    let pgid = libc::pid_t::try_from(child.id())
        .map_err(|_| std::io::Error::other("pid out of range"))?;
    // SAFETY: plain syscall on a process group this runner created.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn kill_process_tree(child: &mut Child) -> std::io::Result<()> {
    child.kill()
}
