//! Task executors
//!
//! [`ProcessExecutor`] runs each task in a fresh child process, one child per
//! call, so the compiler's memory and crashes stay out of the host.
//! [`InlineExecutor`] runs on tokio's blocking pool inside the current
//! process, for embedding and tests.
//!
//! On unix each worker leads its own process group. Abandoning a worker
//! (timeout, interrupt, dropped request) kills the whole group, so the
//! compiler it spawned goes down with it.

use super::{execute_render_task, Compiler, RenderTask, WorkerOutcome};
use crate::error::{MenushotError, MenushotResult};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs one render task to an outcome
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: RenderTask) -> MenushotResult<WorkerOutcome>;
}

/// Executes tasks in a dedicated child process
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ProcessExecutor {
    /// Worker that speaks the task/outcome protocol on stdin/stdout
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: None,
        }
    }

    /// Re-invoke the running binary's hidden `worker` subcommand
    pub fn current_exe() -> MenushotResult<Self> {
        let program = std::env::current_exe()
            .map_err(|e| MenushotError::io("locating current executable", e))?;
        Ok(Self::new(program, vec!["worker".to_string()]))
    }

    /// Kill the worker if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run_child(&self, payload: Vec<u8>) -> MenushotResult<std::process::Output> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|e| MenushotError::WorkerSpawn {
            program: self.program.clone(),
            source: e,
        })?;
        let mut group = ProcessGroup::new(child.id());

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .await
                .map_err(|e| MenushotError::io("sending task to render worker", e))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| MenushotError::io("waiting for render worker", e))?;
        group.release();
        Ok(output)
    }
}

#[async_trait]
impl TaskExecutor for ProcessExecutor {
    async fn execute(&self, task: RenderTask) -> MenushotResult<WorkerOutcome> {
        let payload = serde_json::to_vec(&task)?;
        debug!(
            "Spawning render worker {} for request {}",
            self.program.display(),
            task.req_id
        );

        // Dropping the future on timeout drops the child and its group guard
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run_child(payload))
                .await
                .map_err(|_| MenushotError::CompileTimeout {
                    secs: limit.as_secs_f64(),
                })??,
            None => self.run_child(payload).await?,
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("Render worker stderr: {}", stderr.trim());
        }

        if !output.status.success() {
            return Err(MenushotError::CompileFailure(format!(
                "render worker exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            MenushotError::CompileFailure(format!("unreadable render worker output: {}", e))
        })
    }
}

/// Kills a worker's process group when dropped before the worker finished
struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    /// The worker exited on its own; leave the group alone
    fn release(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: killpg only sends a signal; the group was created for this worker.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            warn!("Failed to kill render worker group {}: {}", pgid, err);
        }
    } else {
        debug!("Killed render worker group {}", pgid);
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

/// Executes tasks on the blocking pool of the current process
///
/// Offers no memory or crash isolation.
#[derive(Clone)]
pub struct InlineExecutor {
    compiler: Arc<dyn Compiler>,
}

impl InlineExecutor {
    pub fn new(compiler: Arc<dyn Compiler>) -> Self {
        Self { compiler }
    }
}

#[async_trait]
impl TaskExecutor for InlineExecutor {
    async fn execute(&self, task: RenderTask) -> MenushotResult<WorkerOutcome> {
        let compiler = Arc::clone(&self.compiler);
        tokio::task::spawn_blocking(move || execute_render_task(&task, compiler.as_ref()))
            .await
            .map_err(|e| MenushotError::Internal(format!("render task aborted: {}", e)))
    }
}
