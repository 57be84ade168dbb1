use command_group::{AsyncCommandGroup, AsyncGroupChild};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::collector::{LineCollector, RawLine};
use super::error::AgentError;

/// Result of an agent exit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitResult {
    /// Process completed successfully (exit code 0)
    Success,
    /// Process failed (non-zero exit code)
    Failure(i32),
    /// Process was killed, or terminated by a signal
    Interrupted,
}

impl ExitResult {
    /// Get the exit code (if available)
    ///
    /// Returns `Some(0)` for success, `Some(code)` for failure,
    /// and `None` for interrupted processes.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExitResult::Success => Some(0),
            ExitResult::Failure(code) => Some(*code),
            ExitResult::Interrupted => None,
        }
    }

    /// Exit code with `-1` standing in for "no code"
    pub fn code_or_sentinel(&self) -> i32 {
        self.exit_code().unwrap_or(-1)
    }
}

impl From<ExitStatus> for ExitResult {
    fn from(status: ExitStatus) -> Self {
        if status.success() {
            ExitResult::Success
        } else {
            status
                .code()
                .map(ExitResult::Failure)
                .unwrap_or(ExitResult::Interrupted)
        }
    }
}

/// How to launch the child process
#[derive(Debug, Clone, Default)]
pub struct SpawnOptions {
    /// Working directory; inherits the parent's when `None`
    pub working_dir: Option<PathBuf>,

    /// Variables layered on top of the inherited environment
    pub env: BTreeMap<String, String>,
}

/// A running agent process group with its output channel
///
/// Owns three background tasks: one reader per pipe and a waiter that reaps
/// the child. Cancelling [`token`](Self::token) makes the waiter kill the
/// whole group; the readers stop with it.
pub struct SpawnedAgent {
    /// OS process id of the group leader
    pub pid: Option<u32>,

    /// Lines from stdout and stderr; closes once both readers finish
    pub lines: mpsc::UnboundedReceiver<RawLine>,

    /// Resolves once the process has exited and been reaped
    pub exit_signal: oneshot::Receiver<ExitResult>,

    token: CancellationToken,
    readers: Vec<JoinHandle<()>>,
    waiter: JoinHandle<()>,
}

impl SpawnedAgent {
    /// Spawn `command` (executable first) as a new process group
    ///
    /// Stdin is closed, stdout and stderr are piped into the line channel.
    pub fn spawn(command: &[String], options: &SpawnOptions) -> Result<Self, AgentError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| AgentError::SpawnError("Empty command line".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(&options.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &options.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .group_spawn()
            .map_err(|e| AgentError::SpawnError(format!("Failed to spawn {program}: {e}")))?;
        let pid = child.id();

        let (Some(stdout), Some(stderr)) = (child.inner().stdout.take(), child.inner().stderr.take())
        else {
            return Err(AgentError::SpawnError(format!(
                "{program} started without piped stdout/stderr"
            )));
        };

        let token = CancellationToken::new();
        let mut collector = LineCollector::new(token.clone());
        collector.collect_both(stdout, stderr);
        let (lines, readers) = collector.finish();

        let (exit_tx, exit_signal) = oneshot::channel();
        let waiter = tokio::spawn(wait_for_exit(child, token.clone(), exit_tx));

        tracing::debug!(program = %program, ?pid, "Agent process spawned");

        Ok(Self {
            pid,
            lines,
            exit_signal,
            token,
            readers,
            waiter,
        })
    }

    /// Token that kills the process group when cancelled
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Kill the process group and wait until it is reaped and the readers stopped
    pub async fn terminate(self) {
        self.token.cancel();
        if let Err(e) = self.waiter.await {
            tracing::warn!(error = %e, "Agent waiter task failed");
        }
        for reader in self.readers {
            if let Err(e) = reader.await {
                tracing::warn!(error = %e, "Agent reader task failed");
            }
        }
    }
}

async fn wait_for_exit(
    mut child: AsyncGroupChild,
    token: CancellationToken,
    exit_tx: oneshot::Sender<ExitResult>,
) {
    let status = tokio::select! {
        status = child.wait() => Some(status),
        _ = token.cancelled() => None,
    };

    let result = match status {
        Some(Ok(status)) => ExitResult::from(status),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Failed to wait for agent process");
            ExitResult::Interrupted
        }
        None => {
            if let Err(e) = child.kill().await {
                tracing::warn!(error = %e, "Failed to kill agent process group");
            }
            if let Err(e) = child.wait().await {
                tracing::warn!(error = %e, "Failed to reap agent process");
            }
            ExitResult::Interrupted
        }
    };

    let _ = exit_tx.send(result);
}
