//! Host process access: shell commands and process exit.

use std::{path::Path, process::Stdio, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandFailure {
    Spawn(String),
    TimedOut(Duration),
    Exited {
        code: Option<i32>,
        output: CommandOutput,
    },
}

impl CommandFailure {
    /// Human-readable summary, in the shape shell users expect.
    pub fn describe(&self, command: &str) -> String {
        match self {
            CommandFailure::Spawn(e) => format!("Failed to spawn shell: {e}"),
            CommandFailure::TimedOut(limit) => {
                format!("Command timed out after {}s: {command}", limit.as_secs())
            }
            CommandFailure::Exited { code, output } => {
                let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
                format!("Command failed ({code}): {command}\n{}", output.stderr)
            }
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        command: &str,
        cwd: Option<&Path>,
        timeout: Duration,
    ) -> Result<CommandOutput, CommandFailure>;
}

/// Runs commands through the host shell (`sh -c`, or `cmd /C` on Windows).
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl ShellRunner {
    fn command(command: &str) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        }
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(
        &self,
        command: &str,
        cwd: Option<&Path>,
        timeout: Duration,
    ) -> Result<CommandOutput, CommandFailure> {
        let mut cmd = Self::command(command);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let child = cmd
            .spawn()
            .map_err(|e| CommandFailure::Spawn(e.to_string()))?;
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| CommandFailure::TimedOut(timeout))?
            .map_err(|e| CommandFailure::Spawn(e.to_string()))?;

        let captured = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if output.status.success() {
            Ok(captured)
        } else {
            Err(CommandFailure::Exited {
                code: output.status.code(),
                output: captured,
            })
        }
    }
}

/// Ends the process once the current response has had time to flush.
pub trait Terminator: Send + Sync {
    fn schedule_exit(&self, delay: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessTerminator;

impl Terminator for ProcessTerminator {
    fn schedule_exit(&self, delay: Duration) {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::info!("Stopping server");
            std::process::exit(0);
        });
    }
}
