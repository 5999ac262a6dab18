use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Last chunk of stderr, enough to diagnose without flooding logs.
    pub fn stderr_tail(&self) -> String {
        let stderr = String::from_utf8_lossy(&self.stderr);
        let trimmed = stderr.trim();
        let count = trimmed.chars().count();
        if count <= 500 {
            return trimmed.to_string();
        }
        trimmed.chars().skip(count - 500).collect()
    }
}

#[derive(Debug, Clone)]
pub enum CommandOutcome {
    Finished(CommandOutput),
    TimedOut,
}

#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        deadline: Duration,
    ) -> std::io::Result<CommandOutcome>;
}

#[derive(Debug, Default)]
pub struct SystemCommandExecutor;

#[async_trait]
impl CommandExecutor for SystemCommandExecutor {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        deadline: Duration,
    ) -> std::io::Result<CommandOutcome> {
        let mut command = Command::new(program);
        command
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .args(args);
        // Dropping the future on timeout kills the child.
        match timeout(deadline, command.output()).await {
            Ok(Ok(output)) => Ok(CommandOutcome::Finished(CommandOutput {
                exit_code: output.status.code(),
                stdout: output.stdout,
                stderr: output.stderr,
            })),
            Ok(Err(err)) => Err(err),
            Err(_) => Ok(CommandOutcome::TimedOut),
        }
    }
}
