//! Docker CLI execution

use std::io;

use async_trait::async_trait;
use tokio::process::Command;

/// Captured output of a docker invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given stderr
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Executes docker commands; swapped for a mock in tests
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DockerRunner: Send + Sync {
    /// Run `docker <args>` and capture its output.
    ///
    /// Only failure to spawn the process is an `Err`; a non-zero exit is
    /// reported through [`CommandOutput::success`].
    async fn run(&self, args: Vec<String>) -> io::Result<CommandOutput>;
}

/// Runs the real docker binary
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new(crate::config::defaults::DOCKER_BINARY)
    }
}

#[async_trait]
impl DockerRunner for DockerCli {
    async fn run(&self, args: Vec<String>) -> io::Result<CommandOutput> {
        tracing::debug!("Executing docker command: {} {}", self.binary, args.join(" "));

        let output = Command::new(&self.binary)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
