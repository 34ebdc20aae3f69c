//! Pre-push image test step
//!
//! The push never runs against an untested image unless the user opts out.
//! The step itself is an external collaborator behind [`TestStep`]; the
//! default implementation shells out to the project's configured command.

use crate::error::{PushError, Result};
use async_trait::async_trait;
use tokio::process::Command;

#[async_trait]
pub trait TestStep: Send + Sync {
    /// Run the image tests for one environment and version. Any failure is
    /// fatal and must surface before the push is attempted.
    async fn run(&self, environment: &str, version: &str) -> Result<()>;
}

/// Runs the configured test command with environment and version appended
/// as its last two arguments.
pub struct CommandTestStep {
    program: String,
    args: Vec<String>,
}

impl CommandTestStep {
    pub fn new(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| PushError::Config("test command is empty".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

#[async_trait]
impl TestStep for CommandTestStep {
    async fn run(&self, environment: &str, version: &str) -> Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(environment)
            .arg(version)
            .status()
            .await
            .map_err(|e| PushError::Preflight(format!("cannot run '{}': {}", self.program, e)))?;
        if status.success() {
            Ok(())
        } else {
            Err(PushError::Preflight(format!(
                "'{}' exited with {}",
                self.program, status
            )))
        }
    }
}
