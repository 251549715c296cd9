//! Plugin requirement installation.
//!
//! The registry only cares whether installation succeeded. How packages are
//! fetched is up to the configured [`DependencyInstaller`].

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use sentir_core::{Error, Result};

/// Installs the requirements a plugin declares before it is activated.
#[async_trait]
pub trait DependencyInstaller: Send + Sync {
    async fn install(&self, plugin: &str, requirements: &[String]) -> Result<()>;
}

/// Installer that assumes everything is already present.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInstaller;

#[async_trait]
impl DependencyInstaller for NoopInstaller {
    async fn install(&self, plugin: &str, requirements: &[String]) -> Result<()> {
        if !requirements.is_empty() {
            debug!(plugin, count = requirements.len(), "Skipping requirement installation");
        }
        Ok(())
    }
}

/// Runs an external command with the requirements appended as arguments,
/// e.g. `pip install --user`.
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    program: String,
    args: Vec<String>,
}

impl CommandInstaller {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parses a whitespace-separated command line. Empty input yields `None`.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }
}

#[async_trait]
impl DependencyInstaller for CommandInstaller {
    async fn install(&self, plugin: &str, requirements: &[String]) -> Result<()> {
        if requirements.is_empty() {
            return Ok(());
        }
        info!(
            plugin,
            program = %self.program,
            requirements = ?requirements,
            "Installing plugin requirements"
        );

        let output = Command::new(&self.program)
            .args(&self.args)
            .args(requirements)
            .output()
            .await
            .map_err(|e| {
                Error::Configuration(format!("failed to run {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr.lines().rev().take(3).collect::<Vec<_>>().join(" | ");
            return Err(Error::Configuration(format!(
                "installing requirements for '{}' failed ({}): {}",
                plugin, output.status, tail
            )));
        }
        Ok(())
    }
}
