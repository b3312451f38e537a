//! Optional shell command run before the workflow starts.
//!
//! Typically fetches or regenerates the file that is about to be uploaded.

use std::process::Command;

use crate::error::LoaderError;

/// Captured result of a pre-command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreCommandOutput {
    /// Combined stdout and stderr.
    pub output: String,
    pub success: bool,
    pub status: String,
}

/// Runs `command` through the platform shell and captures its output.
///
/// Only a failure to spawn the shell is an error; a non-zero exit is
/// reported through [`PreCommandOutput::success`].
pub fn run_pre_command(command: &str) -> Result<PreCommandOutput, LoaderError> {
    let output = shell(command).output()?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(PreCommandOutput {
        output: combined.trim_end().to_string(),
        success: output.status.success(),
        status: output.status.to_string(),
    })
}

/// Runs the pre-command and turns a non-zero exit into an error.
pub fn ensure_pre_command(command: &str) -> Result<(), LoaderError> {
    tracing::debug!(command, "Running pre-command");
    let result = run_pre_command(command)?;

    if !result.success {
        return Err(LoaderError::PreCommandFailed {
            status: result.status,
            output: result.output,
        });
    }

    tracing::debug!(output = %result.output, "Pre-command ran successfully");
    Ok(())
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
