//! Subprocess execution for per-package runs
//!
//! Every package runs the scorecard command as a separate OS process in its
//! own directory, so packages never share in-process state and one
//! package's crash cannot corrupt another's run. Output is always captured;
//! whether it gets echoed is the caller's choice via `CommandContext`.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

/// Captured outcome of one subprocess invocation.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Whether the process ran and exited zero
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub return_code: Option<i32>,
    /// Spawn-level error, if the process never ran
    pub error: Option<String>,
}

impl ProcessOutput {
    fn spawn_failure(error: String) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: String::new(),
            return_code: None,
            error: Some(error),
        }
    }

    /// Human-readable failure reason.
    pub fn failure_reason(&self) -> String {
        if let Some(ref error) = self.error {
            error.clone()
        } else {
            format!(
                "exited with code {}",
                self.return_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            )
        }
    }
}

/// Run a command in `cwd` with captured stdout/stderr.
pub fn run_process(program: &str, args: &[String], cwd: &Path) -> ProcessOutput {
    debug!("Running {} {:?} in {:?}", program, args, cwd);

    let output = match Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
    {
        Ok(output) => output,
        Err(e) => {
            let reason = if e.kind() == std::io::ErrorKind::NotFound {
                format!("command '{}' not found", program)
            } else {
                format!("failed to spawn '{}': {}", program, e)
            };
            return ProcessOutput::spawn_failure(reason);
        }
    };

    ProcessOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        return_code: output.status.code(),
        error: None,
    }
}
