//! # Sandbox runner
//!
//! Executes generated code as a child process with captured output and a
//! wall-clock timeout. The name is historical: there is no filesystem or
//! network isolation and no resource ceiling beyond the timeout, which is
//! why the only execution mode is called `Unconfined`.
//!
//! Each run writes the code to a file keyed by a hash of its content, so
//! two invocations in the same working directory cannot clobber each other.
//! The file is left on disk after the run.

use crate::error::{self, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Default wall-clock limit for a child process
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How generated code is executed.
///
/// There is exactly one mode; the variant name states what the caller gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecMode {
    /// Plain child process: no filesystem/network restriction, no resource
    /// limits beyond the wall-clock timeout
    #[default]
    Unconfined,
}

/// Configuration for the sandbox runner
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Interpreter the code file is handed to
    pub interpreter: String,
    /// File extension for the generated code file
    pub extension: String,
    /// Wall-clock limit for the child process
    pub timeout: Duration,
    /// Directory the code file is written to
    pub work_dir: PathBuf,
    /// Execution mode
    pub mode: ExecMode,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            extension: "py".to_string(),
            timeout: DEFAULT_TIMEOUT,
            work_dir: PathBuf::from("."),
            mode: ExecMode::Unconfined,
        }
    }
}

impl SandboxConfig {
    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.work_dir = dir.as_ref().to_path_buf();
        self
    }
}

/// Classified outcome of one sandbox execution
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Exit code was exactly 0
    Success { stdout: String },
    /// Process completed with a non-zero exit code
    NonZeroExit { code: Option<i32>, stderr: String },
    /// Process did not complete within the wall-clock limit (it is killed)
    TimedOut { limit: Duration },
    /// Process could not be launched at all
    LaunchFailed { reason: String },
}

impl Verdict {
    /// True iff the child exited with code 0
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Success { .. })
    }

    /// Short classification label
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Success { .. } => "success",
            Verdict::NonZeroExit { .. } => "non-zero exit",
            Verdict::TimedOut { .. } => "timeout",
            Verdict::LaunchFailed { .. } => "launch failure",
        }
    }

    /// The captured stream or message describing this outcome
    pub fn detail(&self) -> String {
        match self {
            Verdict::Success { stdout } => stdout.clone(),
            Verdict::NonZeroExit { code, stderr } => {
                let code = code.map(|c| c.to_string()).unwrap_or_else(|| "?".into());
                format!("exit code {}: {}", code, stderr)
            }
            Verdict::TimedOut { limit } => {
                format!("did not complete within {}s", limit.as_secs())
            }
            Verdict::LaunchFailed { reason } => reason.clone(),
        }
    }
}

/// Result of one run: the verdict plus where the code landed on disk
#[derive(Debug, Clone)]
pub struct SandboxRun {
    pub verdict: Verdict,
    pub code_path: PathBuf,
}

/// Runs generated code as a child process with a timeout
#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    config: SandboxConfig,
}

impl Sandbox {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Path the given code text is written to, keyed by its content hash
    pub fn code_path(&self, code: &str) -> PathBuf {
        let digest = Sha256::digest(code.as_bytes());
        let key = &hex::encode(digest)[..12];
        self.config
            .work_dir
            .join(format!("generated_{}.{}", key, self.config.extension))
    }

    /// Write the code to its per-run file and execute it.
    ///
    /// Launch and timeout failures are classified in the verdict rather than
    /// returned as errors; only failing to write the code file is an `Err`.
    pub async fn run(&self, code: &str) -> Result<SandboxRun> {
        let code_path = self.code_path(code);

        tokio::fs::write(&code_path, code).await.map_err(|e| {
            error::io_error(format!(
                "failed to write {}: {}",
                code_path.display(),
                e
            ))
        })?;

        let child = Command::new(&self.config.interpreter)
            .arg(&code_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                return Ok(SandboxRun {
                    verdict: Verdict::LaunchFailed {
                        reason: format!("{}: {}", self.config.interpreter, e),
                    },
                    code_path,
                });
            }
        };

        let verdict = match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await
        {
            Ok(Ok(output)) => {
                if output.status.success() {
                    Verdict::Success {
                        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    }
                } else {
                    Verdict::NonZeroExit {
                        code: output.status.code(),
                        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    }
                }
            }
            Ok(Err(e)) => Verdict::LaunchFailed {
                reason: e.to_string(),
            },
            // Dropping the output future kills the child (kill_on_drop)
            Err(_) => Verdict::TimedOut {
                limit: self.config.timeout,
            },
        };

        Ok(SandboxRun { verdict, code_path })
    }
}
