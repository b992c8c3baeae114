//! Command runner for external process execution
//!
//! Every invocation is all-or-nothing: output is buffered up to a fixed
//! bound, the process gets a soft wait cap, and failed attempts are retried
//! according to an explicit `RetryPolicy`.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::config::RetryPolicy;
use crate::error::{Result, SelectError};

/// Captured output of a finished process
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Limits applied to one invocation
#[derive(Debug, Clone, Copy)]
pub struct ProcessLimits {
    /// Combined stdout+stderr bound
    pub max_output_bytes: usize,
    pub wait_cap: Duration,
}

/// Runs one program with fixed limits and retry policy
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: PathBuf,
    limits: ProcessLimits,
    retry: RetryPolicy,
}

impl CommandRunner {
    pub fn new(program: impl Into<PathBuf>, limits: ProcessLimits, retry: RetryPolicy) -> Self {
        Self {
            program: program.into(),
            limits,
            retry,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn limits(&self) -> ProcessLimits {
        self.limits
    }

    /// Same program and retry policy with different limits
    pub fn with_limits(&self, limits: ProcessLimits) -> Self {
        Self {
            limits,
            ..self.clone()
        }
    }

    /// Run the program, retrying retryable failures
    pub async fn run(&self, args: &[String]) -> Result<CommandOutput> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.run_once(args).await {
                Ok(output) => return Ok(output),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        "{} attempt {}/{} failed: {}. Retrying in {:?}",
                        self.program_name(),
                        attempt,
                        max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn run_once(&self, args: &[String]) -> Result<CommandOutput> {
        tracing::debug!("Running {} {}", self.program.display(), args.join(" "));

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SelectError::Config("child stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SelectError::Config("child stderr not captured".to_string()))?;

        let limit = self.limits.max_output_bytes;
        let finished = tokio::time::timeout(self.limits.wait_cap, async {
            let collected = collect_bounded(stdout, stderr, limit).await?;
            let status = match collected {
                Some(_) => Some(child.wait().await?),
                None => None,
            };
            Ok::<_, std::io::Error>((collected, status))
        })
        .await;

        let (collected, status) = match finished {
            Ok(result) => result?,
            Err(_) => {
                let _ = child.start_kill();
                return Err(SelectError::ProcessTimeout {
                    program: self.program_name(),
                    secs: self.limits.wait_cap.as_secs(),
                });
            }
        };

        let (Some((stdout, stderr)), Some(status)) = (collected, status) else {
            let _ = child.start_kill();
            return Err(SelectError::OutputLimitExceeded {
                program: self.program_name(),
                limit,
            });
        };

        let output = CommandOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        };

        if !status.success() {
            return Err(SelectError::ProcessFailed {
                program: self.program_name(),
                status: status.to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(output)
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }
}

/// Drain both pipes concurrently. Returns `None` as soon as the combined
/// size goes over `limit`.
async fn collect_bounded<O, E>(
    mut stdout: O,
    mut stderr: E,
    limit: usize,
) -> std::io::Result<Option<(Vec<u8>, Vec<u8>)>>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut out = Vec::new();
    let mut err = Vec::new();
    let mut out_buf = [0u8; 8192];
    let mut err_buf = [0u8; 8192];
    let mut out_open = true;
    let mut err_open = true;

    while out_open || err_open {
        tokio::select! {
            n = stdout.read(&mut out_buf), if out_open => {
                let n = n?;
                if n == 0 {
                    out_open = false;
                } else {
                    out.extend_from_slice(&out_buf[..n]);
                }
            }
            n = stderr.read(&mut err_buf), if err_open => {
                let n = n?;
                if n == 0 {
                    err_open = false;
                } else {
                    err.extend_from_slice(&err_buf[..n]);
                }
            }
        }
        if out.len() + err.len() > limit {
            return Ok(None);
        }
    }

    Ok(Some((out, err)))
}
