//! One-shot command invocation with captured output
//!
//! Every short-lived tool call (device listing, settings toggles, screen
//! capture, input injection) goes through [`run`]. The call awaits the child
//! asynchronously, so a slow tool stalls only the request or capture cycle
//! that issued it.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use adcon_core::prelude::*;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

/// Output cap for text commands
pub const TEXT_OUTPUT_LIMIT: usize = 10 * 1024 * 1024;

/// Output cap for binary commands (screen captures)
pub const BINARY_OUTPUT_LIMIT: usize = 15 * 1024 * 1024;

/// Options for a single invocation
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Maximum bytes accepted on either stream. Exceeding it fails the run.
    pub max_output: usize,
    /// Kill the child and fail the run after this long
    pub timeout: Option<Duration>,
    pub cwd: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_output: TEXT_OUTPUT_LIMIT,
            timeout: None,
            cwd: None,
        }
    }
}

impl RunOptions {
    /// Options for commands that emit binary payloads
    pub fn binary() -> Self {
        Self {
            max_output: BINARY_OUTPUT_LIMIT,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Uniform result of one invocation.
///
/// A nonzero exit is not an error at this level; only a failure to execute
/// (missing binary, spawn error, output cap, timeout) sets [`error`](Self::error).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status, or -1 when none is available
    pub status: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub error: Option<String>,
}

impl CommandOutput {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            status: -1,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// True iff the command ran and exited with status 0
    pub fn ok(&self) -> bool {
        self.error.is_none() && self.status == 0
    }

    /// Stdout as trimmed text
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }

    /// Stderr as trimmed text
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }

    /// The most descriptive failure text available: execution error, then
    /// stderr, then stdout, then `fallback`
    pub fn failure_message(&self, fallback: &str) -> String {
        if let Some(err) = &self.error {
            return err.clone();
        }
        let stderr = self.stderr_text();
        if !stderr.is_empty() {
            return stderr;
        }
        let stdout = self.stdout_text();
        if !stdout.is_empty() {
            return stdout;
        }
        fallback.to_string()
    }

    /// Convert a failed run into [`Error::Upstream`] carrying the tool's text
    pub fn into_result(self, fallback: &str) -> Result<CommandOutput> {
        if self.ok() {
            Ok(self)
        } else {
            Err(Error::upstream(self.failure_message(fallback)))
        }
    }
}

/// Run `program` with `args` to completion.
///
/// Never fails: execution problems are reported through
/// [`CommandOutput::error`] with `ok() == false`.
pub async fn run<I, S>(program: &str, args: I, options: &RunOptions) -> CommandOutput
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("{} not found: {}", program, e);
            return CommandOutput::failed(Error::tool_not_found(program).to_string());
        }
        Err(e) => {
            warn!("Failed to spawn {}: {}", program, e);
            return CommandOutput::failed(Error::spawn(format!("{}: {}", program, e)).to_string());
        }
    };

    let collected = match options.timeout {
        Some(limit) => match tokio::time::timeout(limit, collect(&mut child, options.max_output))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                // kill_on_drop reaps the child once it goes out of scope
                let _ = child.start_kill();
                Err(Error::timeout(program, limit.as_millis() as u64))
            }
        },
        None => collect(&mut child, options.max_output).await,
    };

    match collected {
        Ok(output) => {
            trace!("{} exited with {}", program, output.status);
            output
        }
        Err(e) => {
            debug!("{} failed: {}", program, e);
            CommandOutput::failed(e.to_string())
        }
    }
}

async fn collect(child: &mut Child, limit: usize) -> Result<CommandOutput> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let streams = tokio::try_join!(read_capped(stdout, limit), read_capped(stderr, limit));
    let (stdout, stderr) = match streams {
        Ok(pair) => pair,
        Err(e) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            return Err(e);
        }
    };

    let status = child.wait().await?;
    Ok(CommandOutput {
        status: status.code().unwrap_or(-1),
        stdout,
        stderr,
        error: None,
    })
}

async fn read_capped<R: AsyncRead + Unpin>(reader: Option<R>, limit: usize) -> Result<Vec<u8>> {
    let Some(reader) = reader else {
        return Ok(Vec::new());
    };
    let mut buf = Vec::new();
    reader.take(limit as u64 + 1).read_to_end(&mut buf).await?;
    if buf.len() > limit {
        return Err(Error::OutputTooLarge { limit });
    }
    Ok(buf)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_success_captures_stdout() {
        let out = run("sh", ["-c", "echo '  hello  '"], &RunOptions::default()).await;
        assert!(out.ok());
        assert_eq!(out.status, 0);
        assert_eq!(out.stdout_text(), "hello");
    }

    #[tokio::test]
    async fn test_run_nonzero_exit_is_not_an_error() {
        let out = run("sh", ["-c", "echo boom >&2; exit 3"], &RunOptions::default()).await;
        assert!(!out.ok());
        assert_eq!(out.status, 3);
        assert!(out.error.is_none());
        assert_eq!(out.failure_message("fallback"), "boom");
    }

    #[tokio::test]
    async fn test_run_missing_binary_reports_error() {
        let out = run(
            "/definitely/not/a/real/tool",
            ["devices"],
            &RunOptions::default(),
        )
        .await;
        assert!(!out.ok());
        assert_eq!(out.status, -1);
        let msg = out.error.expect("error set");
        assert!(msg.contains("not found"), "{}", msg);
    }

    #[tokio::test]
    async fn test_run_output_cap_fails_instead_of_truncating() {
        let options = RunOptions {
            max_output: 16,
            ..RunOptions::default()
        };
        let out = run("sh", ["-c", "head -c 4096 /dev/zero"], &options).await;
        assert!(!out.ok());
        assert!(out.error.unwrap().contains("exceeded 16 bytes"));
    }

    #[tokio::test]
    async fn test_run_timeout() {
        let options = RunOptions::default().with_timeout(Some(Duration::from_millis(100)));
        let started = std::time::Instant::now();
        let out = run("sh", ["-c", "sleep 5"], &options).await;
        assert!(!out.ok());
        assert!(out.error.unwrap().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_failure_message_fallback_order() {
        let out = CommandOutput {
            status: 1,
            stdout: b"only stdout\n".to_vec(),
            ..CommandOutput::default()
        };
        assert_eq!(out.failure_message("fallback"), "only stdout");

        let out = CommandOutput {
            status: 1,
            ..CommandOutput::default()
        };
        assert_eq!(out.failure_message("Install failed"), "Install failed");
        assert!(matches!(
            out.into_result("Install failed"),
            Err(Error::Upstream(msg)) if msg == "Install failed"
        ));
    }
}
