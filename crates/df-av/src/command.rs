//! Builder for running external tools, and the runner seam used to swap in
//! fakes under test.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use df_core::{Error, Result};
use tokio::process::Command;

/// Output captured from a finished tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stdout followed by stderr, as a user would see them on a terminal.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        if !out.is_empty() && !out.ends_with('\n') && !self.stderr.is_empty() {
            out.push('\n');
        }
        out.push_str(&self.stderr);
        out
    }
}

/// A builder for external tool invocations.
///
/// # Example
///
/// ```no_run
/// use df_av::ToolCommand;
///
/// # async fn example() -> df_core::Result<()> {
/// let mut cmd = ToolCommand::new("ffmpeg");
/// cmd.args(["-v", "error", "-i", "talk.avi"]);
/// let output = cmd.output().await?;
/// println!("{}", output.stderr);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Append a path argument.
    pub fn path_arg(&mut self, path: &Path) -> &mut Self {
        self.arg(path.to_string_lossy())
    }

    /// Kill the process if it runs longer than `d`. Unbounded by default.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = Some(d);
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Short tool name used in errors and logs.
    pub fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.to_string_lossy().into_owned())
    }

    /// The full command line, space-separated.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the command and capture its output without checking the exit
    /// status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tool`] if the process cannot be spawned, cannot be
    /// waited on, or outlives its timeout.
    pub async fn output(&self) -> Result<ToolOutput> {
        let tool = self.tool_name();
        tracing::debug!("Running: {}", self.command_line());

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| Error::tool(&tool, format!("failed to spawn: {e}")))?;

        let waited = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| Error::tool(&tool, format!("timed out after {limit:?}")))?,
            None => child.wait_with_output().await,
        };
        let output =
            waited.map_err(|e| Error::tool(&tool, format!("I/O error waiting for process: {e}")))?;

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run the command and fail with [`Error::Tool`] on a non-zero exit.
    pub async fn execute(&self) -> Result<ToolOutput> {
        let output = self.output().await?;
        if !output.success() {
            return Err(Error::tool(
                self.tool_name(),
                format!(
                    "exited with {}: {}",
                    describe_exit(output.code),
                    output.stderr.trim()
                ),
            ));
        }
        Ok(output)
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".into(),
    }
}

/// Build a [`Error::Conversion`] for a process that ran and failed.
pub fn conversion_failure(message: impl Into<String>, cmd: &ToolCommand, output: &ToolOutput) -> Error {
    Error::Conversion {
        message: message.into(),
        command: Some(cmd.command_line()),
        exit_code: output.code,
        output: output.combined(),
    }
}

/// Executes [`ToolCommand`]s. Every component that shells out goes through
/// this trait.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run `cmd` to completion and return its captured output, whatever the
    /// exit status.
    async fn run(&self, cmd: &ToolCommand) -> Result<ToolOutput>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl ToolRunner for SystemRunner {
    async fn run(&self, cmd: &ToolCommand) -> Result<ToolOutput> {
        cmd.output().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_joins_program_and_args() {
        let mut cmd = ToolCommand::new("/usr/bin/ffmpeg");
        cmd.args(["-v", "error"]).path_arg(Path::new("/tmp/a b.avi"));
        assert_eq!(cmd.command_line(), "/usr/bin/ffmpeg -v error /tmp/a b.avi");
        assert_eq!(cmd.tool_name(), "ffmpeg");
        assert_eq!(cmd.get_args(), ["-v", "error", "/tmp/a b.avi"]);
    }

    #[test]
    fn combined_output_keeps_both_streams() {
        let out = ToolOutput {
            code: Some(1),
            stdout: "frame=1".into(),
            stderr: "error".into(),
        };
        assert_eq!(out.combined(), "frame=1\nerror");
        assert!(!out.success());
    }

    #[test]
    fn conversion_failure_carries_process_details() {
        let mut cmd = ToolCommand::new("swfrender");
        cmd.args(["s1.swf", "-o", "s1.png"]);
        let out = ToolOutput {
            code: Some(3),
            stdout: String::new(),
            stderr: "bad swf".into(),
        };
        match conversion_failure("Failed to convert s1.swf", &cmd, &out) {
            Error::Conversion {
                command,
                exit_code,
                output,
                ..
            } => {
                assert_eq!(command.as_deref(), Some("swfrender s1.swf -o s1.png"));
                assert_eq!(exit_code, Some(3));
                assert_eq!(output, "bad swf");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn output_reports_nonzero_exit() {
        let mut cmd = ToolCommand::new("sh");
        cmd.args(["-c", "echo out; echo err >&2; exit 2"]);
        let out = SystemRunner.run(&cmd).await.unwrap();
        assert_eq!(out.code, Some(2));
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
        assert!(cmd.execute().await.is_err());
    }

    #[tokio::test]
    async fn nonexistent_tool_is_tool_error() {
        let result = ToolCommand::new("nonexistent_tool_xyz_12345").output().await;
        assert!(matches!(result, Err(Error::Tool { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_is_enforced() {
        let mut cmd = ToolCommand::new("sleep");
        cmd.arg("5").timeout(Duration::from_millis(50));
        let err = cmd.output().await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
