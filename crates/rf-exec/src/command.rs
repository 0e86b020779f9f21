//! Builder for one-shot external tool invocations.

use std::path::PathBuf;
use std::process::ExitStatus;

use tokio::process::Command;

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations that
/// buffer their complete output.
///
/// MakeMKV's `makemkvcon` exits with code 1 for "completed with warnings";
/// [`ToolCommand::execute`] treats that as success and returns stdout as the
/// result. Any other nonzero exit code is an error carrying the decoded
/// stderr.
///
/// # Example
///
/// ```no_run
/// use rf_exec::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> rf_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("makemkvcon"))
///     .arg("-r")
///     .arg("info")
///     .arg("disc:0")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
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

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - [`rf_core::Error::Launch`] if the process cannot be spawned.
    /// - [`rf_core::Error::Tool`] if the exit code is neither 0 nor 1; the
    ///   error carries the captured stderr.
    pub async fn execute(&self) -> rf_core::Result<ToolOutput> {
        let tool_name = self
            .program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.to_string_lossy().into_owned());

        tracing::debug!("Executing: {} {:?}", self.program.display(), self.args);

        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|e| rf_core::Error::launch(&tool_name, e))?;

        let tool_output = ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        // Exit code 1 means "completed with warnings" for makemkvcon; the
        // stdout still holds a usable scan.
        match tool_output.status.code() {
            Some(0) | Some(1) => Ok(tool_output),
            code => Err(rf_core::Error::tool(
                tool_name,
                code,
                tool_output.stderr.trim(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_captures_stdout() {
        let output = ToolCommand::new(PathBuf::from("/bin/sh"))
            .arg("-c")
            .arg("echo hello")
            .execute()
            .await
            .unwrap();
        assert!(output.status.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn exit_code_one_is_success_with_stdout() {
        let output = ToolCommand::new(PathBuf::from("/bin/sh"))
            .arg("-c")
            .arg("echo warned; exit 1")
            .execute()
            .await
            .unwrap();
        assert_eq!(output.status.code(), Some(1));
        assert_eq!(output.stdout.trim(), "warned");
    }

    #[tokio::test]
    async fn other_exit_codes_carry_stderr() {
        let err = ToolCommand::new(PathBuf::from("/bin/sh"))
            .arg("-c")
            .arg("echo broken 1>&2; exit 2")
            .execute()
            .await
            .unwrap_err();

        match err {
            rf_core::Error::Tool { code, stderr, .. } => {
                assert_eq!(code, Some(2));
                assert_eq!(stderr, "broken");
            }
            other => panic!("expected Tool error, got {other}"),
        }
    }

    #[tokio::test]
    async fn nonexistent_program_is_launch_error() {
        let err = ToolCommand::new(PathBuf::from("/nonexistent/ripforge-test-tool"))
            .execute()
            .await
            .unwrap_err();
        assert!(matches!(err, rf_core::Error::Launch { .. }));
    }
}
