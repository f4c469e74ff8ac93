//! Running external tools.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;

use crate::error::TaskError;

/// Run `program` to completion and return its stdout.
///
/// The child is killed if the returned future is dropped, which is how task
/// cancellation and deadlines reach the tool.
pub(crate) async fn run_tool<I, S>(program: &Path, args: I) -> Result<String, TaskError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| TaskError::operation(format!("failed to run {}: {e}", program.display())))?;

    if !output.status.success() {
        return Err(TaskError::Operation(failure_message(
            program,
            output.status,
            &output.stderr,
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// The tool's own last error lines, or a generic message when it printed none.
pub(crate) fn failure_message(program: &Path, status: ExitStatus, stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("{} exited with {status}", program.display())
    } else {
        stderr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_is_operation_error() {
        let err = run_tool(Path::new("/nonexistent/streammate-tool"), ["--version"])
            .await
            .unwrap_err();

        match err {
            TaskError::Operation(message) => {
                assert!(message.starts_with("failed to run /nonexistent/streammate-tool"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stderr_is_passed_through() {
        let err = run_tool(Path::new("sh"), ["-c", "echo 'ERROR: no such video' >&2; exit 1"])
            .await
            .unwrap_err();

        assert_eq!(err, TaskError::operation("ERROR: no such video"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdout_is_returned() {
        let out = run_tool(Path::new("sh"), ["-c", "echo /tmp/clip.mp4"]).await.unwrap();
        assert_eq!(out.trim(), "/tmp/clip.mp4");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn silent_failure_mentions_status() {
        let err = run_tool(Path::new("sh"), ["-c", "exit 3"]).await.unwrap_err();
        assert!(err.to_string().starts_with("sh exited with"));
    }
}
