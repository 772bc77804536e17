//! Invocation of external media tools (ffprobe, ffmpeg).

use std::ffi::OsStr;
use std::path::Path;
use std::process::Output;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub(crate) enum ToolError {
    #[error("refusing to pass {0} to an external tool")]
    UnsafePath(String),

    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Paths are handed to tools as positional arguments, so one that looks like an
/// option would be parsed as such.
pub(crate) fn check_media_path(path: &Path) -> Result<(), ToolError> {
    let raw = path.as_os_str().to_string_lossy();
    if raw.is_empty() || raw.starts_with('-') {
        return Err(ToolError::UnsafePath(raw.into_owned()));
    }
    Ok(())
}

/// Run `program` to completion and return its output if it exited successfully.
pub(crate) async fn run_tool<I, A>(program: &str, args: I) -> Result<Output, ToolError>
where
    I: IntoIterator<Item = A>,
    A: AsRef<OsStr>,
{
    let start = std::time::Instant::now();

    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| ToolError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::warn!(
            process.executable.name = %program,
            exit_status = %output.status,
            stderr = %stderr,
            duration_ms = duration_ms,
            "External tool failed"
        );
        return Err(ToolError::Exit {
            program: program.to_string(),
            status: output.status,
            stderr,
        });
    }

    tracing::debug!(
        process.executable.name = %program,
        duration_ms = duration_ms,
        "External tool finished"
    );

    Ok(output)
}
