//! Running system tools

use ddm_host_api::{HostError, HostResult};
use std::path::Path;
use std::process::{Command, Output};
use tracing::debug;

/// Run `program` and capture its output, whatever the exit status
pub fn capture(program: impl AsRef<Path>, args: &[&str]) -> HostResult<Output> {
    let program = program.as_ref();
    debug!(program = %program.display(), ?args, "Running command");
    Command::new(program).args(args).output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            HostError::NotFound(program.display().to_string())
        } else {
            HostError::command_failed(program.display().to_string(), e.to_string())
        }
    })
}

/// Run `program` and return trimmed stdout; a non-zero exit is an error
pub fn run_command(program: impl AsRef<Path>, args: &[&str]) -> HostResult<String> {
    let program = program.as_ref();
    let output = capture(program, args)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(HostError::command_failed(
            program.display().to_string(),
            format!("{}: {}", output.status, stderr.trim()),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_not_found() {
        let err = run_command("/nonexistent/ddm-test-binary", &[]).unwrap_err();
        assert!(matches!(err, HostError::NotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn captures_trimmed_stdout() {
        let out = run_command("/bin/echo", &["  hello  "]).unwrap();
        assert_eq!(out, "hello");
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_command_failed() {
        let err = run_command("/bin/sh", &["-c", "exit 3"]).unwrap_err();
        assert!(matches!(err, HostError::CommandFailed { .. }));
    }
}
