//! Child process execution.
//!
//! The binary inherits this process's standard streams and receives the
//! argument vector unchanged. A non-zero exit is reported as
//! [`NibbleError::ProcessExitCode`] so `main` can exit with the same code.

use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use anyhow::Result;

use crate::errors::NibbleError;

/// Runs `binary` with `args` and waits for it to finish.
///
/// # Errors
///
/// Returns [`NibbleError::Launch`] if the binary cannot be started, or
/// [`NibbleError::ProcessExitCode`] if it exits with a non-zero status.
pub fn launch<I>(binary: &Path, args: I) -> Result<()>
where
    I: IntoIterator<Item = OsString>,
{
    tracing::debug!(binary = %binary.display(), "launching");

    let status = Command::new(binary)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|source| NibbleError::Launch {
            path: binary.to_path_buf(),
            source,
        })?;

    match exit_code(status) {
        0 => Ok(()),
        code => Err(NibbleError::process_exit_code(code).into()),
    }
}

/// Maps an exit status to a process exit code.
///
/// A child killed by signal N yields `128 + N`.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
