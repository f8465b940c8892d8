//! Error types for the nibble launcher.
//!
//! This module defines the `NibbleError` enum which names every failure the
//! fetch-verify-cache pipeline can report. Pipeline functions return
//! `anyhow::Result` and raise these variants where a distinct kind matters, so
//! callers and tests can recover the kind with `downcast_ref::<NibbleError>()`.

use std::path::PathBuf;
use thiserror::Error;

/// Consolidated error type for launcher operations.
#[derive(Debug, Error)]
pub enum NibbleError {
    /// Host OS or architecture has no release build.
    #[error("unsupported platform: system={system}, arch={machine}")]
    UnsupportedPlatform {
        /// Raw OS identifier as reported by the host.
        system: String,
        /// Raw architecture identifier as reported by the host.
        machine: String,
    },

    /// The release version is not a semantic version.
    #[error("invalid release version '{version}': {message}")]
    InvalidVersion {
        /// The rejected version string.
        version: String,
        /// Parser diagnostic.
        message: String,
    },

    /// Every candidate archive name was reported missing by the release host.
    #[error("no release asset found for {platform} at v{version} (tried: {})", .tried.join(", "))]
    AssetNotFound {
        /// Platform in `os/arch` form.
        platform: String,
        /// Normalised release version.
        version: String,
        /// Archive names in the order they were attempted.
        tried: Vec<String>,
    },

    /// Every candidate checksum manifest name was reported missing.
    #[error("no checksum file found for v{version} (tried: {})", .tried.join(", "))]
    ManifestNotFound {
        /// Normalised release version.
        version: String,
        /// Manifest names in the order they were attempted.
        tried: Vec<String>,
    },

    /// The manifest exists but does not list the downloaded archive.
    #[error("checksum for {archive} not found in {manifest}")]
    ChecksumKeyMissing {
        /// Archive file name that was looked up.
        archive: String,
        /// Manifest file name that was consulted.
        manifest: String,
    },

    /// The archive digest disagrees with the manifest.
    #[error("checksum mismatch for {archive}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Archive file name.
        archive: String,
        /// Digest listed in the manifest.
        expected: String,
        /// Digest computed from the downloaded file.
        actual: String,
    },

    /// No entry in the archive carries an accepted executable name.
    #[error("binary not found inside release archive")]
    BinaryNotFoundInArchive,

    /// The archive uses a compression this launcher cannot decode.
    #[error("unsupported archive compression: {compression}")]
    UnsupportedArchive {
        /// Name of the detected compression.
        compression: String,
    },

    /// Network failure other than "not found".
    #[error("transport error: {message}")]
    Transport {
        /// Description of the failed request.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Installing through the Go toolchain failed.
    #[error("source install failed: {message}")]
    SourceInstall {
        /// Description of the failure.
        message: String,
    },

    /// The cached binary could not be started.
    #[error("failed to execute {}", .path.display())]
    Launch {
        /// Binary that failed to spawn.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Child process exited with non-zero code.
    ///
    /// The code is propagated as the launcher's own exit status without
    /// printing anything; the child already reported on its own streams.
    #[error("process exited with code {code}")]
    ProcessExitCode {
        /// The exit code from the child.
        code: i32,
    },
}

impl NibbleError {
    /// Creates a new `UnsupportedPlatform` error.
    #[must_use]
    pub fn unsupported_platform(system: impl Into<String>, machine: impl Into<String>) -> Self {
        Self::UnsupportedPlatform {
            system: system.into(),
            machine: machine.into(),
        }
    }

    /// Creates a new `Transport` error without a source.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new `Transport` error with a source error.
    #[must_use]
    pub fn transport_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a new `SourceInstall` error.
    #[must_use]
    #[cfg_attr(not(feature = "source-install"), allow(dead_code))]
    pub fn source_install(message: impl Into<String>) -> Self {
        Self::SourceInstall {
            message: message.into(),
        }
    }

    /// Creates a new `ProcessExitCode` error.
    #[must_use]
    pub const fn process_exit_code(code: i32) -> Self {
        Self::ProcessExitCode { code }
    }
}
