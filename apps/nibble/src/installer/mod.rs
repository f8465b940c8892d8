//! Installation pipeline for the nibble release binary.
//!
//! Resolves the host platform, downloads the matching release archive,
//! verifies it against the published checksums, extracts the executable into
//! the per-user cache and launches it.
//!
//! ## Module Structure
//!
//! - [`platform`] - OS and architecture resolution
//! - [`version`] - Release version normalisation
//! - [`paths`] - Install cache layout
//! - [`release`] - Release asset names and URLs
//! - [`transport`] - HTTP transport and ordered candidate lookup
//! - [`download`] - Release archive download
//! - [`verify`] - SHA-256 checksum verification
//! - [`archive`] - ZIP and TAR extraction
//! - [`install`] - Cache-hit / cache-miss orchestration
//! - [`interrupt`] - Ctrl-C removal of in-progress work directories
//! - [`launch`] - Child process execution
//! - `source` - `go install` strategy (feature `source-install`)

#[cfg(not(feature = "source-install"))]
pub mod archive;
#[cfg(not(feature = "source-install"))]
pub mod download;
#[cfg(not(feature = "source-install"))]
pub mod install;
#[cfg(not(feature = "source-install"))]
pub mod interrupt;
pub mod launch;
#[cfg(not(feature = "source-install"))]
pub mod paths;
pub mod platform;
#[cfg(not(feature = "source-install"))]
pub mod release;
#[cfg(feature = "source-install")]
pub mod source;
#[cfg(not(feature = "source-install"))]
pub mod transport;
#[cfg(not(feature = "source-install"))]
pub mod verify;
pub mod version;

#[cfg(not(feature = "source-install"))]
pub use install::ensure_installed;
pub use launch::launch;
#[cfg(feature = "source-install")]
pub use source::ensure_installed_from_source;
#[cfg(not(feature = "source-install"))]
pub use transport::HttpTransport;
