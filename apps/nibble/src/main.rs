#![warn(clippy::pedantic)]
#![cfg_attr(feature = "source-install", allow(dead_code))]

//! # nibble launcher
//!
//! The `nibble` command installs and runs the nibble network scanner. On first
//! use for a given version it downloads the release archive for the host
//! platform, verifies it against the release checksums and caches the
//! executable under the per-user data directory. Every run then executes the
//! cached binary with this process's arguments and exits with its status.
//!
//! The launcher defines no flags of its own; everything after the program
//! name is forwarded unchanged.
//!
//! ## Exit Codes
//!
//! - the scanner's own exit code once it has been launched
//! - `1` if installation or launching fails
//! - `130` if an install is interrupted with Ctrl-C
//!
//! ## Environment
//!
//! See [`config`] for the variables consulted. `NIBBLE_LOG` sets the tracing
//! filter (default `warn`); diagnostics go to stderr.
//!
//! ## Examples
//!
//! ```bash
//! nibble --help
//! NIBBLE_VERSION=1.2.0 nibble scan 192.168.1.0/24
//! ```

mod config;
mod errors;
mod installer;

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use config::{Environment, InstallerConfig, LOG_ENV};
use errors::NibbleError;

/// Initialise the tracing subscriber for diagnostics on stderr.
///
/// The filter comes from `NIBBLE_LOG` and defaults to `warn`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() {
    init_tracing();

    if let Err(e) = run() {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Handles an error and returns the appropriate exit code.
///
/// For `ProcessExitCode` errors, returns the embedded exit code without
/// printing anything (the scanner already reported on its own streams).
/// Launch failures and install failures are printed with distinct prefixes
/// and exit with code 1.
fn handle_error(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<NibbleError>() {
        Some(NibbleError::ProcessExitCode { code }) => *code,
        Some(NibbleError::Launch { .. }) => {
            eprintln!("nibble launch error: {e:#}");
            1
        }
        _ => {
            eprintln!("nibble install error: {e:#}");
            1
        }
    }
}

fn run() -> Result<()> {
    let env = Environment::from_process();
    let config = InstallerConfig::from_environment(&env)?;
    tracing::debug!(version = %config.version, "nibble launcher starting");

    let binary = install(&env, &config)?;
    installer::launch(&binary, std::env::args_os().skip(1))
}

#[cfg(not(feature = "source-install"))]
fn install(_env: &Environment, config: &InstallerConfig) -> Result<std::path::PathBuf> {
    let transport = installer::HttpTransport::new()?;
    installer::ensure_installed(config, &transport)
}

#[cfg(feature = "source-install")]
fn install(env: &Environment, config: &InstallerConfig) -> Result<std::path::PathBuf> {
    installer::ensure_installed_from_source(env, config)
}
