//! Launcher configuration.
//!
//! Ambient state (home directory, environment overrides) is captured once in
//! an [`Environment`] and turned into an [`InstallerConfig`] that every
//! pipeline stage receives explicitly. Nothing below `main` reads the process
//! environment on its own, which lets tests drive the pipeline with fabricated
//! environments.
//!
//! ## Environment Variables
//!
//! - `NIBBLE_HOME` - install root override
//! - `LOCALAPPDATA` - Windows base directory for the install root
//! - `NIBBLE_DIST_SERVER` - release host override (default: `https://github.com`)
//! - `NIBBLE_VERSION` - release version override (default: this package's version)
//! - `GOBIN`, `GOPATH` - consulted by the Go toolchain strategy only

use anyhow::Result;
use std::path::PathBuf;

#[cfg(not(feature = "source-install"))]
use crate::installer::paths::InstallPaths;
use crate::installer::version::ReleaseVersion;

/// Project name used in asset names, the cache layout and the binary name.
pub const PROJECT: &str = "nibble";

/// GitHub repository publishing the release assets.
pub const REPO: &str = "backendsystems/nibble";

/// Default release host.
pub const DEFAULT_DIST_SERVER: &str = "https://github.com";

/// Environment variable overriding the install root.
pub const NIBBLE_HOME_ENV: &str = "NIBBLE_HOME";

/// Environment variable overriding the release host.
pub const DIST_SERVER_ENV: &str = "NIBBLE_DIST_SERVER";

/// Environment variable overriding the release version.
pub const VERSION_ENV: &str = "NIBBLE_VERSION";

/// Environment variable holding the tracing filter directive.
pub const LOG_ENV: &str = "NIBBLE_LOG";

/// Snapshot of the ambient state the launcher depends on.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// The user's home directory.
    pub home: Option<PathBuf>,
    /// `%LOCALAPPDATA%` (consulted on Windows only).
    pub local_app_data: Option<PathBuf>,
    /// `NIBBLE_HOME` override.
    pub nibble_home: Option<PathBuf>,
    /// `NIBBLE_DIST_SERVER` override.
    pub dist_server: Option<String>,
    /// `NIBBLE_VERSION` override.
    pub version: Option<String>,
    /// `GOBIN`.
    #[cfg_attr(not(feature = "source-install"), allow(dead_code))]
    pub gobin: Option<PathBuf>,
    /// First entry of `GOPATH`.
    #[cfg_attr(not(feature = "source-install"), allow(dead_code))]
    pub gopath: Option<PathBuf>,
    /// Whether the host is Windows.
    pub windows: bool,
}

impl Environment {
    /// Captures the environment of the running process.
    #[must_use]
    pub fn from_process() -> Self {
        Self {
            home: dirs::home_dir(),
            local_app_data: non_empty_var("LOCALAPPDATA").map(PathBuf::from),
            nibble_home: non_empty_var(NIBBLE_HOME_ENV).map(PathBuf::from),
            dist_server: non_empty_var(DIST_SERVER_ENV),
            version: non_empty_var(VERSION_ENV),
            gobin: non_empty_var("GOBIN").map(PathBuf::from),
            gopath: std::env::var_os("GOPATH")
                .and_then(|value| std::env::split_paths(&value).next())
                .filter(|path| !path.as_os_str().is_empty()),
            windows: cfg!(windows),
        }
    }
}

/// Reads an environment variable, treating empty or whitespace-only values as unset.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Resolved configuration for one launcher run.
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Project name (`nibble`).
    pub project: String,
    /// Repository path on the release host (`owner/name`).
    pub repo: String,
    /// Release host base URL, without a trailing slash.
    pub dist_server: String,
    /// Release version to run.
    pub version: ReleaseVersion,
    /// Install cache layout.
    #[cfg(not(feature = "source-install"))]
    pub paths: InstallPaths,
    /// Whether the host is Windows.
    pub windows: bool,
}

impl InstallerConfig {
    /// Builds the configuration from a captured environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the version is not a semantic version or, for the
    /// release strategy, no install root can be determined.
    pub fn from_environment(env: &Environment) -> Result<Self> {
        let raw_version = env
            .version
            .as_deref()
            .unwrap_or(env!("CARGO_PKG_VERSION"));
        let version = ReleaseVersion::parse(raw_version)?;

        let dist_server = env
            .dist_server
            .as_deref()
            .unwrap_or(DEFAULT_DIST_SERVER)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            project: PROJECT.to_string(),
            repo: REPO.to_string(),
            dist_server,
            version,
            #[cfg(not(feature = "source-install"))]
            paths: InstallPaths::from_environment(env)?,
            windows: env.windows,
        })
    }

    /// Returns the host executable name (`nibble` or `nibble.exe`).
    #[must_use]
    pub fn binary_name(&self) -> String {
        if self.windows {
            format!("{}.exe", self.project)
        } else {
            self.project.clone()
        }
    }

    /// Returns the entry names accepted when scanning a release archive.
    #[must_use]
    pub fn accepted_names(&self) -> Vec<String> {
        let mut names = vec![self.binary_name()];
        for name in [self.project.clone(), format!("{}.exe", self.project)] {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Returns the path the binary is cached at for the configured version.
    #[cfg(not(feature = "source-install"))]
    #[must_use]
    pub fn binary_path(&self) -> PathBuf {
        self.paths
            .binary_path(self.version.as_str(), &self.binary_name())
    }
}
