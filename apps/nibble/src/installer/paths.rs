//! Install cache layout.
//!
//! The default root is `~/.local/share/nibble` (`%LOCALAPPDATA%\nibble` on
//! Windows) and can be overridden by setting `NIBBLE_HOME`.
//!
//! ## Directory Structure
//!
//! ```text
//! ~/.local/share/nibble/      # Root directory (or NIBBLE_HOME)
//!   1.2.0/
//!     bin/
//!       nibble                # Cached release binary (nibble.exe on Windows)
//!   1.3.0/
//!     ...
//!   .tmp-XXXXXX/              # Scoped extraction directory, removed after install
//! ```
//!
//! The binary path is determined by version alone: a present file is trusted
//! as a cache hit.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::{Environment, NIBBLE_HOME_ENV, PROJECT};

/// Paths of the per-user install cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    root: PathBuf,
}

impl InstallPaths {
    /// Determines the install root from a captured environment.
    ///
    /// The root directory is determined by:
    /// 1. `NIBBLE_HOME` if set
    /// 2. On Windows: `%LOCALAPPDATA%\nibble`, falling back to `~\nibble`
    /// 3. Elsewhere: `~/.local/share/nibble`
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory is needed but unknown.
    pub fn from_environment(env: &Environment) -> Result<Self> {
        if let Some(root) = &env.nibble_home {
            return Ok(Self::with_root(root.clone()));
        }

        let base = if env.windows {
            match &env.local_app_data {
                Some(dir) => dir.clone(),
                None => home(env)?,
            }
        } else {
            home(env)?.join(".local").join("share")
        };

        Ok(Self::with_root(base.join(PROJECT)))
    }

    /// Creates paths rooted at a specific directory.
    #[must_use = "returns new paths instance without side effects"]
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    /// Returns the install root.
    #[must_use = "returns the path without side effects"]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the `bin` directory of a specific version.
    #[must_use = "returns the path without side effects"]
    pub fn version_bin_dir(&self, version: &str) -> PathBuf {
        self.root.join(version).join("bin")
    }

    /// Returns the cached binary path for a version.
    #[must_use = "returns the path without side effects"]
    pub fn binary_path(&self, version: &str, binary_name: &str) -> PathBuf {
        self.version_bin_dir(version).join(binary_name)
    }

    /// Creates the version's `bin` directory (and the root) if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn ensure_version_dir(&self, version: &str) -> Result<PathBuf> {
        let dir = self.version_bin_dir(version);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        Ok(dir)
    }
}

fn home(env: &Environment) -> Result<PathBuf> {
    env.home.clone().with_context(|| {
        format!("Cannot determine home directory. Set {NIBBLE_HOME_ENV} environment variable.")
    })
}
