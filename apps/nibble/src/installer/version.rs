//! Release version handling.
//!
//! Versions are stored without a leading `v` (that form names the cache
//! directory and the versioned checksum manifest) and re-prefixed when a
//! release tag is needed for download URLs.

use anyhow::Result;
use std::fmt;

use crate::errors::NibbleError;

/// A normalised semantic release version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseVersion {
    normalized: String,
}

impl ReleaseVersion {
    /// Parses a version string, stripping one leading `v`.
    ///
    /// # Errors
    ///
    /// Returns [`NibbleError::InvalidVersion`] if the remainder is not a
    /// semantic version.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let normalized = trimmed.strip_prefix('v').unwrap_or(trimmed);

        semver::Version::parse(normalized).map_err(|e| NibbleError::InvalidVersion {
            version: raw.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            normalized: normalized.to_string(),
        })
    }

    /// Returns the version without a prefix, e.g. `1.2.0`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// Returns the release tag, e.g. `v1.2.0`.
    #[must_use]
    pub fn tag(&self) -> String {
        format!("v{}", self.normalized)
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}
