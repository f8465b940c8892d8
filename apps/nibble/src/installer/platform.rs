//! Platform resolution for nibble release assets.
//!
//! Maps raw host identifiers (as `uname -s` / `uname -m` spell them) onto the
//! naming scheme of the release assets: `{project}_{os}_{arch}.{ext}`.
//!
//! ## Supported Platforms
//!
//! | OS input  | `os`      | Arch input          | `arch`  |
//! |-----------|-----------|---------------------|---------|
//! | `linux`   | `linux`   | `x86_64`, `amd64`   | `amd64` |
//! | `darwin`  | `darwin`  | `aarch64`, `arm64`  | `arm64` |
//! | `windows` | `windows` |                     |         |

use anyhow::Result;
use std::fmt;

use crate::errors::NibbleError;

/// Operating system component of an asset name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsName {
    /// Linux
    Linux,
    /// macOS
    Darwin,
    /// Windows
    Windows,
}

impl OsName {
    /// Returns the identifier used in asset names.
    #[must_use = "returns the OS string without side effects"]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Windows => "windows",
        }
    }

    fn from_raw(raw: &str) -> Option<Self> {
        match raw {
            "linux" => Some(Self::Linux),
            "darwin" => Some(Self::Darwin),
            "windows" => Some(Self::Windows),
            _ => None,
        }
    }
}

/// CPU architecture component of an asset name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    /// 64-bit x86
    Amd64,
    /// 64-bit ARM
    Arm64,
}

impl Arch {
    /// Returns the identifier used in asset names.
    #[must_use = "returns the arch string without side effects"]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::Arm64 => "arm64",
        }
    }

    fn from_raw(raw: &str) -> Option<Self> {
        match raw {
            "x86_64" | "amd64" => Some(Self::Amd64),
            "aarch64" | "arm64" => Some(Self::Arm64),
            _ => None,
        }
    }
}

/// The `(os, arch)` pair a release asset is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformTriplet {
    /// Operating system.
    pub os: OsName,
    /// CPU architecture.
    pub arch: Arch,
}

impl PlatformTriplet {
    /// Resolves raw system and machine identifiers, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`NibbleError::UnsupportedPlatform`] naming both raw inputs if
    /// either side has no mapping.
    pub fn resolve(system: &str, machine: &str) -> Result<Self> {
        let system_lower = system.to_lowercase();
        let machine_lower = machine.to_lowercase();

        match (
            OsName::from_raw(&system_lower),
            Arch::from_raw(&machine_lower),
        ) {
            (Some(os), Some(arch)) => Ok(Self { os, arch }),
            _ => Err(NibbleError::unsupported_platform(system_lower, machine_lower).into()),
        }
    }

    /// Resolves the platform this launcher is running on.
    ///
    /// # Errors
    ///
    /// Returns an error if the host has no release build.
    pub fn detect() -> Result<Self> {
        Self::resolve(host_system(), std::env::consts::ARCH)
    }
}

impl fmt::Display for PlatformTriplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os.as_str(), self.arch.as_str())
    }
}

/// Returns the host OS as `uname -s` spells it.
///
/// Rust names macOS `macos`; the release assets call it `darwin`.
fn host_system() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}
