//! Release asset location.
//!
//! Builds the download URLs for a tagged release:
//!
//! ```text
//! {dist_server}/{repo}/releases/download/v{version}/{asset}
//! ```
//!
//! Archive candidates are `{project}_{os}_{arch}.tar.gz` then `.zip`; checksum
//! manifest candidates are `checksums.txt` then `{project}_{version}_checksums.txt`.
//! Order is significant: the first candidate the host serves wins.

use crate::config::InstallerConfig;
use crate::installer::platform::PlatformTriplet;
use crate::installer::version::ReleaseVersion;

/// Archive extensions tried for each platform, most preferred first.
pub const ARCHIVE_EXTENSIONS: [&str; 2] = ["tar.gz", "zip"];

/// Computes asset names and URLs for one release.
#[derive(Debug, Clone)]
pub struct ReleaseLocator {
    dist_server: String,
    repo: String,
    project: String,
    version: ReleaseVersion,
}

impl ReleaseLocator {
    /// Creates a locator for `version` of `project` published under `repo`.
    #[must_use]
    pub fn new(dist_server: &str, repo: &str, project: &str, version: &ReleaseVersion) -> Self {
        Self {
            dist_server: dist_server.trim_end_matches('/').to_string(),
            repo: repo.trim_matches('/').to_string(),
            project: project.to_string(),
            version: version.clone(),
        }
    }

    /// Creates a locator from the launcher configuration.
    #[must_use]
    pub fn for_config(config: &InstallerConfig) -> Self {
        Self::new(
            &config.dist_server,
            &config.repo,
            &config.project,
            &config.version,
        )
    }

    /// Returns the release version this locator points at.
    #[must_use]
    pub fn version(&self) -> &ReleaseVersion {
        &self.version
    }

    /// Returns the URL of the release's download directory.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!(
            "{}/{}/releases/download/{}",
            self.dist_server,
            self.repo,
            self.version.tag()
        )
    }

    /// Returns the URL of a file attached to the release.
    #[must_use]
    pub fn asset_url(&self, asset: &str) -> String {
        format!("{}/{asset}", self.base_url())
    }

    /// Returns the archive names to try for `platform`, in order.
    #[must_use]
    pub fn candidate_assets(&self, platform: PlatformTriplet) -> Vec<String> {
        ARCHIVE_EXTENSIONS
            .iter()
            .map(|ext| {
                format!(
                    "{}_{}_{}.{ext}",
                    self.project,
                    platform.os.as_str(),
                    platform.arch.as_str()
                )
            })
            .collect()
    }

    /// Returns the checksum manifest names to try, in order.
    #[must_use]
    pub fn manifest_candidates(&self) -> Vec<String> {
        vec![
            "checksums.txt".to_string(),
            format!("{}_{}_checksums.txt", self.project, self.version),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installer::platform::{Arch, OsName};

    fn locator(server: &str) -> ReleaseLocator {
        let version = ReleaseVersion::parse("v1.2.0").unwrap();
        ReleaseLocator::new(server, "backendsystems/nibble", "nibble", &version)
    }

    #[test]
    fn base_url_uses_prefixed_tag() {
        assert_eq!(
            locator("https://github.com").base_url(),
            "https://github.com/backendsystems/nibble/releases/download/v1.2.0"
        );
    }

    #[test]
    fn trailing_slash_on_server_is_ignored() {
        assert_eq!(
            locator("http://127.0.0.1:9000/").asset_url("checksums.txt"),
            "http://127.0.0.1:9000/backendsystems/nibble/releases/download/v1.2.0/checksums.txt"
        );
    }

    #[test]
    fn candidates_prefer_tar_gz() {
        let platform = PlatformTriplet {
            os: OsName::Linux,
            arch: Arch::Amd64,
        };
        assert_eq!(
            locator("https://github.com").candidate_assets(platform),
            vec!["nibble_linux_amd64.tar.gz", "nibble_linux_amd64.zip"]
        );
    }

    #[test]
    fn windows_candidates_use_same_scheme() {
        let platform = PlatformTriplet {
            os: OsName::Windows,
            arch: Arch::Arm64,
        };
        assert_eq!(
            locator("https://github.com").candidate_assets(platform),
            vec!["nibble_windows_arm64.tar.gz", "nibble_windows_arm64.zip"]
        );
    }

    #[test]
    fn manifest_candidates_use_unprefixed_version() {
        assert_eq!(
            locator("https://github.com").manifest_candidates(),
            vec!["checksums.txt", "nibble_1.2.0_checksums.txt"]
        );
    }
}
