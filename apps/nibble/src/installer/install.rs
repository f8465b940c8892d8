//! Cache-hit / cache-miss orchestration.
//!
//! On a cache hit the cached binary is returned without touching the network
//! or re-verifying anything. On a miss the release is downloaded, verified and
//! extracted inside a scoped temporary directory under the install root, and
//! the finished binary is renamed into place. The temporary directory is
//! removed when it goes out of scope, and by the Ctrl-C handler if the run is
//! interrupted. Work directories left by a killed run are swept on the next
//! cache miss once they are older than [`STALE_WORKDIR_AGE`].

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};

use crate::config::InstallerConfig;
use crate::installer::archive::{extract_binary, set_executable_permissions};
use crate::installer::download::download_release_asset;
use crate::installer::interrupt;
use crate::installer::platform::PlatformTriplet;
use crate::installer::release::ReleaseLocator;
use crate::installer::transport::Transport;
use crate::installer::verify::verify_archive;

/// Name prefix of per-run work directories under the install root.
pub const WORKDIR_PREFIX: &str = ".tmp-";

/// Age after which a leftover work directory is considered abandoned.
pub const STALE_WORKDIR_AGE: Duration = Duration::from_secs(60 * 60);

/// Returns the cached binary for the configured version, installing it first
/// if needed. The host platform is detected only on a cache miss.
///
/// # Errors
///
/// Returns an error if the host platform is unsupported or any stage of the
/// download, verification or extraction fails.
pub fn ensure_installed(config: &InstallerConfig, transport: &dyn Transport) -> Result<PathBuf> {
    ensure_installed_with(config, transport, PlatformTriplet::detect)
}

/// Like [`ensure_installed`], resolving the platform through `platform`.
///
/// # Errors
///
/// See [`ensure_installed`].
pub fn ensure_installed_with<P>(
    config: &InstallerConfig,
    transport: &dyn Transport,
    platform: P,
) -> Result<PathBuf>
where
    P: FnOnce() -> Result<PlatformTriplet>,
{
    let version = config.version.as_str();
    config.paths.ensure_version_dir(version)?;

    let binary_path = config.binary_path();
    if binary_path.exists() {
        tracing::debug!(path = %binary_path.display(), "cache hit");
        return Ok(binary_path);
    }
    tracing::info!(version, "nibble not cached, installing");

    let platform = platform()?;
    let locator = ReleaseLocator::for_config(config);

    let root = config.paths.root();
    sweep_stale_workdirs(root, STALE_WORKDIR_AGE);

    interrupt::install_handler();
    let workdir = tempfile::Builder::new()
        .prefix(WORKDIR_PREFIX)
        .tempdir_in(root)
        .with_context(|| format!("Failed to create temporary directory in {}", root.display()))?;
    let _registration = interrupt::guard(workdir.path());

    let asset = download_release_asset(transport, &locator, platform, workdir.path())?;
    verify_archive(transport, &locator, &asset)?;

    let staged = workdir.path().join(config.binary_name());
    extract_binary(&asset.path, &staged, &config.accepted_names())?;
    set_executable_permissions(&staged)?;

    std::fs::rename(&staged, &binary_path).with_context(|| {
        format!(
            "Failed to move {} to {}",
            staged.display(),
            binary_path.display()
        )
    })?;
    tracing::info!(path = %binary_path.display(), "installed nibble");

    Ok(binary_path)
}

/// Removes work directories under `root` not modified for at least `max_age`.
///
/// Younger ones may belong to a concurrent run and are left alone. Failures
/// are logged and never abort the install.
pub fn sweep_stale_workdirs(root: &Path, max_age: Duration) {
    let Ok(entries) = std::fs::read_dir(root) else {
        return;
    };
    let now = SystemTime::now();

    for entry in entries.flatten() {
        if !entry.file_name().to_string_lossy().starts_with(WORKDIR_PREFIX) {
            continue;
        }
        let stale = entry
            .metadata()
            .ok()
            .filter(std::fs::Metadata::is_dir)
            .and_then(|meta| meta.modified().ok())
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age >= max_age);
        if !stale {
            continue;
        }

        let path = entry.path();
        match std::fs::remove_dir_all(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed stale work directory"),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove stale work directory");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::errors::NibbleError;
    use crate::installer::platform::{Arch, OsName};
    use crate::installer::transport::stub::StubTransport;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use sha2::{Digest, Sha256};
    use std::path::Path;
    use tempfile::TempDir;

    const BASE: &str = "https://github.com/backendsystems/nibble/releases/download/v1.2.0";
    const BINARY: &[u8] = b"#!/bin/sh\nexit 0\n";

    fn config(root: &Path) -> InstallerConfig {
        let env = Environment {
            nibble_home: Some(root.to_path_buf()),
            version: Some("1.2.0".to_string()),
            ..Environment::default()
        };
        InstallerConfig::from_environment(&env).unwrap()
    }

    fn linux() -> Result<PlatformTriplet> {
        Ok(PlatformTriplet {
            os: OsName::Linux,
            arch: Arch::Amd64,
        })
    }

    fn tar_gz_with_binary() -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        let mut header = tar::Header::new_gnu();
        header.set_size(BINARY.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "nibble_1.2.0_linux_amd64/nibble", BINARY)
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn release_transport(manifest: bool) -> StubTransport {
        let archive = tar_gz_with_binary();
        let digest = hex::encode(Sha256::digest(&archive));
        let transport = StubTransport::new()
            .with_file(format!("{BASE}/nibble_linux_amd64.tar.gz"), archive);
        if manifest {
            transport.with_file(
                format!("{BASE}/checksums.txt"),
                format!("{digest}  nibble_linux_amd64.tar.gz\n"),
            )
        } else {
            transport
        }
    }

    fn root_entries(root: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn cache_hit_makes_no_network_calls() {
        let temp = TempDir::new().unwrap();
        let config = config(temp.path());
        let cached = config.binary_path();
        std::fs::create_dir_all(cached.parent().unwrap()).unwrap();
        std::fs::write(&cached, BINARY).unwrap();
        let transport = StubTransport::new();

        let path = ensure_installed_with(&config, &transport, || {
            panic!("platform must not be resolved on a cache hit")
        })
        .unwrap();

        assert_eq!(path, cached);
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn cache_miss_installs_verified_binary() {
        let temp = TempDir::new().unwrap();
        let config = config(temp.path());
        let transport = release_transport(true);

        let path = ensure_installed_with(&config, &transport, linux).unwrap();

        assert_eq!(path, temp.path().join("1.2.0").join("bin").join("nibble"));
        assert_eq!(std::fs::read(&path).unwrap(), BINARY);
        assert_eq!(
            transport.calls(),
            vec![
                format!("{BASE}/nibble_linux_amd64.tar.gz"),
                format!("{BASE}/checksums.txt"),
            ]
        );
        assert_eq!(root_entries(temp.path()), vec!["1.2.0"]);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn second_run_is_a_cache_hit() {
        let temp = TempDir::new().unwrap();
        let config = config(temp.path());
        ensure_installed_with(&config, &release_transport(true), linux).unwrap();

        let transport = StubTransport::new();
        ensure_installed_with(&config, &transport, linux).unwrap();

        assert!(transport.calls().is_empty());
    }

    #[test]
    fn missing_manifest_writes_no_binary() {
        let temp = TempDir::new().unwrap();
        let config = config(temp.path());
        let transport = release_transport(false);

        let err = ensure_installed_with(&config, &transport, linux).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<NibbleError>(),
            Some(NibbleError::ManifestNotFound { .. })
        ));
        let bin_dir = temp.path().join("1.2.0").join("bin");
        assert!(bin_dir.is_dir());
        assert_eq!(std::fs::read_dir(&bin_dir).unwrap().count(), 0);
        assert_eq!(root_entries(temp.path()), vec!["1.2.0"]);
    }

    #[test]
    fn tampered_archive_writes_no_binary() {
        let temp = TempDir::new().unwrap();
        let config = config(temp.path());
        let transport = StubTransport::new()
            .with_file(
                format!("{BASE}/nibble_linux_amd64.tar.gz"),
                tar_gz_with_binary(),
            )
            .with_file(
                format!("{BASE}/checksums.txt"),
                format!("{}  nibble_linux_amd64.tar.gz\n", "0".repeat(64)),
            );

        let err = ensure_installed_with(&config, &transport, linux).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<NibbleError>(),
            Some(NibbleError::ChecksumMismatch { .. })
        ));
        assert!(!config.binary_path().exists());
    }

    #[test]
    fn unsupported_platform_fails_before_any_request() {
        let temp = TempDir::new().unwrap();
        let config = config(temp.path());
        let transport = StubTransport::new();

        let err = ensure_installed_with(&config, &transport, || {
            PlatformTriplet::resolve("plan9", "mips")
        })
        .unwrap_err();

        assert!(err.to_string().contains("unsupported platform"));
        assert!(transport.calls().is_empty());
    }

    fn leftover_workdir(root: &Path, name: &str) -> PathBuf {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("nibble_linux_amd64.tar.gz"), b"partial").unwrap();
        dir
    }

    #[test]
    fn sweep_removes_leftover_workdirs_only() {
        let temp = TempDir::new().unwrap();
        leftover_workdir(temp.path(), ".tmp-Ab12Cd");
        leftover_workdir(temp.path(), ".tmp-Ef34Gh");
        std::fs::create_dir_all(temp.path().join("1.2.0").join("bin")).unwrap();

        sweep_stale_workdirs(temp.path(), Duration::ZERO);

        assert_eq!(root_entries(temp.path()), vec!["1.2.0"]);
    }

    #[test]
    fn sweep_keeps_recent_workdirs_and_other_entries() {
        let temp = TempDir::new().unwrap();
        let recent = leftover_workdir(temp.path(), ".tmp-recent");
        std::fs::create_dir_all(temp.path().join("1.1.0").join("bin")).unwrap();
        std::fs::write(temp.path().join(".tmp-file"), b"not a directory").unwrap();

        sweep_stale_workdirs(temp.path(), STALE_WORKDIR_AGE);

        assert!(recent.is_dir());
        assert_eq!(
            root_entries(temp.path()),
            vec![".tmp-file", ".tmp-recent", "1.1.0"]
        );
    }

    #[test]
    fn sweep_ignores_missing_root() {
        let temp = TempDir::new().unwrap();
        sweep_stale_workdirs(&temp.path().join("absent"), Duration::ZERO);
    }

    #[cfg(unix)]
    #[test]
    fn cache_miss_removes_abandoned_workdir() {
        let temp = TempDir::new().unwrap();
        let config = config(temp.path());
        let abandoned = leftover_workdir(temp.path(), ".tmp-Ab12Cd");
        let two_hours_ago = SystemTime::now() - Duration::from_secs(2 * 60 * 60);
        std::fs::File::open(&abandoned)
            .unwrap()
            .set_modified(two_hours_ago)
            .unwrap();

        ensure_installed_with(&config, &release_transport(true), linux).unwrap();

        assert!(!abandoned.exists());
        assert_eq!(root_entries(temp.path()), vec!["1.2.0"]);
    }
}
