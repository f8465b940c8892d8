//! Checksum verification for downloaded release archives.
//!
//! The release publishes a manifest in the format of `sha256sum`:
//!
//! ```text
//! <64 hex digits>  [*]<file name>
//! ```
//!
//! Blank lines and `#` comments are ignored. Verification is a strict gate:
//! a missing manifest, a missing entry or a digest mismatch all abort the
//! install.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::errors::NibbleError;
use crate::installer::download::DownloadedAsset;
use crate::installer::release::ReleaseLocator;
use crate::installer::transport::{Transport, try_in_order};

/// Read buffer size used while hashing.
const CHUNK_SIZE: usize = 64 * 1024;

/// Length of a hex-encoded SHA-256 digest.
const DIGEST_LEN: usize = 64;

/// Parses a checksum manifest into a map from file name to lowercase digest.
///
/// Lines that do not match the manifest format are skipped. If a file name
/// is listed more than once, the last entry wins.
#[must_use]
pub fn parse_checksums(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(parse_line)
        .map(|(digest, name)| (name.to_string(), digest.to_ascii_lowercase()))
        .collect()
}

fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let digest = line.get(..DIGEST_LEN)?;
    if !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let rest = &line[DIGEST_LEN..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    let name = rest.strip_prefix('*').unwrap_or(rest).trim_start();
    if name.is_empty() {
        return None;
    }

    Some((digest, name))
}

/// Computes the SHA-256 hash of a file as a lowercase hex string.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn compute_sha256(file_path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(file_path)
        .with_context(|| format!("Failed to open file for checksum: {}", file_path.display()))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer).with_context(|| {
            format!("Failed to read file for checksum: {}", file_path.display())
        })?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Checks `file_path` against an expected digest.
///
/// # Errors
///
/// Returns [`NibbleError::ChecksumMismatch`] if the digests differ, or an I/O
/// error if the file cannot be read.
pub fn verify_checksum(archive: &str, file_path: &Path, expected: &str) -> Result<()> {
    let actual = compute_sha256(file_path)?;
    let expected = expected.to_ascii_lowercase();
    tracing::debug!(archive, digest = %actual, "computed archive digest");

    if actual != expected {
        return Err(NibbleError::ChecksumMismatch {
            archive: archive.to_string(),
            expected,
            actual,
        }
        .into());
    }
    Ok(())
}

/// Fetches the release's checksum manifest and verifies `asset` against it.
///
/// # Errors
///
/// Returns [`NibbleError::ManifestNotFound`] if no manifest candidate exists,
/// [`NibbleError::ChecksumKeyMissing`] if the manifest does not list the
/// asset, [`NibbleError::ChecksumMismatch`] if the digest differs, or the
/// first transport error encountered.
pub fn verify_archive(
    transport: &dyn Transport,
    locator: &ReleaseLocator,
    asset: &DownloadedAsset,
) -> Result<()> {
    let candidates = locator.manifest_candidates();

    let Some((manifest, text)) = try_in_order(&candidates, |name| {
        let text = transport.fetch_text(&locator.asset_url(name))?;
        if text.is_none() {
            tracing::debug!(manifest = %name, "checksum manifest not found, trying next");
        }
        Ok(text)
    })?
    else {
        return Err(NibbleError::ManifestNotFound {
            version: locator.version().to_string(),
            tried: candidates.clone(),
        }
        .into());
    };
    tracing::debug!(manifest = %manifest, "using checksum manifest");

    let checksums = parse_checksums(&text);
    let expected = checksums
        .get(&asset.name)
        .ok_or_else(|| NibbleError::ChecksumKeyMissing {
            archive: asset.name.clone(),
            manifest: manifest.clone(),
        })?;

    verify_checksum(&asset.name, &asset.path, expected)?;
    tracing::info!(archive = %asset.name, "checksum verified");
    Ok(())
}
