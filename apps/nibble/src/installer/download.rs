//! Release archive download.
//!
//! Tries the candidate archive names for a platform in order and keeps the
//! first one the release host serves. A "not found" answer moves on to the
//! next candidate; any other failure aborts the run.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::errors::NibbleError;
use crate::installer::platform::PlatformTriplet;
use crate::installer::release::ReleaseLocator;
use crate::installer::transport::{Transport, try_in_order};

/// An archive fetched from the release host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedAsset {
    /// Asset file name as published, e.g. `nibble_linux_amd64.tar.gz`.
    pub name: String,
    /// Local path of the downloaded file.
    pub path: PathBuf,
}

/// Downloads the first available release archive for `platform` into `dir`.
///
/// # Errors
///
/// Returns [`NibbleError::AssetNotFound`] listing every attempted name if no
/// candidate exists, or the first transport error encountered.
pub fn download_release_asset(
    transport: &dyn Transport,
    locator: &ReleaseLocator,
    platform: PlatformTriplet,
    dir: &Path,
) -> Result<DownloadedAsset> {
    let candidates = locator.candidate_assets(platform);

    let hit = try_in_order(&candidates, |name| {
        let dest = dir.join(name);
        let found = transport.download(&locator.asset_url(name), &dest)?;
        if !found {
            tracing::debug!(asset = %name, "release asset not found, trying next");
        }
        Ok(found.then_some(dest))
    })?;

    match hit {
        Some((name, path)) => {
            tracing::info!(asset = %name, "downloaded release asset");
            Ok(DownloadedAsset {
                name: name.clone(),
                path,
            })
        }
        None => Err(NibbleError::AssetNotFound {
            platform: platform.to_string(),
            version: locator.version().to_string(),
            tried: candidates.clone(),
        }
        .into()),
    }
}
