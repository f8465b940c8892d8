//! Archive extraction for nibble release archives.
//!
//! A release archive carries a single executable, possibly nested under a
//! directory. Extraction walks the entries once and copies out the first
//! regular file whose basename is an accepted executable name.
//!
//! The container format is sniffed from the leading bytes rather than taken
//! from the file name:
//!
//! | Magic              | Format                  |
//! |--------------------|-------------------------|
//! | `PK\x03\x04`       | ZIP                     |
//! | `1f 8b`            | TAR, gzip-compressed    |
//! | `BZh`              | TAR, bzip2-compressed   |
//! | `fd 37 7a 58 5a 00`| xz (rejected)           |
//! | `28 b5 2f fd`      | zstd (rejected)         |
//! | anything else      | plain TAR               |

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use tar::Archive;

use crate::errors::NibbleError;

const ZIP_MAGIC: [&[u8]; 3] = [b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const BZIP2_MAGIC: &[u8] = b"BZh";
const XZ_MAGIC: &[u8] = &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00];
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];

/// Compression wrapped around a TAR stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TarCompression {
    /// Uncompressed.
    None,
    /// gzip.
    Gzip,
    /// bzip2.
    Bzip2,
}

/// Container format of a release archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// ZIP archive.
    Zip,
    /// TAR archive with the given compression.
    Tar(TarCompression),
}

/// Detects the container format from the archive's leading bytes.
///
/// # Errors
///
/// Returns [`NibbleError::UnsupportedArchive`] for xz or zstd streams, or an
/// I/O error if the file cannot be read.
pub fn detect_format(archive_path: &Path) -> Result<ArchiveFormat> {
    let mut file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let mut head = Vec::with_capacity(XZ_MAGIC.len());
    file.by_ref()
        .take(XZ_MAGIC.len() as u64)
        .read_to_end(&mut head)
        .with_context(|| format!("Failed to read archive: {}", archive_path.display()))?;

    let format = if ZIP_MAGIC.iter().any(|magic| head.starts_with(magic)) {
        ArchiveFormat::Zip
    } else if head.starts_with(GZIP_MAGIC) {
        ArchiveFormat::Tar(TarCompression::Gzip)
    } else if head.starts_with(BZIP2_MAGIC) {
        ArchiveFormat::Tar(TarCompression::Bzip2)
    } else if head.starts_with(XZ_MAGIC) {
        return Err(unsupported("xz"));
    } else if head.starts_with(ZSTD_MAGIC) {
        return Err(unsupported("zstd"));
    } else {
        ArchiveFormat::Tar(TarCompression::None)
    };
    Ok(format)
}

fn unsupported(compression: &str) -> anyhow::Error {
    NibbleError::UnsupportedArchive {
        compression: compression.to_string(),
    }
    .into()
}

/// Extracts the release executable from `archive_path` into `dest`.
///
/// Entries are matched by basename against `accepted_names`, ignoring any
/// directories inside the archive. Only regular files match.
///
/// # Errors
///
/// Returns [`NibbleError::BinaryNotFoundInArchive`] if no entry matches,
/// [`NibbleError::UnsupportedArchive`] for undecodable compressions, or an
/// error if the archive is corrupt or `dest` cannot be written.
pub fn extract_binary(archive_path: &Path, dest: &Path, accepted_names: &[String]) -> Result<()> {
    let format = detect_format(archive_path)?;
    tracing::debug!(archive = %archive_path.display(), ?format, "detected archive format");

    let found = match format {
        ArchiveFormat::Zip => extract_from_zip(archive_path, dest, accepted_names)?,
        ArchiveFormat::Tar(compression) => {
            extract_from_tar(archive_path, compression, dest, accepted_names)?
        }
    };

    if found {
        Ok(())
    } else {
        Err(NibbleError::BinaryNotFoundInArchive.into())
    }
}

fn extract_from_zip(archive_path: &Path, dest: &Path, accepted_names: &[String]) -> Result<bool> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to read ZIP archive: {}", archive_path.display()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read archive entry {i}"))?;

        if !entry.is_file() || entry.is_symlink() {
            continue;
        }
        if !is_accepted(entry.name(), accepted_names) {
            continue;
        }

        tracing::debug!(entry = entry.name(), "extracting binary");
        write_entry(&mut entry, dest)?;
        return Ok(true);
    }
    Ok(false)
}

fn extract_from_tar(
    archive_path: &Path,
    compression: TarCompression,
    dest: &Path,
    accepted_names: &[String],
) -> Result<bool> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let reader: Box<dyn Read> = match compression {
        TarCompression::None => Box::new(file),
        TarCompression::Gzip => Box::new(GzDecoder::new(file)),
        TarCompression::Bzip2 => Box::new(BzDecoder::new(file)),
    };
    let mut archive = Archive::new(reader);

    for entry in archive
        .entries()
        .with_context(|| format!("Failed to read tar entries: {}", archive_path.display()))?
    {
        let mut entry = entry
            .with_context(|| format!("Failed to read tar entry: {}", archive_path.display()))?;

        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        if !is_accepted(&name, accepted_names) {
            continue;
        }

        tracing::debug!(entry = %name, "extracting binary");
        write_entry(&mut entry, dest)?;
        return Ok(true);
    }
    Ok(false)
}

/// Returns the last path component, accepting both separator styles.
fn basename(entry_name: &str) -> &str {
    entry_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(entry_name)
}

fn is_accepted(entry_name: &str, accepted_names: &[String]) -> bool {
    let base = basename(entry_name);
    accepted_names.iter().any(|name| name == base)
}

fn write_entry(entry: &mut impl Read, dest: &Path) -> Result<()> {
    let mut outfile =
        File::create(dest).with_context(|| format!("Failed to create file: {}", dest.display()))?;
    io::copy(entry, &mut outfile)
        .with_context(|| format!("Failed to extract: {}", dest.display()))?;
    Ok(())
}

/// Marks an extracted binary executable (`0o755`).
///
/// # Errors
///
/// Returns an error if the metadata cannot be read or permissions cannot be set.
#[cfg(unix)]
pub fn set_executable_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path)
        .with_context(|| format!("Failed to get metadata: {}", path.display()))?
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms)
        .with_context(|| format!("Failed to set permissions: {}", path.display()))?;
    Ok(())
}

/// Sets executable permissions (no-op on Windows).
#[cfg(windows)]
#[allow(clippy::unnecessary_wraps)]
pub fn set_executable_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
