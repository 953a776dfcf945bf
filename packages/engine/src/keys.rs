//! Local path → remote object key mapping.
//!
//! Keys are content-addressed:
//!
//! ```text
//! {key_prefix}{md5(content)[0..8]}/{relative path, package segment mapped}
//! ```
//!
//! The mapped path is the asset's location relative to the public root,
//! with the first package-path directory segment dropped for images,
//! followed by the plain sub-prefix for other plain assets, and followed
//! by the gzip sub-prefix for gzip variants. A changed asset therefore
//! lands at a fresh key, and CDN caches never need invalidating.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use asset_sync_config::SyncConfig;

use crate::SyncError;

/// Upload form of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// The asset's bytes as they are on disk (after any CSS rewriting).
    Plain,
    /// The gzip-compressed form, produced only for compressible types.
    Gzip,
}

impl Variant {
    /// Phase label used in logs and verbose banners.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Gzip => "gzip",
        }
    }
}

/// Computes the remote key for an asset, or `None` when the asset has no
/// key under this variant: already-compressed artifacts never get one,
/// and gzip keys exist only for gzip-allowed types.
///
/// Pure given configuration and file content. A relative path without the
/// package-path segment maps unchanged (no error).
///
/// # Errors
///
/// Returns [`SyncError::Read`] if the file cannot be read for hashing.
pub fn key_for(
    path: &Path,
    variant: Variant,
    config: &SyncConfig,
) -> Result<Option<String>, SyncError> {
    if config.is_compressed_artifact(path) {
        return Ok(None);
    }
    if variant == Variant::Gzip && !config.gzip_allowed(path) {
        return Ok(None);
    }

    let hash = content_hash(path)?;
    let relative = path.strip_prefix(&config.public_root).unwrap_or(path);
    let mapped = mapped_components(relative, variant, config).join("/");

    Ok(Some(format!("{}{hash}/{mapped}", config.key_prefix)))
}

/// Maps every asset path to its key for one variant, skipping paths that
/// have no key under it. Ordered by path, so iteration over the map
/// mirrors the on-disk tree.
///
/// # Errors
///
/// Returns [`SyncError::Read`] if any file cannot be read for hashing.
pub fn key_map(
    paths: &[PathBuf],
    variant: Variant,
    config: &SyncConfig,
) -> Result<BTreeMap<PathBuf, String>, SyncError> {
    let mut map = BTreeMap::new();
    for path in paths {
        if let Some(key) = key_for(path, variant, config)? {
            map.insert(path.clone(), key);
        }
    }
    Ok(map)
}

/// Relative path components with the first package-path directory
/// segment mapped per variant. Later occurrences are left alone, as is
/// a file that is itself named like the segment: only directories are
/// rewrite points.
fn mapped_components(relative: &Path, variant: Variant, config: &SyncConfig) -> Vec<String> {
    let mut out = Vec::new();
    let mut mapped = false;

    if let Some(parent) = relative.parent() {
        for component in parent.components() {
            let Component::Normal(part) = component else {
                continue;
            };
            let part = part.to_string_lossy().into_owned();

            if mapped || part != config.package_path {
                out.push(part);
                continue;
            }
            mapped = true;

            match variant {
                Variant::Plain if config.is_image(relative) => {
                    // image keys drop the package segment entirely
                }
                Variant::Plain => {
                    out.push(part);
                    if !config.plain_prefix.is_empty() {
                        out.push(config.plain_prefix.clone());
                    }
                }
                Variant::Gzip => {
                    out.push(part);
                    out.push(config.gzip_prefix.clone());
                }
            }
        }
    }

    if let Some(name) = relative.file_name() {
        out.push(name.to_string_lossy().into_owned());
    }

    out
}

/// First 8 hex characters of the md5 of the file's content.
fn content_hash(path: &Path) -> Result<String, SyncError> {
    let digest = compute_md5_sync(path).map_err(|source| SyncError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(digest[..8].to_string())
}

fn compute_md5_sync(path: &Path) -> Result<String, std::io::Error> {
    use std::io::Read;

    let mut file = std::fs::File::open(path)?;
    let mut context = md5::Context::new();
    let mut buffer = vec![0u8; 256 * 1024]; // 256 KB chunks
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        context.consume(&buffer[..n]);
    }
    Ok(format!("{:x}", context.finalize()))
}
