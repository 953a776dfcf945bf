//! Upload-ready content and headers for one key.
//!
//! Stylesheets are rewritten (when enabled) through a temporary file that
//! is gone again before this module returns; gzip variants are compressed
//! in process. Temporaries never outlive the preparation of a single key.

use std::fs;
use std::io::Write as _;
use std::path::{Component, Path, PathBuf};

use asset_sync_config::SyncConfig;
use asset_sync_css::UrlResolver;
use asset_sync_store::UploadHeaders;
use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::NamedTempFile;

use crate::SyncError;
use crate::keys::Variant;
use crate::mime;
use crate::run::RunContext;

/// Bytes and headers ready for `put_object`.
#[derive(Debug)]
pub struct PreparedAsset {
    /// Upload body.
    pub body: Vec<u8>,
    /// Headers to attach to the object.
    pub headers: UploadHeaders,
}

/// Prepares one asset for upload under the given variant.
///
/// Headers carry the long-lived cache policy and the content type from
/// the extension table; unknown extensions get a generic binary type.
///
/// # Errors
///
/// Returns [`SyncError::Read`] if the asset cannot be read,
/// [`SyncError::Rewrite`] if stylesheet rewriting fails, and
/// [`SyncError::Compress`] if gzip compression fails.
pub fn prepare(
    path: &Path,
    variant: Variant,
    config: &SyncConfig,
    ctx: &RunContext,
) -> Result<PreparedAsset, SyncError> {
    let rewritten = if config.rewrite_css_paths && config.is_stylesheet(path) {
        let resolver = KeyUrlResolver {
            config,
            ctx,
            stylesheet_dir: path.parent(),
        };
        Some(asset_sync_css::rewrite_stylesheet(path, &resolver)?)
    } else {
        None
    };

    let source_path = rewritten.as_ref().map_or(path, NamedTempFile::path);
    let bytes = fs::read(source_path).map_err(|source| SyncError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let body = match variant {
        Variant::Plain => bytes,
        Variant::Gzip => gzip_bytes(&bytes, path)?,
    };

    let headers = UploadHeaders::long_lived(
        mime::content_type_for_path(path),
        variant == Variant::Gzip,
    );

    Ok(PreparedAsset { body, headers })
}

fn gzip_bytes(bytes: &[u8], path: &Path) -> Result<Vec<u8>, SyncError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .map_err(|source| SyncError::Compress {
            path: path.to_path_buf(),
            source,
        })?;
    encoder.finish().map_err(|source| SyncError::Compress {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves stylesheet `url()` references to the plain key of the
/// referenced asset, root-relative and cache-busted.
///
/// Root-relative references (`/images/logo.png`) resolve against the
/// public root; everything else resolves against the stylesheet's own
/// directory. References to paths outside the run's plain key map stay
/// untouched.
struct KeyUrlResolver<'a> {
    config: &'a SyncConfig,
    ctx: &'a RunContext,
    stylesheet_dir: Option<&'a Path>,
}

impl UrlResolver for KeyUrlResolver<'_> {
    fn resolve(&self, reference: &str) -> Option<String> {
        let local = match reference.strip_prefix('/') {
            Some(root_relative) => self.config.public_root.join(root_relative),
            None => self.stylesheet_dir?.join(reference),
        };
        let local = normalize_path(&local);
        self.ctx.plain_keys.get(&local).map(|key| format!("/{key}"))
    }
}

/// Lexically resolves `.` and `..` components so references like
/// `../images/logo.png` match the enumerated asset paths.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other),
        }
    }
    normalized
}
