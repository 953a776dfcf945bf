#![allow(clippy::module_name_repetitions)]

//! The sync run: context building and the two upload phases.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use asset_sync_config::SyncConfig;
use asset_sync_store::ObjectStore;

use crate::SyncError;
use crate::index::RemoteKeyIndex;
use crate::keys::{self, Variant};
use crate::policy;
use crate::prepare;
use crate::scan;

/// Flags that shape a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Print a banner per phase and a `+`/`=` marker per key.
    pub verbose: bool,
    /// Compute every decision but perform no upload.
    pub dry_run: bool,
    /// Upload even when the key already exists remotely.
    pub force_write: bool,
}

/// Counters for one phase or one whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Keys uploaded (or that would have been, in dry-run).
    pub uploaded: u64,
    /// Keys left as they were.
    pub unchanged: u64,
}

impl SyncStats {
    /// Merge another stats into this one.
    pub const fn merge(&mut self, other: Self) {
        self.uploaded += other.uploaded;
        self.unchanged += other.unchanged;
    }

    /// Total number of keys considered.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.uploaded + self.unchanged
    }
}

impl std::fmt::Display for SyncStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} uploaded, {} unchanged", self.uploaded, self.unchanged)
    }
}

/// Immutable per-run snapshot that every decision reads from.
///
/// Dropping it is the run's cache reset: nothing carries over, and the
/// next run starts from a fresh remote listing.
#[derive(Debug)]
pub struct RunContext {
    /// Keys present remotely when the run started.
    pub index: RemoteKeyIndex,
    /// Plain key for every syncable asset path.
    pub plain_keys: BTreeMap<PathBuf, String>,
    /// Whether some image's plain key was absent from the index at run
    /// start. Drives the conservative stylesheet re-upload rule.
    pub any_image_missing: bool,
}

impl RunContext {
    /// Builds the run snapshot: one remote listing plus the full plain
    /// key map.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if the listing fails and
    /// [`SyncError::Read`] if a local file cannot be hashed.
    pub async fn build(
        store: &dyn ObjectStore,
        config: &SyncConfig,
        paths: &[PathBuf],
    ) -> Result<Self, SyncError> {
        let index = RemoteKeyIndex::snapshot(store, &[config.list_prefix()]).await?;
        let plain_keys = keys::key_map(paths, Variant::Plain, config)?;
        let any_image_missing = plain_keys
            .iter()
            .any(|(path, key)| config.is_image(path) && !index.contains(key));

        Ok(Self {
            index,
            plain_keys,
            any_image_missing,
        })
    }
}

/// Runs a full sync pass: the plain phase, then the gzip phase when gzip
/// delivery is enabled.
///
/// The first error aborts the run; there is no per-key recovery. The
/// `cancel` flag is honored between keys.
///
/// # Errors
///
/// Returns [`SyncError::Cancelled`] when stopped via `cancel`, and
/// propagates scan, read, rewrite, compression, and store errors.
pub async fn run_sync(
    store: &dyn ObjectStore,
    config: &SyncConfig,
    options: &SyncOptions,
    cancel: &AtomicBool,
) -> Result<SyncStats, SyncError> {
    let paths = scan::asset_paths(config)?;
    log::info!(
        "found {} asset files under {}",
        paths.len(),
        config.public_root.display()
    );

    let ctx = RunContext::build(store, config, &paths).await?;
    log::debug!(
        "remote index holds {} keys, any image missing: {}",
        ctx.index.len(),
        ctx.any_image_missing
    );

    let mut stats = SyncStats::default();
    stats.merge(
        sync_phase(store, config, &ctx, *options, cancel, Variant::Plain, &ctx.plain_keys).await?,
    );

    if config.gzip {
        let gzip_keys = keys::key_map(&paths, Variant::Gzip, config)?;
        stats.merge(
            sync_phase(store, config, &ctx, *options, cancel, Variant::Gzip, &gzip_keys).await?,
        );
    }

    log::info!("sync finished: {stats}");
    Ok(stats)
}

async fn sync_phase(
    store: &dyn ObjectStore,
    config: &SyncConfig,
    ctx: &RunContext,
    options: SyncOptions,
    cancel: &AtomicBool,
    variant: Variant,
    phase_keys: &BTreeMap<PathBuf, String>,
) -> Result<SyncStats, SyncError> {
    if options.verbose {
        println!("-- updating {} assets", variant.label());
    }

    let mut stats = SyncStats::default();
    for (path, key) in phase_keys {
        if cancel.load(Ordering::Relaxed) {
            return Err(SyncError::Cancelled);
        }

        if policy::should_upload(path, key, variant, ctx, &options, config) {
            stats.uploaded += 1;
            if options.verbose {
                println!("+ {key}");
            }
            if options.dry_run {
                continue;
            }
            let prepared = prepare::prepare(path, variant, config, ctx)?;
            log::debug!("uploading {key} ({} bytes)", prepared.body.len());
            store.put_object(key, prepared.body, &prepared.headers).await?;
        } else {
            stats.unchanged += 1;
            if options.verbose {
                println!("= {key}");
            }
        }
    }

    Ok(stats)
}
