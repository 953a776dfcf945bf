#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Sync decision engine.
//!
//! Everything between "here is a local asset tree" and "these bytes went to
//! the bucket" lives here: enumerating assets ([`scan`]), mapping each to
//! its content-addressed remote key ([`keys`]), snapshotting what the
//! remote already holds ([`index`]), deciding per key whether to upload
//! ([`policy`]), producing the upload body and headers ([`prepare`]), and
//! driving the two-phase run ([`run`]).
//!
//! Decisions are pure functions of an immutable [`run::RunContext`] built
//! once at run start; only listing and uploading touch the network.

pub mod index;
pub mod keys;
pub mod mime;
pub mod policy;
pub mod prepare;
pub mod run;
pub mod scan;

use std::path::PathBuf;

use thiserror::Error;

pub use keys::Variant;
pub use run::{RunContext, SyncOptions, SyncStats, run_sync};

/// Errors that abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Local directory enumeration failed.
    #[error("Failed to enumerate assets under {path}: {source}")]
    Scan {
        /// Directory being enumerated.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A local asset could not be read.
    #[error("Failed to read asset {path}: {source}")]
    Read {
        /// Asset being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Gzip compression of an asset failed.
    #[error("Failed to compress {path}: {source}")]
    Compress {
        /// Asset being compressed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Rewriting a stylesheet failed.
    #[error(transparent)]
    Rewrite(#[from] asset_sync_css::RewriteError),

    /// A remote-store operation failed.
    #[error(transparent)]
    Store(#[from] asset_sync_store::StoreError),

    /// The run was stopped via the cancellation flag.
    #[error("Sync cancelled")]
    Cancelled,
}
