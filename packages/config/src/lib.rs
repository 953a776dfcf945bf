#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Configuration for the asset-sync upload toolchain.
//!
//! The config file is TOML; every field has a sensible default so a minimal
//! file only needs a `bucket`. Credentials are deliberately *not* part of
//! the file (the store reads them from the environment), so the config can
//! be committed next to the assets it describes.
//!
//! Classification (image / stylesheet / compressed artifact / gzip-allowed)
//! is extension-based and case-insensitive. CDN exclusion is regex-based
//! against the path relative to [`SyncConfig::public_root`].

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Config file is not valid TOML.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A `cdn_exclude` entry is not a valid regular expression.
    #[error("Invalid cdn_exclude pattern `{pattern}`: {source}")]
    Pattern {
        /// The offending pattern.
        pattern: String,
        /// Underlying regex error.
        source: regex::Error,
    },

    /// Configuration is structurally valid but semantically unusable.
    #[error("Invalid configuration: {message}")]
    Invalid {
        /// Description of what is wrong.
        message: String,
    },
}

/// Configuration for one sync target.
///
/// Key shape produced from these settings:
///
/// ```text
/// {key_prefix}{md5[0..8]}/{relative path, package segment rewritten}
/// ```
///
/// where the package-path segment is dropped for images, followed by
/// `plain_prefix` for other plain assets, and followed by `gzip_prefix`
/// for gzip variants.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Remote bucket name. Required.
    pub bucket: String,

    /// Directory that contains the asset directories. Relative values are
    /// resolved against the config file's directory by [`Self::from_path`].
    pub public_root: PathBuf,

    /// Directories under `public_root` to enumerate, e.g. `assets`,
    /// `images`.
    pub asset_dirs: Vec<String>,

    /// Fixed namespace concatenated verbatim ahead of the content hash,
    /// e.g. `cdn/`. May be empty.
    pub key_prefix: String,

    /// Path component that groups bundled/processed assets (the
    /// "package path"). Its first occurrence as a directory in a relative
    /// path is the rewrite point for variant sub-prefixes.
    pub package_path: String,

    /// Sub-prefix inserted after the package-path segment for plain
    /// (non-image) assets. Empty disables the insertion.
    pub plain_prefix: String,

    /// Whether gzip variants are produced and uploaded at all.
    pub gzip: bool,

    /// Sub-prefix inserted after the package-path segment for gzip
    /// variants.
    pub gzip_prefix: String,

    /// Extensions eligible for gzip delivery.
    pub gzip_extensions: Vec<String>,

    /// Whether stylesheet `url()` references are rewritten to their final
    /// remote form before upload.
    pub rewrite_css_paths: bool,

    /// Extensions classified as images (addressed without the package-path
    /// segment).
    pub image_extensions: Vec<String>,

    /// Extensions classified as stylesheets.
    pub stylesheet_extensions: Vec<String>,

    /// Extensions of already-compressed build artifacts, excluded from
    /// sync entirely.
    pub compressed_extensions: Vec<String>,

    /// Regex patterns (matched against the path relative to
    /// `public_root`) for sources that must never go to the CDN.
    cdn_exclude: Vec<String>,

    /// Compiled form of `cdn_exclude`.
    #[serde(skip)]
    exclude_patterns: Vec<Regex>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            public_root: PathBuf::from("public"),
            asset_dirs: vec![
                "assets".to_string(),
                "images".to_string(),
                "javascripts".to_string(),
                "stylesheets".to_string(),
            ],
            key_prefix: String::new(),
            package_path: "assets".to_string(),
            plain_prefix: String::new(),
            gzip: true,
            gzip_prefix: "gz".to_string(),
            gzip_extensions: vec!["js".to_string(), "css".to_string()],
            rewrite_css_paths: true,
            image_extensions: [
                "jpg", "jpeg", "gif", "png", "bmp", "ico", "webp", "avif",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            stylesheet_extensions: vec!["css".to_string()],
            compressed_extensions: vec!["gz".to_string(), "gzip".to_string()],
            cdn_exclude: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl SyncConfig {
    /// Loads configuration from a TOML file.
    ///
    /// A relative `public_root` is resolved against the config file's
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read,
    /// [`ConfigError::Parse`] on malformed TOML, and the validation errors
    /// of [`Self::from_toml_str`].
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&contents)?;
        if config.public_root.is_relative()
            && let Some(base) = path.parent()
        {
            config.public_root = base.join(&config.public_root);
        }
        Ok(config)
    }

    /// Parses configuration from a TOML string and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML,
    /// [`ConfigError::Invalid`] on an empty `bucket`, `package_path` or
    /// `gzip_prefix`, and [`ConfigError::Pattern`] on an invalid
    /// `cdn_exclude` entry.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(contents)?;
        config.validate()?;
        config.compile_excludes()?;
        Ok(config)
    }

    /// Replaces the CDN exclusion patterns, compiling them immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Pattern`] if any pattern fails to compile.
    pub fn with_excludes(mut self, patterns: Vec<String>) -> Result<Self, ConfigError> {
        self.cdn_exclude = patterns;
        self.compile_excludes()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.is_empty() {
            return Err(ConfigError::Invalid {
                message: "bucket must not be empty".to_string(),
            });
        }
        if self.package_path.is_empty() {
            return Err(ConfigError::Invalid {
                message: "package_path must not be empty".to_string(),
            });
        }
        if self.gzip && self.gzip_prefix.is_empty() {
            return Err(ConfigError::Invalid {
                message: "gzip_prefix must not be empty when gzip is enabled".to_string(),
            });
        }
        Ok(())
    }

    fn compile_excludes(&mut self) -> Result<(), ConfigError> {
        self.exclude_patterns = self
            .cdn_exclude
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::Pattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(())
    }

    /// Lowercased extension of a path, if any.
    #[must_use]
    pub fn extension_of(path: &Path) -> Option<String> {
        path.extension()
            .and_then(std::ffi::OsStr::to_str)
            .map(str::to_lowercase)
    }

    /// Whether the path is classified as an image.
    #[must_use]
    pub fn is_image(&self, path: &Path) -> bool {
        Self::extension_of(path).is_some_and(|ext| self.image_extensions.contains(&ext))
    }

    /// Whether the path is classified as a stylesheet.
    #[must_use]
    pub fn is_stylesheet(&self, path: &Path) -> bool {
        Self::extension_of(path).is_some_and(|ext| self.stylesheet_extensions.contains(&ext))
    }

    /// Whether the path is an already-compressed build artifact (never
    /// synced).
    #[must_use]
    pub fn is_compressed_artifact(&self, path: &Path) -> bool {
        Self::extension_of(path).is_some_and(|ext| self.compressed_extensions.contains(&ext))
    }

    /// Whether the path's type is eligible for gzip delivery.
    ///
    /// This is the per-source predicate only; the global [`Self::gzip`]
    /// switch gates the gzip phase itself.
    #[must_use]
    pub fn gzip_allowed(&self, path: &Path) -> bool {
        Self::extension_of(path).is_some_and(|ext| self.gzip_extensions.contains(&ext))
    }

    /// Whether the source is excluded from CDN delivery.
    ///
    /// Patterns match against the path relative to `public_root` (the full
    /// path if it is not under the root).
    #[must_use]
    pub fn cdn_disabled(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.public_root).unwrap_or(path);
        let haystack = relative.to_string_lossy();
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.is_match(&haystack))
    }

    /// Listing prefix for the remote key index snapshot.
    ///
    /// Both the plain and the gzip key families start with `key_prefix`
    /// (the variant sub-prefixes sit behind the content hash), so one
    /// prefix covers both listings.
    #[must_use]
    pub fn list_prefix(&self) -> &str {
        &self.key_prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mirror_conventions() {
        let config = SyncConfig::default();
        assert_eq!(config.package_path, "assets");
        assert_eq!(config.gzip_prefix, "gz");
        assert!(config.gzip);
        assert!(config.rewrite_css_paths);
        assert_eq!(config.gzip_extensions, vec!["js", "css"]);
        assert!(config.plain_prefix.is_empty());
    }

    #[test]
    fn parses_minimal_toml() {
        let config = SyncConfig::from_toml_str(r#"bucket = "my-assets""#).unwrap();
        assert_eq!(config.bucket, "my-assets");
        assert_eq!(config.public_root, PathBuf::from("public"));
    }

    #[test]
    fn parses_full_toml() {
        let config = SyncConfig::from_toml_str(
            r#"
            bucket = "my-assets"
            public_root = "site/public"
            asset_dirs = ["assets"]
            key_prefix = "cdn/"
            plain_prefix = "plain"
            gzip_prefix = "gzip"
            gzip_extensions = ["js"]
            cdn_exclude = ["^fonts/"]
            "#,
        )
        .unwrap();
        assert_eq!(config.key_prefix, "cdn/");
        assert_eq!(config.plain_prefix, "plain");
        assert_eq!(config.gzip_extensions, vec!["js"]);
        assert!(config.cdn_disabled(Path::new("site/public/fonts/a.woff")));
    }

    #[test]
    fn rejects_empty_bucket() {
        let err = SyncConfig::from_toml_str("").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn read_error_names_the_config_file() {
        let err = SyncConfig::from_path(Path::new("/nonexistent/sync.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/sync.toml"));
    }

    #[test]
    fn rejects_invalid_exclude_pattern() {
        let err = SyncConfig::from_toml_str(
            r#"
            bucket = "b"
            cdn_exclude = ["["]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Pattern { .. }));
    }

    #[test]
    fn classifies_by_extension_case_insensitively() {
        let config = SyncConfig::default();
        assert!(config.is_image(Path::new("public/images/LOGO.PNG")));
        assert!(config.is_stylesheet(Path::new("public/assets/app.css")));
        assert!(!config.is_image(Path::new("public/assets/app.css")));
        assert!(config.is_compressed_artifact(Path::new("public/assets/app.js.gz")));
        assert!(config.gzip_allowed(Path::new("public/assets/app.js")));
        assert!(!config.gzip_allowed(Path::new("public/images/logo.png")));
    }

    #[test]
    fn compressed_artifacts_are_not_gzip_allowed() {
        let config = SyncConfig::default();
        assert!(!config.gzip_allowed(Path::new("public/assets/app.js.gz")));
    }

    #[test]
    fn exclusion_matches_relative_path_only() {
        let config = SyncConfig {
            public_root: PathBuf::from("/srv/fonts-site/public"),
            ..SyncConfig::default()
        }
        .with_excludes(vec!["^fonts/".to_string()])
        .unwrap();
        assert!(config.cdn_disabled(Path::new("/srv/fonts-site/public/fonts/a.woff")));
        assert!(!config.cdn_disabled(Path::new("/srv/fonts-site/public/assets/app.css")));
    }
}
