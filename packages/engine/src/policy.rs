//! Per-key upload decision.
//!
//! Rules apply in strict order, first match wins:
//!
//! 1. CDN-excluded source → never upload.
//! 2. Gzip variant → always upload.
//! 3. Stylesheet whose rewritten content may not be stable yet (rewriting
//!    disabled, or some referenced image still missing remotely) → upload.
//! 4. Otherwise upload iff `force_write` is set or the key is new.

use std::path::Path;

use asset_sync_config::SyncConfig;

use crate::keys::Variant;
use crate::run::{RunContext, SyncOptions};

/// Decides whether one key is uploaded in this run.
#[must_use]
pub fn should_upload(
    path: &Path,
    key: &str,
    variant: Variant,
    ctx: &RunContext,
    options: &SyncOptions,
    config: &SyncConfig,
) -> bool {
    if config.cdn_disabled(path) {
        return false;
    }
    if variant == Variant::Gzip {
        return true;
    }
    if config.is_stylesheet(path) && (!config.rewrite_css_paths || ctx.any_image_missing) {
        return true;
    }
    options.force_write || !ctx.index.contains(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;

    use crate::index::RemoteKeyIndex;

    fn context(present: &[&str], any_image_missing: bool) -> RunContext {
        RunContext {
            index: RemoteKeyIndex::from_keys(present.iter().copied()),
            plain_keys: BTreeMap::new(),
            any_image_missing,
        }
    }

    fn config() -> SyncConfig {
        SyncConfig::from_toml_str("bucket = \"assets-test\"\n").unwrap()
    }

    #[test]
    fn excluded_sources_are_never_uploaded() {
        let config = config().with_excludes(vec!["^fonts/".to_string()]).unwrap();
        let ctx = context(&[], true);
        let options = SyncOptions {
            force_write: true,
            ..SyncOptions::default()
        };
        let path = Path::new("public/fonts/icons.woff");

        assert!(!should_upload(path, "k", Variant::Plain, &ctx, &options, &config));
        assert!(!should_upload(path, "k", Variant::Gzip, &ctx, &options, &config));
    }

    #[test]
    fn gzip_variants_are_always_uploaded() {
        let config = config();
        let ctx = context(&["gz-key"], false);
        let options = SyncOptions::default();
        let path = Path::new("public/assets/app.js");

        assert!(should_upload(path, "gz-key", Variant::Gzip, &ctx, &options, &config));
    }

    #[test]
    fn stylesheets_reupload_when_rewriting_is_disabled() {
        let config =
            SyncConfig::from_toml_str("bucket = \"b\"\nrewrite_css_paths = false\n").unwrap();
        let ctx = context(&["css-key"], false);
        let options = SyncOptions::default();
        let path = Path::new("public/stylesheets/app.css");

        assert!(should_upload(path, "css-key", Variant::Plain, &ctx, &options, &config));
    }

    #[test]
    fn stylesheets_reupload_while_any_image_is_missing() {
        let config = config();
        let ctx = context(&["css-key"], true);
        let options = SyncOptions::default();
        let path = Path::new("public/stylesheets/app.css");

        assert!(should_upload(path, "css-key", Variant::Plain, &ctx, &options, &config));
    }

    #[test]
    fn stable_present_stylesheets_are_skipped() {
        let config = config();
        let ctx = context(&["css-key"], false);
        let options = SyncOptions::default();
        let path = Path::new("public/stylesheets/app.css");

        assert!(!should_upload(path, "css-key", Variant::Plain, &ctx, &options, &config));
    }

    #[test]
    fn present_keys_are_skipped_absent_keys_are_uploaded() {
        let config = config();
        let ctx = context(&["present"], false);
        let options = SyncOptions::default();
        let path = Path::new("public/images/logo.png");

        assert!(!should_upload(path, "present", Variant::Plain, &ctx, &options, &config));
        assert!(should_upload(path, "absent", Variant::Plain, &ctx, &options, &config));
    }

    #[test]
    fn force_write_overrides_presence() {
        let config = config();
        let ctx = context(&["present"], false);
        let options = SyncOptions {
            force_write: true,
            ..SyncOptions::default()
        };
        let path = Path::new("public/images/logo.png");

        assert!(should_upload(path, "present", Variant::Plain, &ctx, &options, &config));
    }
}
