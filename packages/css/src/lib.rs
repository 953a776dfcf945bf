#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Stylesheet `url()` rewriting.
//!
//! Stylesheets reference sibling assets (`url(/images/logo.png)`); once those
//! assets move behind a CDN their addresses change, so the stylesheet body
//! has to be rewritten before it is uploaded. This crate finds `url()`
//! references, asks a [`UrlResolver`] for each one's new address, and leaves
//! anything it cannot resolve untouched.
//!
//! Never rewritten: `data:` URIs, absolute `http(s)` URLs, protocol-relative
//! `//` URLs, and `#fragment`-only references. Query strings and fragments on
//! local references are dropped on rewrite; the new address carries a content
//! hash, which supersedes query-string cache busting.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tempfile::{Builder, NamedTempFile};
use thiserror::Error;

/// Regex for `url()` references: double-quoted, single-quoted, or bare.
static CSS_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*(?:"(?P<double>[^"]*)"|'(?P<single>[^']*)'|(?P<bare>[^"')][^)]*?))\s*\)"#)
        .expect("valid regex")
});

/// Errors from rewriting a stylesheet on disk.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// Reading the source stylesheet failed.
    #[error("failed to read stylesheet {path}: {source}")]
    Read {
        /// Stylesheet that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Creating or writing the rewritten temporary file failed.
    #[error("failed to write rewritten copy of {path}: {source}")]
    Write {
        /// Stylesheet being rewritten.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Maps a `url()` reference to its rewritten address.
///
/// The reference arrives with surrounding quotes, whitespace, query string,
/// and fragment already stripped (e.g. `/images/logo.png` or
/// `../images/logo.png`). Return `None` to leave the reference untouched.
pub trait UrlResolver {
    /// Resolves a cleaned reference to its new address, if known.
    fn resolve(&self, reference: &str) -> Option<String>;
}

impl<F> UrlResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn resolve(&self, reference: &str) -> Option<String> {
        self(reference)
    }
}

/// Rewrites every resolvable `url()` reference in a CSS document.
///
/// Quoting style is preserved; unresolvable or external references are
/// copied through verbatim.
#[must_use]
pub fn rewrite_css_text(css: &str, resolver: &dyn UrlResolver) -> String {
    CSS_URL_RE
        .replace_all(css, |caps: &Captures<'_>| {
            let (reference, quote) = match (
                caps.name("double"),
                caps.name("single"),
                caps.name("bare"),
            ) {
                (Some(m), _, _) => (m.as_str(), "\""),
                (_, Some(m), _) => (m.as_str(), "'"),
                (_, _, Some(m)) => (m.as_str().trim(), ""),
                _ => return caps[0].to_string(),
            };

            resolve_reference(reference, resolver).map_or_else(
                || caps[0].to_string(),
                |url| format!("url({quote}{url}{quote})"),
            )
        })
        .into_owned()
}

/// Rewrites a stylesheet file into a temporary file.
///
/// The temporary file holds the full rewritten document, is named after
/// the source stylesheet, and is deleted when the returned handle is
/// dropped.
///
/// # Errors
///
/// Returns [`RewriteError::Read`] if the stylesheet cannot be read and
/// [`RewriteError::Write`] if the temporary file cannot be created or
/// written.
pub fn rewrite_stylesheet(
    path: &Path,
    resolver: &dyn UrlResolver,
) -> Result<NamedTempFile, RewriteError> {
    let css = fs::read_to_string(path).map_err(|source| RewriteError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let rewritten = rewrite_css_text(&css, resolver);

    let stem = path
        .file_stem()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("stylesheet");
    let mut file = Builder::new()
        .prefix(stem)
        .suffix(".css")
        .tempfile()
        .map_err(|source| RewriteError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    file.write_all(rewritten.as_bytes())
        .map_err(|source| RewriteError::Write {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(file)
}

fn resolve_reference(reference: &str, resolver: &dyn UrlResolver) -> Option<String> {
    if reference.is_empty() || is_external(reference) {
        return None;
    }

    let end = reference.find(['?', '#']).unwrap_or(reference.len());
    let cleaned = &reference[..end];
    if cleaned.is_empty() {
        return None;
    }

    resolver.resolve(cleaned)
}

fn is_external(reference: &str) -> bool {
    reference.starts_with("data:")
        || reference.starts_with("http://")
        || reference.starts_with("https://")
        || reference.starts_with("//")
        || reference.starts_with('#')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logo_resolver(reference: &str) -> Option<String> {
        (reference == "/images/logo.png").then(|| "/cdn/deadbeef/logo.png".to_string())
    }

    #[test]
    fn rewrites_bare_reference() {
        let css = "body { background: url(/images/logo.png); }";
        assert_eq!(
            rewrite_css_text(css, &logo_resolver),
            "body { background: url(/cdn/deadbeef/logo.png); }"
        );
    }

    #[test]
    fn preserves_quoting_style() {
        let css = r#"a { background: url("/images/logo.png"); }
b { background: url('/images/logo.png'); }"#;
        let rewritten = rewrite_css_text(css, &logo_resolver);
        assert!(rewritten.contains(r#"url("/cdn/deadbeef/logo.png")"#));
        assert!(rewritten.contains("url('/cdn/deadbeef/logo.png')"));
    }

    #[test]
    fn trims_whitespace_inside_parens() {
        let css = "body { background: url(  /images/logo.png  ); }";
        assert_eq!(
            rewrite_css_text(css, &logo_resolver),
            "body { background: url(/cdn/deadbeef/logo.png); }"
        );
    }

    #[test]
    fn strips_query_string_and_fragment() {
        let css = "a { background: url(/images/logo.png?1234567890); }\
                   b { background: url(/images/logo.png#icon); }";
        let rewritten = rewrite_css_text(css, &logo_resolver);
        assert!(!rewritten.contains('?'));
        assert!(!rewritten.contains('#'));
        assert_eq!(rewritten.matches("/cdn/deadbeef/logo.png").count(), 2);
    }

    #[test]
    fn leaves_external_references_untouched() {
        let css = "a { background: url(data:image/png;base64,AAAA); }\
                   b { background: url(https://example.com/x.png); }\
                   c { background: url(//example.com/y.png); }\
                   d { filter: url(#blur); }";
        assert_eq!(rewrite_css_text(css, &logo_resolver), css);
    }

    #[test]
    fn leaves_unresolvable_references_untouched() {
        let css = "body { background: url(/images/unknown.png); }";
        assert_eq!(rewrite_css_text(css, &logo_resolver), css);
    }

    #[test]
    fn leaves_empty_references_untouched() {
        let css = r#"a { background: url(); } b { background: url(""); }"#;
        assert_eq!(rewrite_css_text(css, &logo_resolver), css);
    }

    #[test]
    fn rewrites_multiple_references_on_one_line() {
        let resolver = |reference: &str| match reference {
            "/images/a.png" => Some("/cdn/11111111/a.png".to_string()),
            "/images/b.png" => Some("/cdn/22222222/b.png".to_string()),
            _ => None,
        };
        let css = "div { background: url(/images/a.png), url(/images/b.png); }";
        assert_eq!(
            rewrite_css_text(css, &resolver),
            "div { background: url(/cdn/11111111/a.png), url(/cdn/22222222/b.png); }"
        );
    }

    #[test]
    fn rewrite_stylesheet_writes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = dir.path().join("app.css");
        fs::write(&sheet, "body { background: url(/images/logo.png); }").unwrap();

        let rewritten = rewrite_stylesheet(&sheet, &logo_resolver).unwrap();
        let contents = fs::read_to_string(rewritten.path()).unwrap();
        assert_eq!(contents, "body { background: url(/cdn/deadbeef/logo.png); }");

        let name = rewritten.path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("app") && name.ends_with(".css"));
    }

    #[test]
    fn temp_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = dir.path().join("app.css");
        fs::write(&sheet, "body {}").unwrap();

        let rewritten = rewrite_stylesheet(&sheet, &logo_resolver).unwrap();
        let temp_path = rewritten.path().to_path_buf();
        assert!(temp_path.exists());
        drop(rewritten);
        assert!(!temp_path.exists());
    }

    #[test]
    fn missing_stylesheet_reports_read_error() {
        let err = rewrite_stylesheet(Path::new("/nonexistent/app.css"), &logo_resolver)
            .expect_err("read should fail");
        assert!(matches!(err, RewriteError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/app.css"));
    }
}
