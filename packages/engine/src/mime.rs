//! Static extension → content-type table.
//!
//! Covers the asset families a CDN bucket actually serves; anything else
//! falls back to a generic binary type rather than erroring.

use std::path::Path;

/// Fallback for unknown extensions.
const GENERIC_BINARY: &str = "application/octet-stream";

/// Content type for a file extension, case-insensitive.
#[must_use]
pub fn content_type_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "css" => "text/css",
        "js" => "application/javascript",
        "html" | "htm" => "text/html",
        "txt" => "text/plain",
        "json" => "application/json",
        "xml" => "application/xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "swf" => "application/x-shockwave-flash",
        "flv" => "video/x-flv",
        _ => GENERIC_BINARY,
    }
}

/// Content type for a path, from its extension.
#[must_use]
pub fn content_type_for_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(std::ffi::OsStr::to_str)
        .map_or(GENERIC_BINARY, content_type_for_extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_common_asset_types() {
        assert_eq!(content_type_for_extension("css"), "text/css");
        assert_eq!(content_type_for_extension("js"), "application/javascript");
        assert_eq!(content_type_for_extension("png"), "image/png");
        assert_eq!(content_type_for_extension("woff2"), "font/woff2");
    }

    #[test]
    fn is_case_insensitive() {
        assert_eq!(content_type_for_extension("PNG"), "image/png");
        assert_eq!(content_type_for_path(Path::new("logo.JPG")), "image/jpeg");
    }

    #[test]
    fn unknown_extensions_fall_back_to_binary() {
        assert_eq!(content_type_for_extension("xyz"), GENERIC_BINARY);
        assert_eq!(content_type_for_path(Path::new("Makefile")), GENERIC_BINARY);
    }
}
