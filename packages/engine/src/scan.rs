//! Local asset enumeration.

use std::fs;
use std::path::{Path, PathBuf};

use asset_sync_config::SyncConfig;

use crate::SyncError;

/// Enumerates every file under the configured asset directories.
///
/// Asset directories that do not exist are skipped (a site without a
/// `javascripts/` directory is fine). Directories are descended into,
/// never reported. The result is sorted so runs are deterministic.
///
/// # Errors
///
/// Returns [`SyncError::Scan`] if a directory cannot be read.
pub fn asset_paths(config: &SyncConfig) -> Result<Vec<PathBuf>, SyncError> {
    let mut paths = Vec::new();
    for dir in &config.asset_dirs {
        let root = config.public_root.join(dir);
        if root.is_dir() {
            collect_files(&root, &mut paths)?;
        }
    }
    paths.sort();
    Ok(paths)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), SyncError> {
    let entries = fs::read_dir(dir).map_err(|source| scan_error(dir, source))?;
    for entry in entries {
        let entry = entry.map_err(|source| scan_error(dir, source))?;
        let file_type = entry
            .file_type()
            .map_err(|source| scan_error(dir, source))?;
        if file_type.is_dir() {
            collect_files(&entry.path(), out)?;
        } else if file_type.is_file() {
            out.push(entry.path());
        }
    }
    Ok(())
}

fn scan_error(dir: &Path, source: std::io::Error) -> SyncError {
    SyncError::Scan {
        path: dir.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_at(root: &Path) -> SyncConfig {
        let toml = format!("bucket = \"assets-test\"\npublic_root = \"{}\"\n", root.display());
        SyncConfig::from_toml_str(&toml).unwrap()
    }

    fn touch(root: &Path, relative: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn finds_files_recursively_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let b = touch(dir.path(), "assets/js/b.js");
        let a = touch(dir.path(), "assets/a.css");
        let logo = touch(dir.path(), "images/logo.png");

        let paths = asset_paths(&config_at(dir.path())).unwrap();
        assert_eq!(paths, vec![a, b, logo]);
    }

    #[test]
    fn skips_files_outside_asset_dirs() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "index.html");
        touch(dir.path(), "private/secret.txt");
        let kept = touch(dir.path(), "stylesheets/app.css");

        assert_eq!(asset_paths(&config_at(dir.path())).unwrap(), vec![kept]);
    }

    #[test]
    fn missing_asset_directories_are_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(asset_paths(&config_at(dir.path())).unwrap().is_empty());
    }
}
