//! Archive path resolution

use crate::error::{LightError, Result};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Maps a logical file name such as `light.mul` to a path on disk.
pub trait PathResolver: Send + Sync {
    /// Resolve `logical_name` to a path. The path need not exist.
    fn resolve(&self, logical_name: &str) -> PathBuf;
}

/// Resolves names inside one client directory.
///
/// Older client installs ship their `.mul` files with inconsistent casing
/// (`Light.mul`, `LIGHTIDX.MUL`), so when the exact name is missing the
/// directory is scanned for a case-insensitive match.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    base: PathBuf,
}

impl DirectoryResolver {
    /// Resolve against `base`
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
        }
    }
}

impl PathResolver for DirectoryResolver {
    fn resolve(&self, logical_name: &str) -> PathBuf {
        let exact = self.base.join(logical_name);
        if exact.exists() {
            return exact;
        }

        let matched = std::fs::read_dir(&self.base).ok().and_then(|entries| {
            entries
                .filter_map(std::result::Result::ok)
                .map(|entry| entry.path())
                .find(|path| {
                    path.file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| name.eq_ignore_ascii_case(logical_name))
                })
        });

        if let Some(path) = matched {
            trace!("Resolved {} to {:?} ignoring case", logical_name, path);
            return path;
        }
        exact
    }
}

/// Fail with [`LightError::FileNotFound`] unless `path` is an existing file.
pub fn ensure_exists(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(LightError::FileNotFound(path.to_path_buf()))
    }
}
