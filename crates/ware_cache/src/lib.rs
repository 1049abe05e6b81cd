#![deny(missing_docs)]

//! A content-addressed cache for unpacked wares.
//!
//! [`WareCache`] wraps any [`ware_types::UnpackTool`] and is itself one, so it
//! composes with everything that accepts an unpack tool. Wares are kept on
//! shelves below the cache root, see [`shelf_for`] for the layout.

use std::path::{Path, PathBuf};

mod cache;
mod config;
mod error;
mod shelf;

pub use cache::{Placement, WareCache};
pub use config::{CacheConfig, LoadError};
pub use error::CacheError;
pub use shelf::{namespace_for, shelf_for, FILESET_DIR, STAGING_DIR};

/// The standard CACHEDIR.TAG header that identifies a cache directory.
/// See <https://bford.info/cachedir/> for details.
const CACHEDIR_TAG: &str = "Signature: 8a477f597d28d172789f06886806bc55
# This file is a cache directory tag created by ware_cache.
# For information about cache directory tags, see:
#\thttps://bford.info/cachedir/
";

/// Determines the default cache directory.
/// It first checks the environment variable `WARE_CACHE_DIR`.
/// If not set, it falls back to `dirs::cache_dir()/ware/cache`.
pub fn default_cache_dir() -> anyhow::Result<PathBuf> {
    std::env::var("WARE_CACHE_DIR")
        .map(PathBuf::from)
        .or_else(|_| {
            dirs::cache_dir()
                .ok_or_else(|| {
                    anyhow::anyhow!("could not determine cache directory for current platform")
                })
                .map(|mut p| {
                    p.push("ware");
                    p.push("cache");
                    p
                })
        })
}

/// Creates the cache directory if it doesn't exist and tags it with a
/// `CACHEDIR.TAG` so backup tools skip it.
///
/// This is idempotent - calling it multiple times on the same directory is safe.
pub fn ensure_cache_dir(path: &Path) -> std::io::Result<()> {
    fs_err::create_dir_all(path)?;
    let tag_path = path.join("CACHEDIR.TAG");
    if !tag_path.exists() {
        fs_err::write(&tag_path, CACHEDIR_TAG)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cache_dir_honors_env() {
        temp_env::with_var("WARE_CACHE_DIR", Some("/custom/cache"), || {
            assert_eq!(default_cache_dir().unwrap(), PathBuf::from("/custom/cache"));
        });
    }

    #[test]
    fn default_cache_dir_fallback() {
        temp_env::with_var_unset("WARE_CACHE_DIR", || {
            if let Ok(dir) = default_cache_dir() {
                assert!(dir.ends_with("ware/cache"));
            }
        });
    }

    #[test]
    fn ensure_cache_dir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("nested/cache");

        ensure_cache_dir(&cache).unwrap();
        ensure_cache_dir(&cache).unwrap();

        let tag = fs_err::read_to_string(cache.join("CACHEDIR.TAG")).unwrap();
        assert!(tag.starts_with("Signature: 8a477f597d28d172789f06886806bc55"));
    }
}
