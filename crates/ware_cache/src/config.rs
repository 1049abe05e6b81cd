use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use ware_types::{FilesetFilters, PlacementMode, UnpackRequest, WareId};

use crate::default_cache_dir;

/// An error that can occur while loading a [`CacheConfig`].
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// IO error while reading configuration file.
    #[error("IO error while reading configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing configuration file.
    #[error("Error parsing configuration file: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Configuration of a [`crate::WareCache`].
///
/// ```toml
/// cache-dir = "/var/cache/ware"
/// default-placement = "mount"
///
/// [filters]
/// mtime = "keep"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Where the cache lives. Defaults to [`default_cache_dir`].
    pub cache_dir: Option<PathBuf>,

    /// How unpacked wares are placed when a request does not say otherwise.
    pub default_placement: PlacementMode,

    /// Filters applied to every unpack.
    pub filters: FilesetFilters,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            default_placement: PlacementMode::Copy,
            filters: FilesetFilters::default(),
        }
    }
}

impl CacheConfig {
    /// Parses a configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, LoadError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads a configuration from a TOML file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let content = fs_err::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Returns the configured cache directory or the default one.
    pub fn cache_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_cache_dir(),
        }
    }

    /// Builds a request to unpack `ware_id` to `path` with the configured
    /// filters and default placement.
    pub fn request(&self, ware_id: WareId, path: impl Into<PathBuf>) -> UnpackRequest {
        UnpackRequest::new(ware_id, path)
            .with_filters(self.filters)
            .with_placement(self.default_placement)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use ware_types::FilterPolicy;

    use super::*;

    #[test]
    fn empty_config() {
        let config = CacheConfig::from_toml_str("").unwrap();
        assert_eq!(config.cache_dir, None);
        assert_eq!(config.default_placement, PlacementMode::Copy);
        assert_eq!(config.filters, FilesetFilters::default());
    }

    #[test]
    fn full_config() {
        let config = CacheConfig::from_toml_str(
            r#"
            cache-dir = "/var/cache/ware"
            default-placement = "mount"

            [filters]
            mtime = "keep"
            uid = "ignore"
            "#,
        )
        .unwrap();
        assert_eq!(config.cache_dir, Some(PathBuf::from("/var/cache/ware")));
        assert_eq!(config.cache_dir().unwrap(), PathBuf::from("/var/cache/ware"));
        assert_eq!(config.default_placement, PlacementMode::Mount);
        assert_eq!(config.filters.mtime, FilterPolicy::Keep);
        assert_eq!(config.filters.uid, FilterPolicy::Ignore);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert_matches!(
            CacheConfig::from_toml_str("cache-directory = \"/tmp\""),
            Err(LoadError::ParseError(_))
        );
        assert_matches!(
            CacheConfig::from_toml_str("default-placement = \"overlay\""),
            Err(LoadError::ParseError(_))
        );
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.toml");
        fs_err::write(&path, "default-placement = \"direct\"\n").unwrap();
        let config = CacheConfig::load_from_file(&path).unwrap();
        assert_eq!(config.default_placement, PlacementMode::Direct);

        assert_matches!(
            CacheConfig::load_from_file(dir.path().join("missing.toml")),
            Err(LoadError::IoError(_))
        );
    }

    #[test]
    fn requests_use_the_defaults() {
        let config = CacheConfig {
            default_placement: PlacementMode::Mount,
            filters: FilesetFilters::default().with_mtime(FilterPolicy::Keep),
            ..CacheConfig::default()
        };
        let request = config.request("tar:abcdef123".parse().unwrap(), "/srv/out");
        assert_eq!(request.placement, PlacementMode::Mount);
        assert_eq!(request.filters.mtime, FilterPolicy::Keep);
        assert_eq!(request.path, PathBuf::from("/srv/out"));
    }
}
