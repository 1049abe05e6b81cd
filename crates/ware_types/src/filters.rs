use serde::{Deserialize, Serialize};

/// What a tool should do with one class of file attributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterPolicy {
    /// Let the tool apply its own default for this attribute.
    #[default]
    Unspecified,
    /// Preserve the attribute exactly.
    Keep,
    /// Discard the attribute; it does not contribute to the ware id.
    Ignore,
}

impl FilterPolicy {
    /// Resolves the policy to a keep/ignore decision, using `keep_by_default`
    /// when the policy is [`FilterPolicy::Unspecified`].
    pub fn keeps(self, keep_by_default: bool) -> bool {
        match self {
            FilterPolicy::Unspecified => keep_by_default,
            FilterPolicy::Keep => true,
            FilterPolicy::Ignore => false,
        }
    }
}

/// Filters that are applied while packing or unpacking a fileset.
///
/// The filters influence which attributes contribute to a ware id. They are
/// forwarded to the tools unmodified by the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FilesetFilters {
    /// Owning user ids.
    pub uid: FilterPolicy,
    /// Owning group ids.
    pub gid: FilterPolicy,
    /// Modification times.
    pub mtime: FilterPolicy,
    /// The sticky bit.
    pub sticky: FilterPolicy,
    /// The setuid and setgid bits.
    pub setid: FilterPolicy,
    /// Device nodes.
    pub dev: FilterPolicy,
}

impl FilesetFilters {
    /// Returns a copy of these filters with the mtime policy replaced.
    pub fn with_mtime(mut self, mtime: FilterPolicy) -> Self {
        self.mtime = mtime;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unspecified_falls_back_to_default() {
        assert!(FilterPolicy::Unspecified.keeps(true));
        assert!(!FilterPolicy::Unspecified.keeps(false));
        assert!(FilterPolicy::Keep.keeps(false));
        assert!(!FilterPolicy::Ignore.keeps(true));
    }

    #[test]
    fn deserialize_partial() {
        let filters: FilesetFilters = serde_json::from_str(r#"{"mtime": "keep"}"#).unwrap();
        assert_eq!(filters, FilesetFilters::default().with_mtime(FilterPolicy::Keep));
    }
}
