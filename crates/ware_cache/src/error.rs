use std::path::PathBuf;

use ware_fs::{FsError, PathError, RelPath};
use ware_placer::PlacerError;
use ware_types::{Categorized, ErrorCategory, WareError, WareId};

/// An error that might be returned by [`crate::WareCache`].
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The wrapped unpack tool failed. The error is passed on untouched.
    #[error(transparent)]
    Tool(WareError),

    /// The unpack tool produced different content than was asked for.
    #[error("unpacking '{expected}' produced '{actual}' instead")]
    WareIdMismatch {
        /// The requested ware.
        expected: WareId,
        /// The ware the tool reported.
        actual: WareId,
    },

    /// A directory of the shelf namespace could not be created.
    #[error("failed to prepare shelf directory '{0}'")]
    Shelf(RelPath, #[source] FsError),

    /// No staging directory could be allocated.
    #[error("failed to create a staging directory in '{0}'")]
    Staging(PathBuf, #[source] std::io::Error),

    /// The staged content could not be moved onto the shelf.
    #[error("failed to commit '{0}' to the shelf")]
    Commit(WareId, #[source] std::io::Error),

    /// The placement destination is not an absolute path.
    #[error("invalid placement destination '{}'", .0.display())]
    Destination(PathBuf, #[source] PathError),

    /// Placing the shelf content at the destination failed.
    #[error(transparent)]
    Placement(#[from] PlacerError),

    /// The operation was cancelled.
    #[error("operation was cancelled")]
    Cancelled,
}

impl Categorized for CacheError {
    fn category(&self) -> ErrorCategory {
        match self {
            CacheError::Tool(err) => err.category(),
            CacheError::Placement(err) => err.category(),
            CacheError::WareIdMismatch { .. } | CacheError::Destination(..) => {
                ErrorCategory::AssemblyInvalid
            }
            CacheError::Shelf(..) | CacheError::Staging(..) | CacheError::Commit(..) => {
                ErrorCategory::LocalCacheProblem
            }
            CacheError::Cancelled => ErrorCategory::Cancelled,
        }
    }
}

impl From<CacheError> for WareError {
    fn from(value: CacheError) -> Self {
        match value {
            CacheError::Tool(err) => err,
            other => WareError::wrap(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_errors_pass_through_untouched() {
        let err = CacheError::Tool(WareError::new(
            ErrorCategory::WarehouseUnavailable,
            "warehouse offline",
        ));
        assert_eq!(err.category(), ErrorCategory::WarehouseUnavailable);

        let err = WareError::from(err);
        assert_eq!(err.category(), ErrorCategory::WarehouseUnavailable);
        assert_eq!(err.message(), "warehouse offline");
    }

    #[test]
    fn mismatch_is_assembly_invalid() {
        let err = CacheError::WareIdMismatch {
            expected: "tar:aaaaaaaa".parse().unwrap(),
            actual: "tar:bbbbbbbb".parse().unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "unpacking 'tar:aaaaaaaa' produced 'tar:bbbbbbbb' instead"
        );
        assert_eq!(
            WareError::from(err).category(),
            ErrorCategory::AssemblyInvalid
        );
        assert!(!ErrorCategory::AssemblyInvalid.is_retryable());
    }

    #[test]
    fn cancelled() {
        assert_eq!(CacheError::Cancelled.category(), ErrorCategory::Cancelled);
    }
}
