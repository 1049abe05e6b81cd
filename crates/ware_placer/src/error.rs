use ware_fs::{AbsolutePath, EntryType, FsError};
use ware_types::{Categorized, ErrorCategory, PlacementMode, WareError};

/// An error that can occur while placing content or tearing a placement down.
#[derive(Debug, thiserror::Error)]
pub enum PlacerError {
    /// The source could not be inspected.
    #[error("failed to stat placement source '{0}'")]
    StatSource(AbsolutePath, #[source] FsError),

    /// Only plain files and directories can be placed.
    #[error("cannot place '{0}': source may only be a dir or a plain file, not a {1}")]
    UnsupportedSource(AbsolutePath, EntryType),

    /// The destination could not be made ready to receive the content.
    #[error("failed to prepare placement destination '{0}'")]
    PrepareDestination(AbsolutePath, #[source] FsError),

    /// The bind mount was rejected by the host.
    #[error("failed to bind mount '{0}' onto '{1}'")]
    Bind(AbsolutePath, AbsolutePath, #[source] std::io::Error),

    /// The read-only remount was rejected. The bind mount was undone.
    #[error("failed to remount '{0}' read-only")]
    Remount(AbsolutePath, #[source] std::io::Error),

    /// The read-only remount was rejected and undoing the bind mount failed
    /// too. A writable bind mount is still standing at the destination.
    #[error("failed to remount '{destination}' read-only, and unmounting it again failed: {rollback}")]
    RemountRollback {
        /// The destination of the bind mount.
        destination: AbsolutePath,
        /// The error of the remount.
        #[source]
        remount: std::io::Error,
        /// The error of the unmount that tried to undo the bind.
        rollback: std::io::Error,
    },

    /// Unmounting the destination failed.
    #[error("failed to unmount '{0}'")]
    Unmount(AbsolutePath, #[source] std::io::Error),

    /// Copying the source to the destination failed.
    #[error("failed to copy '{0}' to '{1}'")]
    Copy(AbsolutePath, AbsolutePath, #[source] FsError),

    /// Removing a copy during teardown failed.
    #[error("failed to remove the copy at '{0}'")]
    RemoveCopy(AbsolutePath, #[source] FsError),

    /// No placer implements the requested mode on this host.
    #[error("placement mode '{0}' is not supported on this platform")]
    UnsupportedMode(PlacementMode),
}

impl Categorized for PlacerError {
    fn category(&self) -> ErrorCategory {
        match self {
            PlacerError::UnsupportedSource(..)
            | PlacerError::Bind(..)
            | PlacerError::Remount(..)
            | PlacerError::UnsupportedMode(_) => ErrorCategory::AssemblyInvalid,
            PlacerError::StatSource(..)
            | PlacerError::PrepareDestination(..)
            | PlacerError::RemountRollback { .. }
            | PlacerError::Unmount(..)
            | PlacerError::Copy(..)
            | PlacerError::RemoveCopy(..) => ErrorCategory::LocalCacheProblem,
        }
    }
}

impl From<PlacerError> for WareError {
    fn from(value: PlacerError) -> Self {
        WareError::wrap(value)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Error, ErrorKind};

    use ware_fs::RelPath;

    use super::*;

    #[test]
    fn categories() {
        let dest = AbsolutePath::new("/mnt/dest").unwrap();
        assert_eq!(
            PlacerError::UnsupportedSource(dest.clone(), EntryType::NamedPipe).category(),
            ErrorCategory::AssemblyInvalid
        );
        assert_eq!(
            PlacerError::StatSource(dest.clone(), FsError::NotFound(RelPath::base())).category(),
            ErrorCategory::LocalCacheProblem
        );
        assert_eq!(
            PlacerError::Unmount(dest.clone(), Error::from(ErrorKind::Other)).category(),
            ErrorCategory::LocalCacheProblem
        );

        let err = WareError::from(PlacerError::UnsupportedMode(PlacementMode::Mount));
        assert_eq!(err.category(), ErrorCategory::AssemblyInvalid);
    }

    #[test]
    fn rollback_failure_mentions_both_errors() {
        let err = PlacerError::RemountRollback {
            destination: AbsolutePath::new("/mnt/dest").unwrap(),
            remount: Error::new(ErrorKind::PermissionDenied, "remount denied"),
            rollback: Error::new(ErrorKind::Other, "device busy"),
        };
        let message = err.to_string();
        assert!(message.contains("/mnt/dest"));
        assert!(message.contains("device busy"));
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "remount denied");
    }
}
