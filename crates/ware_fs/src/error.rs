use std::io::ErrorKind;

use ware_types::{Categorized, ErrorCategory, WareError};

use crate::{PathError, RelPath};

/// An error returned by an [`crate::FsDriver`] operation.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// The entry does not exist.
    #[error("'{0}' does not exist")]
    NotFound(RelPath),

    /// The entry already exists.
    #[error("'{0}' already exists")]
    AlreadyExists(RelPath),

    /// A directory was expected but something else was found.
    #[error("'{0}' is not a directory")]
    NotADirectory(RelPath),

    /// A path could not be constructed.
    #[error(transparent)]
    InvalidPath(#[from] PathError),

    /// The host call failed.
    #[error("io error on '{0}'")]
    Io(RelPath, #[source] std::io::Error),
}

impl FsError {
    /// Classifies an io error that occurred on `path`.
    pub fn from_io(path: &RelPath, err: std::io::Error) -> Self {
        match err.kind() {
            ErrorKind::NotFound => FsError::NotFound(path.clone()),
            ErrorKind::AlreadyExists => FsError::AlreadyExists(path.clone()),
            _ => FsError::Io(path.clone(), err),
        }
    }

    /// Returns true if this error means the entry does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }
}

impl Categorized for FsError {
    fn category(&self) -> ErrorCategory {
        match self {
            FsError::NotFound(_) => ErrorCategory::NotFound,
            FsError::InvalidPath(_) => ErrorCategory::AssemblyInvalid,
            FsError::AlreadyExists(_) | FsError::NotADirectory(_) | FsError::Io(..) => {
                ErrorCategory::LocalCacheProblem
            }
        }
    }
}

impl From<FsError> for WareError {
    fn from(value: FsError) -> Self {
        WareError::wrap(value)
    }
}
