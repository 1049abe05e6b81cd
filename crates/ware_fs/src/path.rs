//! Absolute and relative paths that are lexically normalized on construction.

use std::{
    ffi::OsString,
    fmt::{Display, Formatter},
    path::{Component, Path, PathBuf},
};

/// An error that occurs when constructing an [`AbsolutePath`] or [`RelPath`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// An absolute path was required.
    #[error("'{0}' is not an absolute path")]
    NotAbsolute(PathBuf),

    /// A relative path was required.
    #[error("'{0}' is not a relative path")]
    NotRelative(PathBuf),

    /// The relative path uses `..` to climb above its base.
    #[error("'{0}' escapes its base directory")]
    EscapesBase(PathBuf),
}

/// A rooted, filesystem-global path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AbsolutePath(PathBuf);

/// A path relative to an implicit base. The empty path denotes the base itself.
///
/// A `RelPath` never contains `..` segments, so joining it onto a base can
/// never leave that base.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelPath(PathBuf);

impl AbsolutePath {
    /// Constructs an absolute path, resolving `.` and `..` lexically. `..` at
    /// the root stays at the root.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, PathError> {
        let path = path.as_ref();
        if !path.is_absolute() {
            return Err(PathError::NotAbsolute(path.to_path_buf()));
        }
        let mut segments: Vec<OsString> = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(segment) => segments.push(segment.to_os_string()),
                Component::ParentDir => {
                    segments.pop();
                }
                Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            }
        }
        let mut normalized = PathBuf::from("/");
        normalized.extend(segments);
        Ok(Self(normalized))
    }

    /// The filesystem root, `/`.
    pub fn root() -> Self {
        Self(PathBuf::from("/"))
    }

    /// Joins a relative path onto this one.
    pub fn join(&self, rel: &RelPath) -> AbsolutePath {
        if rel.is_base() {
            self.clone()
        } else {
            AbsolutePath(self.0.join(&rel.0))
        }
    }

    /// Reinterprets this path as relative to the filesystem root.
    pub fn coerce_relative(&self) -> RelPath {
        RelPath(self.0.strip_prefix("/").unwrap_or(&self.0).to_path_buf())
    }

    /// Returns the parent directory, or `None` for the root.
    pub fn parent(&self) -> Option<AbsolutePath> {
        self.0.parent().map(|parent| AbsolutePath(parent.to_path_buf()))
    }

    /// Borrows the underlying path.
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for AbsolutePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for AbsolutePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl TryFrom<&Path> for AbsolutePath {
    type Error = PathError;

    fn try_from(value: &Path) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<PathBuf> for AbsolutePath {
    type Error = PathError;

    fn try_from(value: PathBuf) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl RelPath {
    /// Constructs a relative path, resolving `.` and `..` lexically.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, PathError> {
        let path = path.as_ref();
        let mut segments: Vec<OsString> = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(segment) => segments.push(segment.to_os_string()),
                Component::CurDir => {}
                Component::ParentDir => {
                    if segments.pop().is_none() {
                        return Err(PathError::EscapesBase(path.to_path_buf()));
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(PathError::NotRelative(path.to_path_buf()));
                }
            }
        }
        Ok(Self(segments.into_iter().collect()))
    }

    /// The base itself.
    pub fn base() -> Self {
        Self(PathBuf::new())
    }

    /// Returns true if this path denotes the base itself.
    pub fn is_base(&self) -> bool {
        self.0.as_os_str().is_empty()
    }

    /// Joins another relative path onto this one.
    pub fn join(&self, other: impl AsRef<Path>) -> Result<RelPath, PathError> {
        RelPath::new(self.0.join(other))
    }

    /// Returns the parent, or `None` for the base.
    pub fn parent(&self) -> Option<RelPath> {
        if self.is_base() {
            None
        } else {
            Some(RelPath(
                self.0.parent().map(Path::to_path_buf).unwrap_or_default(),
            ))
        }
    }

    /// Returns the last segment, or `None` for the base.
    pub fn file_name(&self) -> Option<&std::ffi::OsStr> {
        self.0.file_name()
    }

    /// Borrows the underlying path.
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl Display for RelPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_base() {
            f.write_str(".")
        } else {
            write!(f, "./{}", self.0.display())
        }
    }
}
