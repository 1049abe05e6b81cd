use std::{
    ffi::OsString,
    fs::File,
    path::{Path, PathBuf},
    time::SystemTime,
};

use nix::fcntl::OFlag;

use crate::{AbsolutePath, FsError, Metadata, Perms, RelPath};

/// The kind of device node to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// A block device.
    Block,
    /// A character device.
    Char,
}

/// Capability interface over a filesystem rooted at one base path.
///
/// All operations take a [`RelPath`] that is joined onto [`FsDriver::base_path`].
/// None of the operations follow a symlink in the final path component unless
/// stated otherwise.
pub trait FsDriver: Send + Sync {
    /// The absolute path every relative path is resolved against.
    fn base_path(&self) -> &AbsolutePath;

    /// Opens a file with the given `open(2)` flags. `perms` is used when the
    /// file is created.
    fn open(&self, path: &RelPath, flags: OFlag, perms: Perms) -> Result<File, FsError>;

    /// Creates a directory.
    fn mkdir(&self, path: &RelPath, perms: Perms) -> Result<(), FsError>;

    /// Creates a symlink at `path` pointing at `target`. The target is stored
    /// literally and never resolved.
    fn mksymlink(&self, path: &RelPath, target: &Path) -> Result<(), FsError>;

    /// Creates a named pipe.
    fn mkfifo(&self, path: &RelPath, perms: Perms) -> Result<(), FsError>;

    /// Creates a block or character device node.
    fn mkdevice(
        &self,
        path: &RelPath,
        kind: DeviceKind,
        major: u32,
        minor: u32,
        perms: Perms,
    ) -> Result<(), FsError>;

    /// Changes the owner of the entry itself. Never follows a symlink.
    fn chown(&self, path: &RelPath, uid: u32, gid: u32) -> Result<(), FsError>;

    /// Changes the permission bits.
    fn chmod(&self, path: &RelPath, perms: Perms) -> Result<(), FsError>;

    /// Returns the metadata of the entry without following a final symlink.
    /// For symlinks the target is looked up as well; if that lookup fails the
    /// whole call fails.
    fn stat_link(&self, path: &RelPath) -> Result<Metadata, FsError>;

    /// Reads the target of a symlink.
    ///
    /// Returns `Ok(None)` if the entry exists but is not a symlink. Callers
    /// frequently check speculatively, so this is not an error.
    fn readlink(&self, path: &RelPath) -> Result<Option<PathBuf>, FsError>;

    /// Lists the names in a directory, sorted.
    fn read_dir_names(&self, path: &RelPath) -> Result<Vec<OsString>, FsError>;

    /// Renames an entry.
    fn rename(&self, from: &RelPath, to: &RelPath) -> Result<(), FsError>;

    /// Removes an entry and, for directories, everything below it. Succeeds if
    /// the entry does not exist.
    fn remove_all(&self, path: &RelPath) -> Result<(), FsError>;

    /// Sets the modification time of the entry itself. Never follows a
    /// symlink.
    fn set_mtime(&self, path: &RelPath, mtime: SystemTime) -> Result<(), FsError>;

    /// Returns true if an entry exists at `path`.
    fn exists(&self, path: &RelPath) -> Result<bool, FsError> {
        match self.stat_link(path) {
            Ok(_) => Ok(true),
            Err(FsError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
