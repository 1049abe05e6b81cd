use std::{
    ffi::OsString,
    fs::File,
    io::ErrorKind,
    os::unix::fs::{DirBuilderExt, MetadataExt, OpenOptionsExt, PermissionsExt},
    path::{Path, PathBuf},
    time::SystemTime,
};

use filetime::FileTime;
use nix::{
    fcntl::OFlag,
    sys::stat::{Mode, SFlag},
};

use crate::{
    devnum, fs_op, AbsolutePath, DeviceKind, EntryType, FsDriver, FsError, Metadata, Perms, RelPath,
};

/// An [`FsDriver`] backed by the host operating system.
#[derive(Debug, Clone)]
pub struct OsFs {
    base: AbsolutePath,
}

impl OsFs {
    /// Constructs a driver rooted at `base`.
    pub fn new(base: AbsolutePath) -> Self {
        Self { base }
    }

    /// Constructs a driver rooted at the filesystem root.
    pub fn root() -> Self {
        Self::new(AbsolutePath::root())
    }

    /// Returns the host path of a path relative to the base.
    pub fn host_path(&self, path: &RelPath) -> PathBuf {
        self.base.join(path).as_path().to_path_buf()
    }
}

fn mode_of(perms: Perms) -> Mode {
    Mode::from_bits_truncate(perms.to_host_mode() as libc::mode_t)
}

impl FsDriver for OsFs {
    fn base_path(&self) -> &AbsolutePath {
        &self.base
    }

    fn open(&self, path: &RelPath, flags: OFlag, perms: Perms) -> Result<File, FsError> {
        let mut options = std::fs::OpenOptions::new();
        let access = flags & OFlag::O_ACCMODE;
        if access == OFlag::O_WRONLY {
            options.write(true);
        } else if access == OFlag::O_RDWR {
            options.read(true).write(true);
        } else {
            options.read(true);
        }
        if flags.contains(OFlag::O_CREAT) {
            if flags.contains(OFlag::O_EXCL) {
                options.create_new(true);
            } else {
                options.create(true);
            }
        }
        options
            .truncate(flags.contains(OFlag::O_TRUNC))
            .append(flags.contains(OFlag::O_APPEND));

        // Everything std does not model is passed through as is.
        let handled = OFlag::O_ACCMODE
            | OFlag::O_CREAT
            | OFlag::O_EXCL
            | OFlag::O_TRUNC
            | OFlag::O_APPEND;
        options
            .custom_flags(flags.difference(handled).bits())
            .mode(perms.to_host_mode());

        options
            .open(self.host_path(path))
            .map_err(|e| FsError::from_io(path, e))
    }

    fn mkdir(&self, path: &RelPath, perms: Perms) -> Result<(), FsError> {
        std::fs::DirBuilder::new()
            .mode(perms.to_host_mode())
            .create(self.host_path(path))
            .map_err(|e| FsError::from_io(path, e))
    }

    fn mksymlink(&self, path: &RelPath, target: &Path) -> Result<(), FsError> {
        std::os::unix::fs::symlink(target, self.host_path(path))
            .map_err(|e| FsError::from_io(path, e))
    }

    fn mkfifo(&self, path: &RelPath, perms: Perms) -> Result<(), FsError> {
        nix::unistd::mkfifo(&self.host_path(path), mode_of(perms))
            .map_err(|e| FsError::from_io(path, e.into()))
    }

    fn mkdevice(
        &self,
        path: &RelPath,
        kind: DeviceKind,
        major: u32,
        minor: u32,
        perms: Perms,
    ) -> Result<(), FsError> {
        let kind = match kind {
            DeviceKind::Block => SFlag::S_IFBLK,
            DeviceKind::Char => SFlag::S_IFCHR,
        };
        nix::sys::stat::mknod(
            &self.host_path(path),
            kind,
            mode_of(perms),
            devnum::join(major, minor) as libc::dev_t,
        )
        .map_err(|e| FsError::from_io(path, e.into()))
    }

    fn chown(&self, path: &RelPath, uid: u32, gid: u32) -> Result<(), FsError> {
        std::os::unix::fs::lchown(self.host_path(path), Some(uid), Some(gid))
            .map_err(|e| FsError::from_io(path, e))
    }

    fn chmod(&self, path: &RelPath, perms: Perms) -> Result<(), FsError> {
        std::fs::set_permissions(
            self.host_path(path),
            std::fs::Permissions::from_mode(perms.to_host_mode()),
        )
        .map_err(|e| FsError::from_io(path, e))
    }

    fn stat_link(&self, path: &RelPath) -> Result<Metadata, FsError> {
        let meta = std::fs::symlink_metadata(self.host_path(path))
            .map_err(|e| FsError::from_io(path, e))?;

        let entry_type = EntryType::from_host_mode(meta.mode());
        let (dev_major, dev_minor) = if entry_type.is_device() {
            devnum::split(meta.rdev())
        } else {
            (0, 0)
        };

        // One more call for symlinks, we almost always want the target.
        let link_target = if entry_type.is_symlink() {
            self.readlink(path)?
        } else {
            None
        };

        Ok(Metadata {
            name: path.clone(),
            entry_type,
            perms: Perms::from_host_mode(meta.mode()),
            uid: meta.uid(),
            gid: meta.gid(),
            size: meta.size(),
            mtime: meta.modified().map_err(|e| FsError::from_io(path, e))?,
            dev_major,
            dev_minor,
            link_target,
        })
    }

    fn readlink(&self, path: &RelPath) -> Result<Option<PathBuf>, FsError> {
        match std::fs::read_link(self.host_path(path)) {
            Ok(target) => Ok(Some(target)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(FsError::NotFound(path.clone())),
            // EINVAL means "not a symlink".
            Err(e) if e.raw_os_error() == Some(libc::EINVAL) => Ok(None),
            Err(e) => Err(FsError::Io(path.clone(), e)),
        }
    }

    fn read_dir_names(&self, path: &RelPath) -> Result<Vec<OsString>, FsError> {
        let entries =
            std::fs::read_dir(self.host_path(path)).map_err(|e| FsError::from_io(path, e))?;
        let mut names = entries
            .map(|entry| entry.map(|entry| entry.file_name()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| FsError::from_io(path, e))?;
        names.sort();
        Ok(names)
    }

    fn rename(&self, from: &RelPath, to: &RelPath) -> Result<(), FsError> {
        std::fs::rename(self.host_path(from), self.host_path(to))
            .map_err(|e| FsError::from_io(from, e))
    }

    fn remove_all(&self, path: &RelPath) -> Result<(), FsError> {
        let host_path = self.host_path(path);
        let meta = match std::fs::symlink_metadata(&host_path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(FsError::Io(path.clone(), e)),
        };
        let result = if meta.is_dir() {
            match fs_err::remove_dir_all(&host_path) {
                // Read-only directories somewhere below, open them up and retry.
                Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                    fs_op::make_removable(self, path)?;
                    fs_err::remove_dir_all(&host_path)
                }
                result => result,
            }
        } else {
            fs_err::remove_file(&host_path)
        };
        match result {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(FsError::Io(path.clone(), e)),
            _ => Ok(()),
        }
    }

    fn set_mtime(&self, path: &RelPath, mtime: SystemTime) -> Result<(), FsError> {
        let time = FileTime::from_system_time(mtime);
        filetime::set_symlink_file_times(self.host_path(path), time, time)
            .map_err(|e| FsError::from_io(path, e))
    }
}
