//! Compound operations built on top of an [`FsDriver`].

use std::io::{Error, ErrorKind};

use nix::fcntl::OFlag;

use crate::{DeviceKind, EntryType, FsDriver, FsError, Metadata, Perms, RelPath};

/// Creates `path` and every missing parent with the given permissions.
///
/// Existing directories are left untouched. Fails with
/// [`FsError::NotADirectory`] if something other than a directory is in the
/// way.
pub fn mkdir_all<D: FsDriver + ?Sized>(
    driver: &D,
    path: &RelPath,
    perms: Perms,
) -> Result<(), FsError> {
    if path.is_base() {
        return Ok(());
    }
    match driver.stat_link(path) {
        Ok(meta) if meta.entry_type.is_dir() => return Ok(()),
        Ok(_) => return Err(FsError::NotADirectory(path.clone())),
        Err(FsError::NotFound(_)) => {}
        // A parent is not a directory, the recursion below names it.
        Err(FsError::Io(_, e))
            if e.kind() == ErrorKind::NotADirectory && path.parent().is_some() => {}
        Err(e) => return Err(e),
    }
    if let Some(parent) = path.parent() {
        mkdir_all(driver, &parent, perms)?;
    }
    match driver.mkdir(path, perms) {
        // Someone else created it in the meantime.
        Err(FsError::AlreadyExists(_)) => match driver.stat_link(path)? {
            meta if meta.entry_type.is_dir() => Ok(()),
            _ => Err(FsError::NotADirectory(path.clone())),
        },
        result => result,
    }
}

/// Gives the owner full access to `path` and every directory below it, so
/// that the whole tree can be removed even if it contains read-only
/// directories. Anything that is not a directory is left alone.
pub fn make_removable<D: FsDriver + ?Sized>(driver: &D, path: &RelPath) -> Result<(), FsError> {
    let meta = driver.stat_link(path)?;
    if !meta.entry_type.is_dir() {
        return Ok(());
    }
    let owner = Perms::from_bits(0o700);
    if !meta.perms.contains(owner) {
        driver.chmod(path, meta.perms | owner)?;
    }
    for name in driver.read_dir_names(path)? {
        make_removable(driver, &path.join(&name)?)?;
    }
    Ok(())
}

/// Recursively copies the entry at `src_path` on `src` to `dst_path` on
/// `dst`.
///
/// Permissions and modification times are reproduced for everything but
/// symlinks, whose permissions are meaningless. Ownership is reproduced only
/// when running as root. Sockets cannot be recreated and are skipped.
///
/// The destination must not exist yet.
pub fn copy_tree<S, D>(
    src: &S,
    src_path: &RelPath,
    dst: &D,
    dst_path: &RelPath,
) -> Result<(), FsError>
where
    S: FsDriver + ?Sized,
    D: FsDriver + ?Sized,
{
    let meta = src.stat_link(src_path)?;

    // Entries start out private and get their real permissions once their
    // content is in place.
    let private = Perms::from_bits(0o700);
    match meta.entry_type {
        EntryType::Dir => {
            dst.mkdir(dst_path, private)?;
            for name in src.read_dir_names(src_path)? {
                copy_tree(src, &src_path.join(&name)?, dst, &dst_path.join(&name)?)?;
            }
        }
        EntryType::File => {
            let mut reader = src.open(src_path, OFlag::O_RDONLY, Perms::from_bits(0))?;
            let mut writer = dst.open(
                dst_path,
                OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_WRONLY,
                Perms::from_bits(0o600),
            )?;
            std::io::copy(&mut reader, &mut writer)
                .map_err(|e| FsError::Io(dst_path.clone(), e))?;
        }
        EntryType::Symlink => {
            let Some(target) = meta.link_target.as_deref() else {
                return Err(FsError::Io(
                    src_path.clone(),
                    Error::new(ErrorKind::InvalidData, "symlink without a target"),
                ));
            };
            dst.mksymlink(dst_path, target)?;
        }
        EntryType::NamedPipe => dst.mkfifo(dst_path, private)?,
        EntryType::Device | EntryType::CharDevice => {
            let kind = if meta.entry_type == EntryType::Device {
                DeviceKind::Block
            } else {
                DeviceKind::Char
            };
            dst.mkdevice(dst_path, kind, meta.dev_major, meta.dev_minor, private)?;
        }
        EntryType::Socket => {
            tracing::debug!("skipping socket '{src_path}' while copying");
            return Ok(());
        }
    }

    apply_metadata(dst, dst_path, &meta)
}

fn apply_metadata<D: FsDriver + ?Sized>(
    dst: &D,
    dst_path: &RelPath,
    meta: &Metadata,
) -> Result<(), FsError> {
    // chown clears setuid and setgid, so it goes first.
    if nix::unistd::geteuid().is_root() {
        dst.chown(dst_path, meta.uid, meta.gid)?;
    }
    if !meta.entry_type.is_symlink() {
        dst.chmod(dst_path, meta.perms)?;
    }
    dst.set_mtime(dst_path, meta.mtime)
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        path::{Path, PathBuf},
        time::{Duration, SystemTime},
    };

    use assert_matches::assert_matches;

    use super::*;
    use crate::{AbsolutePath, OsFs};

    fn rel(path: &str) -> RelPath {
        RelPath::new(path).unwrap()
    }

    fn scratch() -> (tempfile::TempDir, OsFs) {
        let dir = tempfile::tempdir().unwrap();
        let fs = OsFs::new(AbsolutePath::new(dir.path()).unwrap());
        (dir, fs)
    }

    fn write_file(fs: &OsFs, path: &str, body: &[u8], perms: u16) {
        let mut file = fs
            .open(
                &rel(path),
                OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_WRONLY,
                Perms::from_bits(0o600),
            )
            .unwrap();
        file.write_all(body).unwrap();
        fs.chmod(&rel(path), Perms::from_bits(perms)).unwrap();
    }

    #[test]
    fn mkdir_all_creates_parents() {
        let (_dir, fs) = scratch();
        mkdir_all(&fs, &rel("a/b/c"), Perms::from_bits(0o755)).unwrap();
        assert!(fs.stat_link(&rel("a/b/c")).unwrap().entry_type.is_dir());

        // Again is fine.
        mkdir_all(&fs, &rel("a/b/c"), Perms::from_bits(0o755)).unwrap();
        mkdir_all(&fs, &RelPath::base(), Perms::from_bits(0o755)).unwrap();
    }

    #[test]
    fn mkdir_all_through_a_file() {
        let (_dir, fs) = scratch();
        write_file(&fs, "file", b"", 0o644);
        assert_matches!(
            mkdir_all(&fs, &rel("file/sub"), Perms::from_bits(0o755)),
            Err(FsError::NotADirectory(path)) if path == rel("file")
        );
    }

    #[test]
    fn mkdir_all_below_a_file_names_the_file() {
        let (_dir, fs) = scratch();
        fs.mkdir(&rel("a"), Perms::from_bits(0o755)).unwrap();
        write_file(&fs, "a/file", b"", 0o644);
        assert_matches!(
            mkdir_all(&fs, &rel("a/file/b/c"), Perms::from_bits(0o755)),
            Err(FsError::NotADirectory(path)) if path == rel("a/file")
        );
    }

    #[test]
    fn make_removable_opens_up_read_only_dirs() {
        let (_dir, fs) = scratch();
        fs.mkdir(&rel("tree"), Perms::from_bits(0o755)).unwrap();
        fs.mkdir(&rel("tree/ro"), Perms::from_bits(0o755)).unwrap();
        fs.mkdir(&rel("tree/ro/locked"), Perms::from_bits(0o755)).unwrap();
        write_file(&fs, "tree/ro/locked/data", b"x", 0o444);
        fs.chmod(&rel("tree/ro/locked"), Perms::from_bits(0o000)).unwrap();
        fs.chmod(&rel("tree/ro"), Perms::from_bits(0o555)).unwrap();

        make_removable(&fs, &rel("tree")).unwrap();

        assert_eq!(
            fs.stat_link(&rel("tree/ro")).unwrap().perms,
            Perms::from_bits(0o755)
        );
        assert_eq!(
            fs.stat_link(&rel("tree/ro/locked")).unwrap().perms,
            Perms::from_bits(0o700)
        );
        // Files keep their permissions.
        assert_eq!(
            fs.stat_link(&rel("tree/ro/locked/data")).unwrap().perms,
            Perms::from_bits(0o444)
        );
    }

    #[test]
    fn copy_tree_reproduces_metadata() {
        let (_src_dir, src) = scratch();
        let (_dst_dir, dst) = scratch();
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000_000);

        src.mkdir(&rel("tree"), Perms::from_bits(0o755)).unwrap();
        src.mkdir(&rel("tree/sub"), Perms::from_bits(0o700)).unwrap();
        src.chmod(&rel("tree/sub"), Perms::from_bits(0o750)).unwrap();
        write_file(&src, "tree/sub/data", b"alpha", 0o640);
        write_file(&src, "tree/run", b"#!/bin/sh\n", 0o755);
        src.mksymlink(&rel("tree/link"), Path::new("sub/data")).unwrap();
        src.mkfifo(&rel("tree/pipe"), Perms::from_bits(0o600)).unwrap();
        src.chmod(&rel("tree/pipe"), Perms::from_bits(0o644)).unwrap();
        for path in ["tree/sub/data", "tree/sub", "tree"] {
            src.set_mtime(&rel(path), mtime).unwrap();
        }

        copy_tree(&src, &rel("tree"), &dst, &rel("copy")).unwrap();

        assert_eq!(
            dst.read_dir_names(&rel("copy")).unwrap(),
            vec!["link", "pipe", "run", "sub"]
        );

        let sub = dst.stat_link(&rel("copy/sub")).unwrap();
        assert_eq!(sub.perms, Perms::from_bits(0o750));
        assert_eq!(sub.mtime, mtime);
        assert_eq!(dst.stat_link(&rel("copy")).unwrap().mtime, mtime);

        let data = dst.stat_link(&rel("copy/sub/data")).unwrap();
        assert_eq!(data.perms, Perms::from_bits(0o640));
        assert_eq!(data.mtime, mtime);
        let mut body = String::new();
        dst.open(&rel("copy/sub/data"), OFlag::O_RDONLY, Perms::from_bits(0))
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        assert_eq!(body, "alpha");

        assert_eq!(
            dst.stat_link(&rel("copy/run")).unwrap().perms,
            Perms::from_bits(0o755)
        );
        assert_eq!(
            dst.stat_link(&rel("copy/link")).unwrap().link_target,
            Some(PathBuf::from("sub/data"))
        );
        let pipe = dst.stat_link(&rel("copy/pipe")).unwrap();
        assert_eq!(pipe.entry_type, EntryType::NamedPipe);
        assert_eq!(pipe.perms, Perms::from_bits(0o644));
    }

    #[test]
    fn copy_tree_refuses_existing_destination() {
        let (_src_dir, src) = scratch();
        let (_dst_dir, dst) = scratch();
        write_file(&src, "file", b"x", 0o644);
        write_file(&dst, "file", b"y", 0o644);
        assert_matches!(
            copy_tree(&src, &rel("file"), &dst, &rel("file")),
            Err(FsError::AlreadyExists(_))
        );
    }
}
