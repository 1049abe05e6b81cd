//! Small filesystem trees with known attributes.
//!
//! The `alpha` family consists of one base tree and a set of variations that
//! each differ from it in exactly one attribute. A pack tool has to produce a
//! different ware id for every variation.

use std::{
    io::Write,
    path::Path,
    time::{Duration, SystemTime},
};

use ware_fs::{EntryType, FsDriver, FsError, OFlag, Perms, RelPath};

/// One entry of a fixture tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureFile {
    /// Where the entry goes, relative to the fixture root.
    pub path: RelPath,
    /// The entry type. Only files, dirs and symlinks are supported.
    pub entry_type: EntryType,
    /// The permission bits. Ignored for symlinks.
    pub perms: Perms,
    /// The owning user and group. `None` leaves the entry owned by whoever
    /// places it.
    pub owner: Option<(u32, u32)>,
    /// The modification time.
    pub mtime: SystemTime,
    /// The file content, or the target of a symlink.
    pub body: Vec<u8>,
}

/// The modification time of every fixture entry unless stated otherwise.
pub fn fixture_mtime() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_441_065_600)
}

fn rel(path: &str) -> RelPath {
    RelPath::new(path).expect("fixture paths are relative")
}

impl FixtureFile {
    /// A directory.
    pub fn dir(path: &str, perms: u16) -> Self {
        Self {
            path: rel(path),
            entry_type: EntryType::Dir,
            perms: Perms::from_bits(perms),
            owner: None,
            mtime: fixture_mtime(),
            body: Vec::new(),
        }
    }

    /// A plain file.
    pub fn file(path: &str, perms: u16, body: &[u8]) -> Self {
        Self {
            entry_type: EntryType::File,
            body: body.to_vec(),
            ..Self::dir(path, perms)
        }
    }

    /// A symlink pointing at `target`.
    pub fn symlink(path: &str, target: &str) -> Self {
        Self {
            entry_type: EntryType::Symlink,
            body: target.as_bytes().to_vec(),
            ..Self::dir(path, 0o777)
        }
    }

    /// Replaces the modification time.
    pub fn with_mtime(mut self, mtime: SystemTime) -> Self {
        self.mtime = mtime;
        self
    }

    /// Sets the owner.
    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.owner = Some((uid, gid));
        self
    }
}

/// A named fixture tree.
#[derive(Debug, Clone)]
pub struct Fixture {
    /// A human readable name, used in assertion messages.
    pub name: &'static str,
    /// The entries, parents before children.
    pub files: Vec<FixtureFile>,
}

/// The base tree of the alpha family.
pub fn alpha() -> Vec<FixtureFile> {
    vec![
        FixtureFile::dir(".", 0o755),
        FixtureFile::file("a", 0o644, b"abcd"),
        FixtureFile::dir("b", 0o750),
        FixtureFile::file("b/c", 0o664, b"zyxw"),
        FixtureFile::symlink("d", "b/c"),
    ]
}

fn alpha_with(path: &str, change: impl FnOnce(&mut FixtureFile)) -> Vec<FixtureFile> {
    let mut files = alpha();
    let target = rel(path);
    if let Some(file) = files.iter_mut().find(|file| file.path == target) {
        change(file);
    }
    files
}

/// Alpha with different content in one file, same length.
pub fn alpha_diff_content() -> Vec<FixtureFile> {
    alpha_with("b/c", |file| file.body = b"zyxv".to_vec())
}

/// Alpha with a different modification time on one file.
pub fn alpha_diff_time() -> Vec<FixtureFile> {
    alpha_with("a", |file| file.mtime = fixture_mtime() + Duration::from_secs(1))
}

/// Alpha with different permissions on one file.
pub fn alpha_diff_perm() -> Vec<FixtureFile> {
    alpha_with("a", |file| file.perms = Perms::from_bits(0o640))
}

/// Alpha with different permissions on one directory.
pub fn alpha_diff_perm2() -> Vec<FixtureFile> {
    alpha_with("b", |file| file.perms = Perms::from_bits(0o755))
}

/// Alpha with the sticky bit set on one directory.
pub fn alpha_diff_perm3() -> Vec<FixtureFile> {
    alpha_with("b", |file| file.perms = file.perms | Perms::STICKY)
}

/// Alpha with a different owner on one file. Placing this needs root.
pub fn alpha_diff_uid_gid() -> Vec<FixtureFile> {
    alpha_with("a", |file| file.owner = Some((4000, 4000)))
}

/// Alpha and every variation of it.
pub fn all_fixtures() -> Vec<Fixture> {
    vec![
        Fixture {
            name: "Alpha",
            files: alpha(),
        },
        Fixture {
            name: "AlphaDiffContent",
            files: alpha_diff_content(),
        },
        Fixture {
            name: "AlphaDiffTime",
            files: alpha_diff_time(),
        },
        Fixture {
            name: "AlphaDiffPerm",
            files: alpha_diff_perm(),
        },
        Fixture {
            name: "AlphaDiffPerm2",
            files: alpha_diff_perm2(),
        },
        Fixture {
            name: "AlphaDiffPerm3",
            files: alpha_diff_perm3(),
        },
    ]
}

/// Creates the entries of `files` on `driver`.
///
/// Attributes are applied children first once every entry exists, so the
/// modification times of directories are not disturbed by their content.
pub fn place_fixture<D: FsDriver + ?Sized>(
    driver: &D,
    files: &[FixtureFile],
) -> Result<(), FsError> {
    for file in files {
        match file.entry_type {
            EntryType::Dir if file.path.is_base() => {}
            EntryType::Dir => driver.mkdir(&file.path, Perms::from_bits(0o700))?,
            EntryType::Symlink => {
                let target = String::from_utf8_lossy(&file.body);
                driver.mksymlink(&file.path, Path::new(target.as_ref()))?;
            }
            _ => {
                let mut handle = driver.open(
                    &file.path,
                    OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_WRONLY,
                    Perms::from_bits(0o600),
                )?;
                handle
                    .write_all(&file.body)
                    .map_err(|e| FsError::Io(file.path.clone(), e))?;
            }
        }
    }

    for file in files.iter().rev() {
        if let Some((uid, gid)) = file.owner {
            driver.chown(&file.path, uid, gid)?;
        }
        if !file.entry_type.is_symlink() {
            driver.chmod(&file.path, file.perms)?;
        }
        driver.set_mtime(&file.path, file.mtime)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use ware_fs::{AbsolutePath, OsFs};

    use super::*;

    #[test]
    fn variations_differ_from_alpha() {
        let alpha = alpha();
        for fixture in all_fixtures().into_iter().skip(1) {
            assert_ne!(fixture.files, alpha, "{}", fixture.name);
        }
        assert_ne!(alpha_diff_uid_gid(), alpha);
    }

    #[test]
    fn placing_reproduces_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let fs = OsFs::new(AbsolutePath::new(dir.path()).unwrap());
        place_fixture(&fs, &alpha_diff_perm3()).unwrap();

        let root = fs.stat_link(&RelPath::base()).unwrap();
        assert_eq!(root.perms, Perms::from_bits(0o755));
        assert_eq!(root.mtime, fixture_mtime());

        let b = fs.stat_link(&rel("b")).unwrap();
        assert_eq!(b.entry_type, EntryType::Dir);
        assert_eq!(b.perms, Perms::from_bits(0o750) | Perms::STICKY);
        assert_eq!(b.mtime, fixture_mtime());

        let c = fs.stat_link(&rel("b/c")).unwrap();
        assert_eq!(c.perms, Perms::from_bits(0o664));
        assert_eq!(c.size, 4);

        let d = fs.stat_link(&rel("d")).unwrap();
        assert_eq!(d.link_target, Some(PathBuf::from("b/c")));
        assert_eq!(d.mtime, fixture_mtime());
    }
}
