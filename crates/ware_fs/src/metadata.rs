use std::{
    fmt::{Display, Formatter},
    path::PathBuf,
    time::SystemTime,
};

use crate::RelPath;

/// The type of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryType {
    /// A regular file.
    File,
    /// A directory.
    Dir,
    /// A symbolic link.
    Symlink,
    /// A named pipe (fifo).
    NamedPipe,
    /// A unix domain socket.
    Socket,
    /// A block device.
    Device,
    /// A character device.
    CharDevice,
}

impl EntryType {
    /// Maps the type bits of a raw host mode onto an entry type.
    ///
    /// # Panics
    ///
    /// Panics if the type bits do not denote one of the known entry types. The
    /// host reported something this model cannot represent.
    pub fn from_host_mode(mode: u32) -> Self {
        match mode & libc::S_IFMT as u32 {
            m if m == libc::S_IFREG as u32 => EntryType::File,
            m if m == libc::S_IFDIR as u32 => EntryType::Dir,
            m if m == libc::S_IFLNK as u32 => EntryType::Symlink,
            m if m == libc::S_IFIFO as u32 => EntryType::NamedPipe,
            m if m == libc::S_IFSOCK as u32 => EntryType::Socket,
            m if m == libc::S_IFBLK as u32 => EntryType::Device,
            m if m == libc::S_IFCHR as u32 => EntryType::CharDevice,
            m => panic!("unknown file mode type bits {m:#o}"),
        }
    }

    /// Returns true for [`EntryType::Dir`].
    pub fn is_dir(self) -> bool {
        self == EntryType::Dir
    }

    /// Returns true for [`EntryType::File`].
    pub fn is_file(self) -> bool {
        self == EntryType::File
    }

    /// Returns true for [`EntryType::Symlink`].
    pub fn is_symlink(self) -> bool {
        self == EntryType::Symlink
    }

    /// Returns true for block and character devices.
    pub fn is_device(self) -> bool {
        matches!(self, EntryType::Device | EntryType::CharDevice)
    }
}

impl Display for EntryType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntryType::File => "file",
            EntryType::Dir => "dir",
            EntryType::Symlink => "symlink",
            EntryType::NamedPipe => "fifo",
            EntryType::Socket => "socket",
            EntryType::Device => "device",
            EntryType::CharDevice => "chardevice",
        };
        f.write_str(name)
    }
}

/// Permission bits of an entry: the nine standard bits plus setuid, setgid
/// and sticky, twelve bits in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Perms(u16);

impl Perms {
    /// The setuid bit.
    pub const SETUID: Perms = Perms(0o4000);
    /// The setgid bit.
    pub const SETGID: Perms = Perms(0o2000);
    /// The sticky bit.
    pub const STICKY: Perms = Perms(0o1000);

    const MASK: u16 = 0o7777;

    /// Constructs permissions from octal bits, e.g. `0o755`. Bits above the
    /// twelve permission bits are dropped.
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits & Self::MASK)
    }

    /// Returns all twelve bits.
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Extracts the permissions from a raw host mode.
    pub fn from_host_mode(mode: u32) -> Self {
        Self((mode & Self::MASK as u32) as u16)
    }

    /// Converts to the host's native mode representation. On every supported
    /// host the twelve bits sit at the same positions.
    pub fn to_host_mode(self) -> u32 {
        u32::from(self.0)
    }

    /// Returns true if every bit in `other` is set.
    pub const fn contains(self, other: Perms) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns these permissions without the setuid, setgid and sticky bits.
    pub const fn without_special(self) -> Self {
        Self(self.0 & 0o777)
    }
}

impl std::ops::BitOr for Perms {
    type Output = Perms;

    fn bitor(self, rhs: Self) -> Self::Output {
        Perms(self.0 | rhs.0)
    }
}

impl Display for Perms {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

/// Everything [`crate::FsDriver::stat_link`] reports about one entry.
///
/// Extended attributes are never part of this record; listing and reading
/// them costs an unbounded number of additional calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// The path the entry was looked up at.
    pub name: RelPath,
    /// The entry type.
    pub entry_type: EntryType,
    /// The permission bits.
    pub perms: Perms,
    /// The owning user id.
    pub uid: u32,
    /// The owning group id.
    pub gid: u32,
    /// The size in bytes.
    pub size: u64,
    /// The last modification time.
    pub mtime: SystemTime,
    /// The device major number. Only meaningful for devices.
    pub dev_major: u32,
    /// The device minor number. Only meaningful for devices.
    pub dev_minor: u32,
    /// The literal target of a symlink. Only set for symlinks.
    pub link_target: Option<PathBuf>,
}
