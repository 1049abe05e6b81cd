#![deny(missing_docs)]

//! A small filesystem abstraction rooted at one base path.
//!
//! Everything that packs, unpacks, caches or places wares talks to the disk
//! through an [`FsDriver`]. The driver normalizes the host's view of entries
//! into one model:
//!
//! - [`EntryType`]: a closed set of POSIX entry types.
//! - [`Perms`]: the nine permission bits plus setuid, setgid and sticky.
//! - [`Metadata`]: what [`FsDriver::stat_link`] reports about one entry.
//! - [`devnum`]: the fixed packing of device major/minor numbers.
//!
//! Paths handed to a driver are always [`RelPath`]s; the driver joins them
//! onto its [`AbsolutePath`] base.
//!
//! ```no_run
//! use ware_fs::{AbsolutePath, FsDriver, OsFs, Perms, RelPath};
//!
//! let fs = OsFs::new(AbsolutePath::new("/tmp").unwrap());
//! fs.mkdir(&RelPath::new("scratch").unwrap(), Perms::from_bits(0o755)).unwrap();
//! let meta = fs.stat_link(&RelPath::new("scratch").unwrap()).unwrap();
//! assert!(meta.entry_type.is_dir());
//! ```

pub mod devnum;
mod driver;
mod error;
pub mod fs_op;
mod metadata;
mod osfs;
mod path;

pub use driver::{DeviceKind, FsDriver};
pub use error::FsError;
pub use metadata::{EntryType, Metadata, Perms};
pub use nix::fcntl::OFlag;
pub use osfs::OsFs;
pub use path::{AbsolutePath, PathError, RelPath};
