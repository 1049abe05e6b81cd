use ware_fs::{fs_op, AbsolutePath, EntryType, FsDriver, FsError, OFlag, OsFs, Perms};

use crate::PlacerError;

/// Stats `source` and makes sure it is something a placer can handle.
pub(crate) fn source_type(fs: &OsFs, source: &AbsolutePath) -> Result<EntryType, PlacerError> {
    let meta = fs
        .stat_link(&source.coerce_relative())
        .map_err(|e| PlacerError::StatSource(source.clone(), e))?;
    match meta.entry_type {
        EntryType::File | EntryType::Dir => Ok(meta.entry_type),
        other => Err(PlacerError::UnsupportedSource(source.clone(), other)),
    }
}

/// Makes `destination` exist as an empty entry of `entry_type`, creating
/// missing parents. An existing entry of the right type is kept.
pub(crate) fn make_destination(
    fs: &OsFs,
    destination: &AbsolutePath,
    entry_type: EntryType,
) -> Result<(), PlacerError> {
    let path = destination.coerce_relative();
    let result = match entry_type {
        EntryType::Dir => fs_op::mkdir_all(fs, &path, Perms::from_bits(0o755)),
        _ => create_file(fs, destination),
    };
    result.map_err(|e| PlacerError::PrepareDestination(destination.clone(), e))
}

fn create_file(fs: &OsFs, destination: &AbsolutePath) -> Result<(), FsError> {
    let path = destination.coerce_relative();
    if let Some(parent) = path.parent() {
        fs_op::mkdir_all(fs, &parent, Perms::from_bits(0o755))?;
    }
    match fs.stat_link(&path) {
        Ok(meta) if meta.entry_type.is_file() => Ok(()),
        Ok(_) => Err(FsError::AlreadyExists(path)),
        Err(FsError::NotFound(_)) => fs
            .open(&path, OFlag::O_CREAT | OFlag::O_WRONLY, Perms::from_bits(0o644))
            .map(drop),
        Err(e) => Err(e),
    }
}
