use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::task::JoinError;
use ware_fs::{AbsolutePath, EntryType, FsDriver, FsError, Metadata, OFlag, OsFs, Perms, RelPath};
use ware_types::{
    CancellationToken, ErrorCategory, FilesetFilters, PackRequest, PackTool, WareError, WareId,
};

/// Returns the metadata of `path` and everything below it, parents before
/// children and siblings sorted by name.
pub fn walk<D: FsDriver + ?Sized>(driver: &D, path: &RelPath) -> Result<Vec<Metadata>, FsError> {
    let mut entries = Vec::new();
    walk_into(driver, path, &mut entries)?;
    Ok(entries)
}

fn walk_into<D: FsDriver + ?Sized>(
    driver: &D,
    path: &RelPath,
    entries: &mut Vec<Metadata>,
) -> Result<(), FsError> {
    let meta = driver.stat_link(path)?;
    let is_dir = meta.entry_type.is_dir();
    entries.push(meta);
    if is_dir {
        for name in driver.read_dir_names(path)? {
            walk_into(driver, &path.join(&name)?, entries)?;
        }
    }
    Ok(())
}

/// Hashes the tree at the base of `driver`.
///
/// Every entry contributes its path, type and permission bits, plus the
/// attributes `filters` keep. Ownership, the special permission bits and
/// device numbers are kept unless ignored; modification times are ignored
/// unless kept.
pub fn hash_tree<D: FsDriver + ?Sized>(
    driver: &D,
    filters: &FilesetFilters,
    cancel: &CancellationToken,
) -> Result<String, WareError> {
    let mut hasher = Sha256::new();
    for meta in walk(driver, &RelPath::base())? {
        if cancel.is_cancelled() {
            return Err(WareError::new(ErrorCategory::Cancelled, "pack cancelled"));
        }

        hasher.update(meta.name.to_string().as_bytes());
        hasher.update([0]);
        hasher.update(meta.entry_type.to_string().as_bytes());

        let mut perms = meta.perms;
        if !filters.setid.keeps(true) {
            perms = Perms::from_bits(perms.bits() & !(Perms::SETUID | Perms::SETGID).bits());
        }
        if !filters.sticky.keeps(true) {
            perms = Perms::from_bits(perms.bits() & !Perms::STICKY.bits());
        }
        if !meta.entry_type.is_symlink() {
            hasher.update(perms.bits().to_be_bytes());
        }
        if filters.uid.keeps(true) {
            hasher.update(meta.uid.to_be_bytes());
        }
        if filters.gid.keeps(true) {
            hasher.update(meta.gid.to_be_bytes());
        }
        if filters.mtime.keeps(false) {
            let since_epoch = meta.mtime.duration_since(UNIX_EPOCH).unwrap_or_default();
            hasher.update(since_epoch.as_secs().to_be_bytes());
            hasher.update(since_epoch.subsec_nanos().to_be_bytes());
        }

        match meta.entry_type {
            EntryType::File => {
                hasher.update(meta.size.to_be_bytes());
                let mut file = driver.open(&meta.name, OFlag::O_RDONLY, Perms::from_bits(0))?;
                std::io::copy(&mut file, &mut hasher)
                    .map_err(|e| WareError::from(FsError::Io(meta.name.clone(), e)))?;
            }
            EntryType::Symlink => {
                if let Some(target) = &meta.link_target {
                    hasher.update(target.as_os_str().as_encoded_bytes());
                }
            }
            EntryType::Device | EntryType::CharDevice if filters.dev.keeps(true) => {
                hasher.update(meta.dev_major.to_be_bytes());
                hasher.update(meta.dev_minor.to_be_bytes());
            }
            _ => {}
        }
        hasher.update([0xff]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// A [`PackTool`] that only computes the ware id of a tree without producing
/// an artifact. The id is the sha256 of [`hash_tree`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeHashPacker;

#[async_trait]
impl PackTool for TreeHashPacker {
    async fn pack(
        &self,
        cancel: CancellationToken,
        request: PackRequest,
    ) -> Result<WareId, WareError> {
        let root = AbsolutePath::new(&request.path).map_err(|e| {
            WareError::new(ErrorCategory::AssemblyInvalid, "cannot pack a relative path").with_source(e)
        })?;
        let monitor = request.monitor.clone();
        let index = monitor.as_ref().map(|monitor| monitor.on_start(None));

        let filters = request.filters;
        let hash = match tokio::task::spawn_blocking(move || {
            hash_tree(&OsFs::new(root), &filters, &cancel)
        })
        .await
        .map_err(JoinError::try_into_panic)
        {
            Ok(result) => result?,
            Err(Err(_err)) => {
                return Err(WareError::new(ErrorCategory::Cancelled, "pack cancelled"))
            }
            Err(Ok(payload)) => std::panic::resume_unwind(payload),
        };

        if let (Some(monitor), Some(index)) = (monitor, index) {
            monitor.on_complete(index);
        }
        WareId::new(request.ware_type, hash).map_err(|e| {
            WareError::new(ErrorCategory::AssemblyInvalid, "invalid ware type").with_source(e)
        })
    }
}
