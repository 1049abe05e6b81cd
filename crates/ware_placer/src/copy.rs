use ware_fs::{fs_op, AbsolutePath, FsDriver, FsError, OsFs, Perms};

use crate::{prepare::source_type, Placer, PlacerError, Teardown};

/// Makes content appear at the destination by copying it.
///
/// The copy never aliases the source, so the destination is always writable
/// without any risk to the source. The `writable` argument is accepted for
/// compatibility with the other placers and ignored.
///
/// The destination must not exist, or be an empty directory. Tearing down
/// removes the copy.
#[derive(Debug, Clone)]
pub struct CopyPlacer {
    fs: OsFs,
}

impl Default for CopyPlacer {
    fn default() -> Self {
        Self { fs: OsFs::root() }
    }
}

impl CopyPlacer {
    /// Constructs a new copy placer.
    pub fn new() -> Self {
        Self::default()
    }

    fn clear_destination(&self, destination: &AbsolutePath) -> Result<(), FsError> {
        let path = destination.coerce_relative();
        if let Some(parent) = path.parent() {
            fs_op::mkdir_all(&self.fs, &parent, Perms::from_bits(0o755))?;
        }
        match self.fs.stat_link(&path) {
            Err(FsError::NotFound(_)) => Ok(()),
            // An empty mount point left for us by the caller.
            Ok(meta) if meta.entry_type.is_dir() && self.fs.read_dir_names(&path)?.is_empty() => {
                self.fs.remove_all(&path)
            }
            Ok(_) => Err(FsError::AlreadyExists(path)),
            Err(e) => Err(e),
        }
    }
}

impl Placer for CopyPlacer {
    fn place(
        &self,
        source: &AbsolutePath,
        destination: &AbsolutePath,
        _writable: bool,
    ) -> Result<Teardown, PlacerError> {
        source_type(&self.fs, source)?;
        self.clear_destination(destination)
            .map_err(|e| PlacerError::PrepareDestination(destination.clone(), e))?;

        let target = destination.coerce_relative();
        if let Err(e) = fs_op::copy_tree(&self.fs, &source.coerce_relative(), &self.fs, &target) {
            if let Err(cleanup) = self.fs.remove_all(&target) {
                tracing::warn!("failed to remove partial copy at '{destination}': {cleanup}");
            }
            return Err(PlacerError::Copy(source.clone(), destination.clone(), e));
        }
        tracing::debug!("copied '{source}' to '{destination}'");

        let fs = self.fs.clone();
        let copy = destination.clone();
        Ok(Teardown::new(destination.clone(), move || {
            fs.remove_all(&target)
                .map_err(|e| PlacerError::RemoveCopy(copy, e))
        }))
    }
}
