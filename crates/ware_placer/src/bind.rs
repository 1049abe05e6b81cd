use std::{fmt::Debug, path::Path, sync::Arc};

use nix::mount::{mount, umount2, MntFlags, MsFlags};
use ware_fs::{AbsolutePath, OsFs};

use crate::{
    prepare::{make_destination, source_type},
    Placer, PlacerError, Teardown,
};

/// The mount syscalls a [`BindPlacer`] issues.
pub(crate) trait Mounter: Debug + Send + Sync {
    fn mount(&self, source: &Path, target: &Path, flags: MsFlags) -> nix::Result<()>;

    fn unmount(&self, target: &Path) -> nix::Result<()>;
}

#[derive(Debug)]
struct HostMounter;

impl Mounter for HostMounter {
    fn mount(&self, source: &Path, target: &Path, flags: MsFlags) -> nix::Result<()> {
        mount(Some(source), target, None::<&str>, flags, None::<&str>)
    }

    fn unmount(&self, target: &Path) -> nix::Result<()> {
        umount2(target, MntFlags::empty())
    }
}

/// Makes content appear at the destination with a recursive bind mount.
///
/// With `writable == true` the *source* becomes mutable through the
/// destination. If the destination must be writable while the source stays
/// untouched, use a copying placer instead.
#[derive(Debug, Clone)]
pub struct BindPlacer {
    fs: OsFs,
    mounter: Arc<dyn Mounter>,
}

impl Default for BindPlacer {
    fn default() -> Self {
        Self::with_mounter(Arc::new(HostMounter))
    }
}

impl BindPlacer {
    /// Constructs a new bind placer.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_mounter(mounter: Arc<dyn Mounter>) -> Self {
        Self {
            fs: OsFs::root(),
            mounter,
        }
    }
}

impl Placer for BindPlacer {
    fn place(
        &self,
        source: &AbsolutePath,
        destination: &AbsolutePath,
        writable: bool,
    ) -> Result<Teardown, PlacerError> {
        let entry_type = source_type(&self.fs, source)?;
        make_destination(&self.fs, destination, entry_type)?;

        // Works the same for dirs and plain files.
        let flags = MsFlags::MS_BIND | MsFlags::MS_REC;
        self.mounter
            .mount(source.as_path(), destination.as_path(), flags)
            .map_err(|e| PlacerError::Bind(source.clone(), destination.clone(), e.into()))?;

        // A bind ignores MS_RDONLY on first application, it takes a remount.
        if !writable {
            let remount = self.mounter.mount(
                source.as_path(),
                destination.as_path(),
                flags | MsFlags::MS_RDONLY | MsFlags::MS_REMOUNT,
            );
            if let Err(remount) = remount {
                return Err(match self.mounter.unmount(destination.as_path()) {
                    Ok(()) => PlacerError::Remount(destination.clone(), remount.into()),
                    Err(rollback) => {
                        tracing::warn!(
                            "failed to undo the bind mount at '{destination}': {rollback}"
                        );
                        PlacerError::RemountRollback {
                            destination: destination.clone(),
                            remount: remount.into(),
                            rollback: rollback.into(),
                        }
                    }
                });
            }
        }

        tracing::debug!(
            "bind mounted '{source}' onto '{destination}' ({})",
            if writable { "rw" } else { "ro" }
        );

        let mounter = self.mounter.clone();
        let target = destination.clone();
        Ok(Teardown::new(destination.clone(), move || {
            mounter
                .unmount(target.as_path())
                .map_err(|e| PlacerError::Unmount(target.clone(), e.into()))
        }))
    }
}
