use ware_fs::AbsolutePath;
use ware_types::PlacementMode;

#[cfg(target_os = "linux")]
use crate::BindPlacer;
use crate::{CopyPlacer, Placer, PlacerError, Teardown};

/// One of the placers, selected by [`PlacementMode`].
#[derive(Debug, Clone)]
pub enum AnyPlacer {
    /// Places with a bind mount.
    #[cfg(target_os = "linux")]
    Bind(BindPlacer),
    /// Places by copying.
    Copy(CopyPlacer),
}

impl AnyPlacer {
    /// Selects the placer implementing `mode`.
    ///
    /// Returns `Ok(None)` for [`PlacementMode::Direct`], which needs no
    /// placement at all.
    pub fn for_mode(mode: PlacementMode) -> Result<Option<Self>, PlacerError> {
        match mode {
            PlacementMode::Direct => Ok(None),
            PlacementMode::Copy => Ok(Some(AnyPlacer::Copy(CopyPlacer::new()))),
            #[cfg(target_os = "linux")]
            PlacementMode::Mount => Ok(Some(AnyPlacer::Bind(BindPlacer::new()))),
            #[cfg(not(target_os = "linux"))]
            PlacementMode::Mount => Err(PlacerError::UnsupportedMode(mode)),
        }
    }
}

impl Placer for AnyPlacer {
    fn place(
        &self,
        source: &AbsolutePath,
        destination: &AbsolutePath,
        writable: bool,
    ) -> Result<Teardown, PlacerError> {
        match self {
            #[cfg(target_os = "linux")]
            AnyPlacer::Bind(placer) => placer.place(source, destination, writable),
            AnyPlacer::Copy(placer) => placer.place(source, destination, writable),
        }
    }
}
