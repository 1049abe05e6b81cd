#![deny(missing_docs)]

//! Placers make the content of a file or directory observable at another
//! path.
//!
//! Every placer implements [`Placer`] and hands back a [`Teardown`] that
//! removes the placement again. Whoever receives a [`Teardown`] owns the
//! placement and has to run it on every exit path.
//!
//! - [`BindPlacer`] (Linux only) uses a recursive bind mount, optionally
//!   remounted read-only. A writable bind makes the source mutable.
//! - [`CopyPlacer`] copies the content, the result is always writable and
//!   independent of the source.
//! - [`AnyPlacer`] selects one of the above by [`ware_types::PlacementMode`].

mod any;
#[cfg(target_os = "linux")]
mod bind;
mod copy;
mod error;
mod prepare;
mod teardown;

pub use any::AnyPlacer;
#[cfg(target_os = "linux")]
pub use bind::BindPlacer;
pub use copy::CopyPlacer;
pub use error::PlacerError;
pub use teardown::Teardown;
use ware_fs::AbsolutePath;

/// A strategy that makes `source` observable at `destination`.
pub trait Placer: Send + Sync {
    /// Places `source` at `destination`, creating the destination if needed.
    ///
    /// Only plain files and directories can be placed. `writable` controls
    /// whether writes through `destination` are allowed; what such writes do
    /// to `source` depends on the strategy.
    fn place(
        &self,
        source: &AbsolutePath,
        destination: &AbsolutePath,
        writable: bool,
    ) -> Result<Teardown, PlacerError>;
}
