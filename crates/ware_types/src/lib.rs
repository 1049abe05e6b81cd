#![deny(missing_docs)]

//! Types shared by every crate that packs, unpacks, caches or places wares.
//!
//! A *ware* is a content-addressed packaging of a filesystem tree. It is
//! identified by a [`WareId`], produced by a [`PackTool`] and materialized on
//! disk again by an [`UnpackTool`]. The tools themselves live elsewhere; this
//! crate only fixes the vocabulary they speak:
//!
//! - [`WareId`]: the immutable content identifier (type tag + hash).
//! - [`FilesetFilters`]: which attributes a pack or unpack honors.
//! - [`PlacementMode`]: how unpacked content is made to appear at a path.
//! - [`Monitor`]: an opaque progress sink that is forwarded, never interpreted.
//! - [`WareError`] and [`ErrorCategory`]: the categorized error that crosses a
//!   tool boundary.

mod error;
mod filters;
mod placement;
mod tool;
mod ware_id;

pub use error::{Categorized, ErrorCategory, WareError};
pub use filters::{FilesetFilters, FilterPolicy};
pub use placement::{ParsePlacementModeError, PlacementMode};
pub use tool::{Monitor, PackRequest, PackTool, UnpackRequest, UnpackTool, WarehouseAddr};
pub use ware_id::{ParseWareIdError, WareId, MIN_HASH_LEN};

pub use tokio_util::sync::CancellationToken;
