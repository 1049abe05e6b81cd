use std::{
    fmt::{Debug, Display, Formatter},
    future::Future,
    path::PathBuf,
    sync::Arc,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{FilesetFilters, PlacementMode, WareError, WareId};

/// The address of a warehouse: a remote or local location ware content can be
/// fetched from or published to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WarehouseAddr(String);

impl WarehouseAddr {
    /// Returns the address as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WarehouseAddr {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for WarehouseAddr {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Display for WarehouseAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A sink for progress reports of a pack or unpack.
///
/// The cache forwards a monitor to the tool it wraps without calling it.
pub trait Monitor: Send + Sync {
    /// Called when work on a ware starts. Returns an index that identifies
    /// this unit of work in later calls.
    fn on_start(&self, ware_id: Option<&WareId>) -> usize;

    /// Called with regular updates on the progress.
    fn on_progress(&self, index: usize, done: u64, total: Option<u64>);

    /// Called when the work identified by `index` completes.
    fn on_complete(&self, index: usize);
}

/// All arguments of a single unpack.
#[derive(Clone)]
pub struct UnpackRequest {
    /// The ware to unpack.
    pub ware_id: WareId,
    /// Where the content should appear.
    pub path: PathBuf,
    /// Filters applied while unpacking.
    pub filters: FilesetFilters,
    /// How the content should be placed at `path`.
    pub placement: PlacementMode,
    /// Warehouses the content may be fetched from, in order of preference.
    pub warehouses: Vec<WarehouseAddr>,
    /// An optional progress sink.
    pub monitor: Option<Arc<dyn Monitor>>,
}

impl UnpackRequest {
    /// Constructs a request with default filters, [`PlacementMode::Direct`]
    /// and no warehouses or monitor.
    pub fn new(ware_id: WareId, path: impl Into<PathBuf>) -> Self {
        Self {
            ware_id,
            path: path.into(),
            filters: FilesetFilters::default(),
            placement: PlacementMode::Direct,
            warehouses: Vec::new(),
            monitor: None,
        }
    }

    /// Sets the placement mode.
    pub fn with_placement(mut self, placement: PlacementMode) -> Self {
        self.placement = placement;
        self
    }

    /// Sets the filters.
    pub fn with_filters(mut self, filters: FilesetFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Adds a warehouse to fetch from.
    pub fn with_warehouse(mut self, warehouse: impl Into<WarehouseAddr>) -> Self {
        self.warehouses.push(warehouse.into());
        self
    }

    /// Sets the progress sink.
    pub fn with_monitor(mut self, monitor: Arc<dyn Monitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }
}

impl Debug for UnpackRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnpackRequest")
            .field("ware_id", &self.ware_id)
            .field("path", &self.path)
            .field("filters", &self.filters)
            .field("placement", &self.placement)
            .field("warehouses", &self.warehouses)
            .field("monitor", &self.monitor.is_some())
            .finish()
    }
}

/// All arguments of a single pack.
#[derive(Clone)]
pub struct PackRequest {
    /// The type of ware to produce, e.g. `tar`.
    pub ware_type: String,
    /// The root of the tree to pack.
    pub path: PathBuf,
    /// Filters applied while packing.
    pub filters: FilesetFilters,
    /// Where to upload the packed ware, if anywhere.
    pub warehouse: Option<WarehouseAddr>,
    /// An optional progress sink.
    pub monitor: Option<Arc<dyn Monitor>>,
}

impl PackRequest {
    /// Constructs a request with default filters and no warehouse or monitor.
    pub fn new(ware_type: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            ware_type: ware_type.into(),
            path: path.into(),
            filters: FilesetFilters::default(),
            warehouse: None,
            monitor: None,
        }
    }

    /// Sets the filters.
    pub fn with_filters(mut self, filters: FilesetFilters) -> Self {
        self.filters = filters;
        self
    }
}

impl Debug for PackRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackRequest")
            .field("ware_type", &self.ware_type)
            .field("path", &self.path)
            .field("filters", &self.filters)
            .field("warehouse", &self.warehouse)
            .field("monitor", &self.monitor.is_some())
            .finish()
    }
}

/// Materializes a ware on disk.
///
/// Implementations must observe `cancel` and return promptly once it fires.
#[async_trait]
pub trait UnpackTool: Send + Sync {
    /// Unpacks `request.ware_id` to `request.path` and returns the id of the
    /// content that was actually unpacked.
    async fn unpack(
        &self,
        cancel: CancellationToken,
        request: UnpackRequest,
    ) -> Result<WareId, WareError>;
}

#[async_trait]
impl<F, Fut> UnpackTool for F
where
    F: Fn(CancellationToken, UnpackRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<WareId, WareError>> + Send,
{
    async fn unpack(
        &self,
        cancel: CancellationToken,
        request: UnpackRequest,
    ) -> Result<WareId, WareError> {
        (self)(cancel, request).await
    }
}

/// Packs a filesystem tree into a ware and computes its id.
#[async_trait]
pub trait PackTool: Send + Sync {
    /// Packs the tree at `request.path`.
    async fn pack(
        &self,
        cancel: CancellationToken,
        request: PackRequest,
    ) -> Result<WareId, WareError>;
}

#[async_trait]
impl<F, Fut> PackTool for F
where
    F: Fn(CancellationToken, PackRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<WareId, WareError>> + Send,
{
    async fn pack(
        &self,
        cancel: CancellationToken,
        request: PackRequest,
    ) -> Result<WareId, WareError> {
        (self)(cancel, request).await
    }
}
