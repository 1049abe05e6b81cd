use std::{
    fmt::{Debug, Formatter},
    io::ErrorKind,
    sync::Arc,
};

use async_trait::async_trait;
use dashmap::DashMap;
use tempfile::TempDir;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use ware_fs::{fs_op, AbsolutePath, FsDriver, FsError, OsFs, Perms};
use ware_placer::{AnyPlacer, Placer, PlacerError, Teardown};
use ware_types::{PlacementMode, UnpackRequest, UnpackTool, WareError, WareId};

use crate::{
    ensure_cache_dir,
    shelf::{namespace_for, shelf_for, STAGING_DIR},
    CacheConfig, CacheError,
};

/// A content-addressed cache of unpacked wares.
///
/// The cache wraps an [`UnpackTool`]. The first request for a ware unpacks it
/// into a private staging directory which is then renamed onto the ware's
/// shelf in one step. Every later request for the same ware is served from
/// the shelf without invoking the tool again. Concurrent requests for the same
/// ware within this process are coalesced, so the tool runs at most once.
///
/// Shelves are never modified after they are committed. Placing content at a
/// destination therefore either mounts the shelf read-only or copies it.
#[derive(Clone)]
pub struct WareCache {
    inner: Arc<WareCacheInner>,
}

struct WareCacheInner {
    fs: OsFs,
    tool: Arc<dyn UnpackTool>,
    wares: DashMap<WareId, Arc<tokio::sync::Mutex<()>>>,
}

/// The result of [`WareCache::unpack_and_place`].
#[must_use = "a placement must be torn down or explicitly left standing"]
#[derive(Debug)]
pub struct Placement {
    ware_id: WareId,
    shelf: AbsolutePath,
    teardown: Option<Teardown>,
}

impl Placement {
    /// The ware that was placed.
    pub fn ware_id(&self) -> &WareId {
        &self.ware_id
    }

    /// The shelf holding the content. For [`PlacementMode::Direct`] this is
    /// the result itself.
    pub fn shelf(&self) -> &AbsolutePath {
        &self.shelf
    }

    /// Where the content was placed, unless the placement was direct.
    pub fn destination(&self) -> Option<&AbsolutePath> {
        self.teardown.as_ref().map(Teardown::destination)
    }

    /// Removes the placement. The shelf stays in the cache.
    pub fn tear_down(self) -> Result<(), PlacerError> {
        match self.teardown {
            Some(teardown) => teardown.run(),
            None => Ok(()),
        }
    }

    /// Keeps the placement around after this value is gone.
    pub fn leave_standing(self) {
        if let Some(teardown) = self.teardown {
            teardown.leave_standing();
        }
    }
}

impl WareCache {
    /// Constructs a cache rooted at `root` that populates itself with `tool`.
    ///
    /// The root must already exist, see [`crate::ensure_cache_dir`].
    pub fn new(root: AbsolutePath, tool: Arc<dyn UnpackTool>) -> Self {
        Self {
            inner: Arc::new(WareCacheInner {
                fs: OsFs::new(root),
                tool,
                wares: DashMap::default(),
            }),
        }
    }

    /// Constructs a cache at the location configured in `config`, creating
    /// the directory if needed.
    pub fn from_config(config: &CacheConfig, tool: Arc<dyn UnpackTool>) -> anyhow::Result<Self> {
        let dir = config.cache_dir()?;
        ensure_cache_dir(&dir)?;
        let root = AbsolutePath::new(std::path::absolute(&dir)?)?;
        Ok(Self::new(root, tool))
    }

    /// The root directory of the cache.
    pub fn root(&self) -> &AbsolutePath {
        self.inner.fs.base_path()
    }

    /// Returns true if the shelf of `ware_id` is populated. A shelf that
    /// cannot be looked at counts as absent.
    pub fn contains(&self, ware_id: &WareId) -> bool {
        self.shelf_exists(ware_id).unwrap_or(false)
    }

    fn shelf_exists(&self, ware_id: &WareId) -> Result<bool, CacheError> {
        let shelf = shelf_for(ware_id);
        self.inner
            .fs
            .exists(&shelf)
            .map_err(|e| CacheError::Shelf(shelf, e))
    }

    /// Makes sure `request.ware_id` is on its shelf and places it at
    /// `request.path` according to `request.placement`.
    ///
    /// With [`PlacementMode::Direct`] nothing is placed: the returned shelf is
    /// the result and `request.path` is left alone. Otherwise the returned
    /// [`Placement`] owns the placement and must be torn down or left
    /// standing by the caller.
    #[instrument(skip_all, fields(ware_id = %request.ware_id, placement = %request.placement))]
    pub async fn unpack_and_place(
        &self,
        cancel: CancellationToken,
        request: UnpackRequest,
    ) -> Result<Placement, CacheError> {
        let shelf = self.populate(&cancel, &request).await?;
        if cancel.is_cancelled() {
            return Err(CacheError::Cancelled);
        }
        let teardown = self.place(&request, shelf.clone()).await?;
        Ok(Placement {
            ware_id: request.ware_id,
            shelf,
            teardown,
        })
    }

    /// Makes sure the shelf for the requested ware exists and returns its
    /// location.
    async fn populate(
        &self,
        cancel: &CancellationToken,
        request: &UnpackRequest,
    ) -> Result<AbsolutePath, CacheError> {
        let ware_id = &request.ware_id;
        let shelf_path = self.root().join(&shelf_for(ware_id));

        let id = ware_id.clone();
        let hit = self
            .blocking(move |this| {
                let namespace = namespace_for(id.ware_type());
                fs_op::mkdir_all(&this.inner.fs, &namespace, Perms::from_bits(0o700))
                    .map_err(|e| CacheError::Shelf(namespace, e))?;
                this.shelf_exists(&id)
            })
            .await?;
        if hit {
            tracing::debug!("cache hit for {ware_id}");
            return Ok(shelf_path);
        }

        // Only one task populates a given ware, everyone else waits for it.
        let entry = self.inner.wares.entry(ware_id.clone()).or_default().clone();
        let _guard = tokio::select! {
            guard = entry.lock() => guard,
            _ = cancel.cancelled() => return Err(CacheError::Cancelled),
        };

        let id = ware_id.clone();
        if self.blocking(move |this| this.shelf_exists(&id)).await? {
            tracing::debug!("{ware_id} was populated while waiting");
            return Ok(shelf_path);
        }

        let id = ware_id.clone();
        let staging = self
            .blocking(move |this| this.allocate_staging(&id))
            .await?;
        let mut staged_request = request.clone();
        staged_request.path = staging.path().to_path_buf();
        staged_request.placement = PlacementMode::Direct;

        tracing::debug!("unpacking {ware_id} into '{}'", staging.path().display());
        let result = tokio::select! {
            result = self.inner.tool.unpack(cancel.clone(), staged_request) => result,
            _ = cancel.cancelled() => {
                self.discard(staging).await;
                return Err(CacheError::Cancelled);
            }
        };

        match result {
            Err(err) => {
                self.discard(staging).await;
                Err(CacheError::Tool(err))
            }
            Ok(actual) if &actual != ware_id => {
                self.discard(staging).await;
                Err(CacheError::WareIdMismatch {
                    expected: ware_id.clone(),
                    actual,
                })
            }
            Ok(_) => {
                let id = ware_id.clone();
                self.blocking(move |this| this.commit(staging, &id))
                    .await?;
                Ok(shelf_path)
            }
        }
    }

    fn allocate_staging(&self, ware_id: &WareId) -> Result<TempDir, CacheError> {
        let staging_root = self.root().as_path().join(STAGING_DIR);
        fs_err::create_dir_all(&staging_root)
            .and_then(|_| {
                tempfile::Builder::new()
                    .prefix(&format!("{}-", ware_id.hash()))
                    .tempdir_in(&staging_root)
            })
            .map_err(|e| CacheError::Staging(staging_root, e))
    }

    /// Moves the staging directory onto the shelf in a single rename.
    fn commit(&self, staging: TempDir, ware_id: &WareId) -> Result<(), CacheError> {
        let shelf = shelf_for(ware_id);
        if let Some(parent) = shelf.parent() {
            fs_op::mkdir_all(&self.inner.fs, &parent, Perms::from_bits(0o700))
                .map_err(|e| CacheError::Shelf(parent, e))?;
        }

        let shelf_path = self.inner.fs.host_path(&shelf);
        match fs_err::rename(staging.path(), &shelf_path) {
            Ok(()) => {
                let _ = staging.keep();
                tracing::debug!("committed {ware_id} to '{}'", shelf_path.display());
                Ok(())
            }
            // Someone else committed the same content first.
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::AlreadyExists | ErrorKind::DirectoryNotEmpty
                ) =>
            {
                tracing::debug!("{ware_id} was committed concurrently, discarding our copy");
                remove_staging(staging);
                Ok(())
            }
            Err(e) => {
                remove_staging(staging);
                Err(CacheError::Commit(ware_id.clone(), e))
            }
        }
    }

    /// Removes a staging directory without blocking the runtime.
    async fn discard(&self, staging: TempDir) {
        let result = self
            .blocking(move |_| {
                remove_staging(staging);
                Ok(())
            })
            .await;
        if let Err(e) = result {
            tracing::warn!("failed to discard a staging directory: {e}");
        }
    }

    /// Runs `f` on the blocking thread pool, inside the current span.
    async fn blocking<T, F>(&self, f: F) -> Result<T, CacheError>
    where
        F: FnOnce(&WareCache) -> Result<T, CacheError> + Send + 'static,
        T: Send + 'static,
    {
        let this = self.clone();
        let span = tracing::Span::current();
        run_blocking_task(move || span.in_scope(|| f(&this))).await
    }

    /// Places the shelf at the requested destination.
    async fn place(
        &self,
        request: &UnpackRequest,
        shelf: AbsolutePath,
    ) -> Result<Option<Teardown>, CacheError> {
        let Some(placer) = AnyPlacer::for_mode(request.placement)? else {
            return Ok(None);
        };
        let destination = AbsolutePath::new(&request.path)
            .map_err(|e| CacheError::Destination(request.path.clone(), e))?;

        // Shelves are immutable, only a copy may be handed out writable.
        let writable = request.placement == PlacementMode::Copy;

        run_blocking_task(move || {
            placer
                .place(&shelf, &destination, writable)
                .map_err(CacheError::from)
        })
        .await
        .map(Some)
    }
}

/// Placements made through this interface are left standing.
///
/// With [`PlacementMode::Direct`] nothing appears at `request.path`; the
/// content stays on its shelf, which this interface cannot report. Callers
/// that need the shelf location use [`WareCache::unpack_and_place`].
#[async_trait]
impl UnpackTool for WareCache {
    async fn unpack(
        &self,
        cancel: CancellationToken,
        request: UnpackRequest,
    ) -> Result<WareId, WareError> {
        if request.placement == PlacementMode::Direct {
            tracing::debug!(
                "direct unpack of {} leaves '{}' untouched, the content stays on its shelf",
                request.ware_id,
                request.path.display()
            );
        }
        let placement = self.unpack_and_place(cancel, request).await?;
        let ware_id = placement.ware_id().clone();
        placement.leave_standing();
        Ok(ware_id)
    }
}

impl Debug for WareCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WareCache")
            .field("root", self.root())
            .finish_non_exhaustive()
    }
}

/// Removes a staging directory, including read-only directories the tool
/// may have left in it. Failures are logged.
fn remove_staging(staging: TempDir) {
    let path = staging.keep();
    let removed = AbsolutePath::new(&path)
        .map_err(FsError::from)
        .and_then(|abs| OsFs::root().remove_all(&abs.coerce_relative()));
    if let Err(e) = removed {
        tracing::warn!(
            "failed to remove staging directory '{}': {e}",
            path.display()
        );
    }
}

/// Runs a blocking task to completion on the blocking thread pool. Panics in
/// the task are propagated.
async fn run_blocking_task<T, F>(f: F) -> Result<T, CacheError>
where
    F: FnOnce() -> Result<T, CacheError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f)
        .await
        .map_err(JoinError::try_into_panic)
    {
        Ok(result) => result,
        Err(Err(_err)) => Err(CacheError::Cancelled),
        Err(Ok(payload)) => std::panic::resume_unwind(payload),
    }
}
