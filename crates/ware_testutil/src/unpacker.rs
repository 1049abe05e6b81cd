use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use ware_fs::{AbsolutePath, OsFs};
use ware_types::{
    CancellationToken, ErrorCategory, UnpackRequest, UnpackTool, WareError, WareId,
};

use crate::{fixtures::FixtureFile, hash_tree, place_fixture};

/// An [`UnpackTool`] that "unpacks" by placing a fixture tree and reports the
/// id [`hash_tree`] computes for what it placed.
///
/// It counts its invocations and remembers the last request, so tests can
/// observe what a wrapping tool forwarded.
#[derive(Debug)]
pub struct FixtureUnpacker {
    files: Vec<FixtureFile>,
    ware_type: String,
    delay: Duration,
    calls: AtomicUsize,
    last_request: Mutex<Option<UnpackRequest>>,
}

impl FixtureUnpacker {
    /// Constructs a tool that always places `files`.
    pub fn new(files: Vec<FixtureFile>) -> Self {
        Self {
            files,
            ware_type: "tar".to_string(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Waits for `delay` before placing anything. The wait observes
    /// cancellation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// The number of times [`UnpackTool::unpack`] was called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<UnpackRequest> {
        self.last_request.lock().clone()
    }

    /// The id this tool reports after placing its fixture with `request`'s
    /// filters, computed without touching any cache.
    pub async fn expected_id(&self, request: &UnpackRequest) -> WareId {
        let files = self.files.clone();
        let filters = request.filters;
        let ware_type = self.ware_type.clone();
        crate::with_tmpdir(|dir| async move {
            let fs = OsFs::new(dir);
            place_fixture(&fs, &files).expect("fixture can be placed");
            let hash = hash_tree(&fs, &filters, &CancellationToken::new())
                .expect("fixture can be hashed");
            WareId::new(ware_type, hash).expect("hashes are valid ids")
        })
        .await
    }
}

#[async_trait]
impl UnpackTool for FixtureUnpacker {
    async fn unpack(
        &self,
        cancel: CancellationToken,
        request: UnpackRequest,
    ) -> Result<WareId, WareError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock() = Some(request.clone());

        if !self.delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(self.delay) => {}
                _ = cancel.cancelled() => {
                    return Err(WareError::new(ErrorCategory::Cancelled, "unpack cancelled"));
                }
            }
        }

        let root = AbsolutePath::new(&request.path).map_err(|e| {
            WareError::new(ErrorCategory::AssemblyInvalid, "cannot unpack to a relative path")
                .with_source(e)
        })?;
        let fs = OsFs::new(root);
        place_fixture(&fs, &self.files)?;
        let hash = hash_tree(&fs, &request.filters, &cancel)?;
        WareId::new(self.ware_type.clone(), hash).map_err(|e| {
            WareError::new(ErrorCategory::AssemblyInvalid, "invalid ware type").with_source(e)
        })
    }
}
