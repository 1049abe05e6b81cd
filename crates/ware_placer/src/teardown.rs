use std::fmt::{Debug, Formatter};

use ware_fs::AbsolutePath;

use crate::PlacerError;

type Undo = Box<dyn FnOnce() -> Result<(), PlacerError> + Send>;

/// Undoes a placement.
///
/// Every successful [`crate::Placer::place`] returns one of these. The owner
/// must either [`Teardown::run`] it or explicitly give it up with
/// [`Teardown::leave_standing`]. Dropping it without doing either leaks the
/// placement, which is logged as an error.
#[must_use = "a placement must be torn down or explicitly left standing"]
pub struct Teardown {
    destination: AbsolutePath,
    undo: Option<Undo>,
}

impl Teardown {
    /// Constructs a handle that runs `undo` to remove the placement at
    /// `destination`.
    pub fn new(
        destination: AbsolutePath,
        undo: impl FnOnce() -> Result<(), PlacerError> + Send + 'static,
    ) -> Self {
        Self {
            destination,
            undo: Some(Box::new(undo)),
        }
    }

    /// The destination of the placement.
    pub fn destination(&self) -> &AbsolutePath {
        &self.destination
    }

    /// Removes the placement.
    pub fn run(mut self) -> Result<(), PlacerError> {
        match self.undo.take() {
            Some(undo) => {
                tracing::debug!("tearing down placement at '{}'", self.destination);
                undo()
            }
            None => Ok(()),
        }
    }

    /// Releases the handle without removing the placement. The placement
    /// outlives this handle and possibly the process.
    pub fn leave_standing(mut self) {
        if self.undo.take().is_some() {
            tracing::debug!("leaving placement at '{}' standing", self.destination);
        }
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        if self.undo.is_some() {
            tracing::error!(
                "placement at '{}' was dropped without being torn down, it is leaked",
                self.destination
            );
        }
    }
}

impl Debug for Teardown {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Teardown")
            .field("destination", &self.destination)
            .field("pending", &self.undo.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use tracing_test::traced_test;

    use super::*;

    fn counting() -> (Arc<AtomicUsize>, Teardown) {
        let count = Arc::new(AtomicUsize::new(0));
        let teardown = Teardown::new(AbsolutePath::new("/mnt/dest").unwrap(), {
            let count = count.clone();
            move || {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        (count, teardown)
    }

    #[test]
    fn run_invokes_undo_once() {
        let (count, teardown) = counting();
        assert_eq!(teardown.destination().as_path().to_str(), Some("/mnt/dest"));
        teardown.run().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[traced_test]
    #[test]
    fn leave_standing_skips_undo() {
        let (count, teardown) = counting();
        teardown.leave_standing();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!logs_contain("leaked"));
    }

    #[traced_test]
    #[test]
    fn dropping_reports_a_leak() {
        let (count, teardown) = counting();
        drop(teardown);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(logs_contain("was dropped without being torn down"));
    }
}
