//! Test support for crates that pack, unpack or cache wares.
//!
//! Panics instead of returning errors wherever a failure means the test
//! environment is broken.

use std::future::Future;

use ware_fs::AbsolutePath;

mod conformance;
pub mod fixtures;
mod tree_hash;
mod unpacker;

pub use conformance::{check_pack_hash_varies_on_variations, check_pack_produces_consistent_hash};
pub use fixtures::{place_fixture, FixtureFile};
pub use tree_hash::{hash_tree, walk, TreeHashPacker};
pub use unpacker::FixtureUnpacker;

/// Runs `f` with a fresh temporary directory that is removed afterwards.
pub async fn with_tmpdir<F, Fut, R>(f: F) -> R
where
    F: FnOnce(AbsolutePath) -> Fut,
    Fut: Future<Output = R>,
{
    let dir = tempfile::Builder::new()
        .prefix("ware-test-")
        .tempdir()
        .expect("failed to create a temporary directory");
    let path = AbsolutePath::new(dir.path()).expect("temporary directories are absolute");
    let result = f(path).await;
    drop(dir);
    result
}
