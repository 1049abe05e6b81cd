//! Checks every [`PackTool`] has to pass.

use ware_fs::{FsDriver, Metadata, OFlag, OsFs, Perms, RelPath};
use ware_types::{CancellationToken, FilesetFilters, FilterPolicy, PackRequest, PackTool, WareId};

use crate::{fixtures, place_fixture, walk, with_tmpdir};

/// Everything observable about a tree: the metadata of every entry and the
/// content of every file.
fn snapshot(fs: &OsFs) -> Vec<(Metadata, Vec<u8>)> {
    walk(fs, &RelPath::base())
        .expect("fixture can be walked")
        .into_iter()
        .map(|meta| {
            let mut body = Vec::new();
            if meta.entry_type.is_file() {
                let mut file = fs
                    .open(&meta.name, OFlag::O_RDONLY, Perms::from_bits(0))
                    .expect("fixture file can be opened");
                std::io::copy(&mut file, &mut body).expect("fixture file can be read");
            }
            (meta, body)
        })
        .collect()
}

async fn pack_dir(pack: &dyn PackTool, fs: &OsFs, filters: FilesetFilters) -> WareId {
    let request = PackRequest::new("tar", fs.base_path().as_path()).with_filters(filters);
    match pack.pack(CancellationToken::new(), request).await {
        Ok(ware_id) => ware_id,
        Err(err) => panic!("packing '{}' failed: {err}", fs.base_path()),
    }
}

/// Packing the same tree twice yields the same ware id and leaves the tree
/// untouched.
pub async fn check_pack_produces_consistent_hash(pack: &dyn PackTool) {
    for fixture in fixtures::all_fixtures() {
        with_tmpdir(|dir| async move {
            let fs = OsFs::new(dir);
            place_fixture(&fs, &fixture.files).expect("fixture can be placed");
            let before = snapshot(&fs);

            let first = pack_dir(pack, &fs, FilesetFilters::default()).await;
            let second = pack_dir(pack, &fs, FilesetFilters::default()).await;

            assert_eq!(first, second, "fixture {} packed inconsistently", fixture.name);
            assert!(
                snapshot(&fs) == before,
                "packing modified fixture {}",
                fixture.name
            );
        })
        .await;
    }
}

/// Every variation of the alpha fixture packs to a different ware id than
/// alpha itself, with modification times kept.
///
/// The ownership variation needs root and is skipped otherwise.
pub async fn check_pack_hash_varies_on_variations(pack: &dyn PackTool) {
    let filters = FilesetFilters::default().with_mtime(FilterPolicy::Keep);
    let pack_fixture = move |files: Vec<fixtures::FixtureFile>| async move {
        with_tmpdir(|dir| async move {
            let fs = OsFs::new(dir);
            place_fixture(&fs, &files).expect("fixture can be placed");
            pack_dir(pack, &fs, filters).await
        })
        .await
    };

    let alpha = pack_fixture(fixtures::alpha()).await;

    let mut variations = fixtures::all_fixtures()
        .into_iter()
        .filter(|fixture| fixture.name != "Alpha")
        .collect::<Vec<_>>();
    if nix::unistd::geteuid().is_root() {
        variations.push(fixtures::Fixture {
            name: "AlphaDiffUidGid",
            files: fixtures::alpha_diff_uid_gid(),
        });
    } else {
        tracing::info!("not running as root, skipping the ownership variation");
    }

    for fixture in variations {
        let varied = pack_fixture(fixture.files).await;
        assert_ne!(
            varied, alpha,
            "fixture {} packed to the same id as Alpha",
            fixture.name
        );
    }
}
