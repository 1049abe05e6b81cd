use std::path::Path;

use assert_matches::assert_matches;
use rstest::rstest;
use ware_fs::{AbsolutePath, EntryType, FsDriver, OsFs, Perms};
use ware_placer::{AnyPlacer, CopyPlacer, Placer, PlacerError};
use ware_types::{Categorized, ErrorCategory, PlacementMode};

fn abs(path: &Path) -> AbsolutePath {
    AbsolutePath::new(path).unwrap()
}

/// A source tree with a nested directory and a couple of files.
fn source_tree(root: &Path) -> AbsolutePath {
    let src = root.join("src");
    fs_err::create_dir_all(src.join("nested")).unwrap();
    fs_err::write(src.join("file"), "original").unwrap();
    fs_err::write(src.join("nested/deep"), "deep").unwrap();
    abs(&src)
}

#[test]
fn copy_is_writable_and_independent() {
    let dir = tempfile::tempdir().unwrap();
    let src = source_tree(dir.path());
    let dst = abs(&dir.path().join("some/where/dst"));

    // Asking for a read-only copy still yields a writable one.
    let teardown = CopyPlacer::new().place(&src, &dst, false).unwrap();
    assert_eq!(teardown.destination(), &dst);

    assert_eq!(
        fs_err::read_to_string(dst.as_path().join("nested/deep")).unwrap(),
        "deep"
    );
    fs_err::write(dst.as_path().join("file"), "changed").unwrap();
    assert_eq!(
        fs_err::read_to_string(src.as_path().join("file")).unwrap(),
        "original"
    );

    teardown.run().unwrap();
    assert!(!dst.as_path().exists());
    assert!(src.as_path().join("file").exists());
}

#[test]
fn copy_with_read_only_dirs_tears_down() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let src = source_tree(dir.path());
    let locked = src.as_path().join("nested");
    fs_err::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();
    let dst = abs(&dir.path().join("dst"));

    let teardown = CopyPlacer::new().place(&src, &dst, true).unwrap();
    let copied = fs_err::symlink_metadata(dst.as_path().join("nested")).unwrap();
    assert_eq!(copied.permissions().mode() & 0o7777, 0o555);

    let result = teardown.run();
    fs_err::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

    result.unwrap();
    assert!(!dst.as_path().exists());
}

#[test]
fn copy_of_a_single_file() {
    let dir = tempfile::tempdir().unwrap();
    let src = source_tree(dir.path());
    let file = abs(&src.as_path().join("file"));
    let dst = abs(&dir.path().join("copied"));

    let teardown = CopyPlacer::new().place(&file, &dst, true).unwrap();
    assert_eq!(fs_err::read_to_string(dst.as_path()).unwrap(), "original");
    teardown.run().unwrap();
    assert!(!dst.as_path().exists());
}

#[test]
fn copy_into_empty_mount_point() {
    let dir = tempfile::tempdir().unwrap();
    let src = source_tree(dir.path());
    let dst = dir.path().join("dst");
    fs_err::create_dir(&dst).unwrap();

    let teardown = CopyPlacer::new().place(&src, &abs(&dst), true).unwrap();
    assert!(dst.join("nested/deep").exists());
    teardown.run().unwrap();
}

#[test]
fn copy_refuses_occupied_destination() {
    let dir = tempfile::tempdir().unwrap();
    let src = source_tree(dir.path());
    let dst = dir.path().join("dst");
    fs_err::create_dir(&dst).unwrap();
    fs_err::write(dst.join("precious"), "keep me").unwrap();

    let err = CopyPlacer::new().place(&src, &abs(&dst), true).unwrap_err();
    assert_matches!(err, PlacerError::PrepareDestination(..));
    assert_eq!(
        fs_err::read_to_string(dst.join("precious")).unwrap(),
        "keep me"
    );
}

#[test]
fn missing_source_is_a_local_problem() {
    let dir = tempfile::tempdir().unwrap();
    let err = CopyPlacer::new()
        .place(
            &abs(&dir.path().join("missing")),
            &abs(&dir.path().join("dst")),
            true,
        )
        .unwrap_err();
    assert_matches!(err, PlacerError::StatSource(..));
    assert_eq!(err.category(), ErrorCategory::LocalCacheProblem);
}

#[rstest]
#[case::copy(PlacementMode::Copy)]
#[case::mount(PlacementMode::Mount)]
fn only_files_and_dirs_can_be_placed(#[case] mode: PlacementMode) {
    let Ok(Some(placer)) = AnyPlacer::for_mode(mode) else {
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let fs = OsFs::new(abs(dir.path()));
    fs.mkfifo(&ware_fs::RelPath::new("pipe").unwrap(), Perms::from_bits(0o644))
        .unwrap();

    let err = placer
        .place(
            &abs(&dir.path().join("pipe")),
            &abs(&dir.path().join("dst")),
            false,
        )
        .unwrap_err();
    assert_matches!(err, PlacerError::UnsupportedSource(_, EntryType::NamedPipe));
    assert_eq!(err.category(), ErrorCategory::AssemblyInvalid);
    assert!(!dir.path().join("dst").exists());
}

#[cfg(target_os = "linux")]
mod bind {
    use std::io::ErrorKind;

    use ware_placer::{BindPlacer, Teardown};

    use super::*;

    /// Places with a bind mount, or returns `None` if this host does not let
    /// us mount.
    fn place_or_skip(
        source: &AbsolutePath,
        destination: &AbsolutePath,
        writable: bool,
    ) -> Option<Teardown> {
        match BindPlacer::new().place(source, destination, writable) {
            Ok(teardown) => Some(teardown),
            Err(PlacerError::Bind(_, _, e) | PlacerError::Remount(_, e))
                if e.kind() == ErrorKind::PermissionDenied =>
            {
                eprintln!("skipping bind mount test: mounting is not permitted here ({e})");
                None
            }
            Err(e) => panic!("bind placement failed: {e}"),
        }
    }

    #[test]
    fn writable_bind_mutates_the_source() {
        let dir = tempfile::tempdir().unwrap();
        let src = source_tree(dir.path());
        let dst = abs(&dir.path().join("dst"));
        let Some(teardown) = place_or_skip(&src, &dst, true) else {
            return;
        };

        fs_err::write(dst.as_path().join("file"), "through the alias").unwrap();
        let seen = fs_err::read_to_string(src.as_path().join("file")).unwrap();
        teardown.run().unwrap();

        assert_eq!(seen, "through the alias");
    }

    #[test]
    fn read_only_bind_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let src = source_tree(dir.path());
        let dst = abs(&dir.path().join("dst"));
        let Some(teardown) = place_or_skip(&src, &dst, false) else {
            return;
        };

        let visible = fs_err::read_to_string(dst.as_path().join("nested/deep")).unwrap();
        let write = fs_err::write(dst.as_path().join("file"), "nope");
        let create = fs_err::write(dst.as_path().join("new"), "nope");
        teardown.run().unwrap();

        assert_eq!(visible, "deep");
        assert!(write.is_err());
        assert!(create.is_err());
        assert_eq!(
            fs_err::read_to_string(src.as_path().join("file")).unwrap(),
            "original"
        );
        assert!(!src.as_path().join("new").exists());
    }

    #[test]
    fn teardown_removes_the_mount() {
        let dir = tempfile::tempdir().unwrap();
        let src = source_tree(dir.path());
        let dst = abs(&dir.path().join("dst"));
        let Some(teardown) = place_or_skip(&src, &dst, false) else {
            return;
        };
        assert!(dst.as_path().join("file").exists());

        teardown.run().unwrap();

        // The mount point stays behind, empty.
        assert!(dst.as_path().is_dir());
        assert_eq!(fs_err::read_dir(dst.as_path()).unwrap().count(), 0);
    }

    #[test]
    fn binds_a_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = source_tree(dir.path());
        let file = abs(&src.as_path().join("file"));
        let dst = abs(&dir.path().join("a/b/file"));
        let Some(teardown) = place_or_skip(&file, &dst, false) else {
            return;
        };

        let seen = fs_err::read_to_string(dst.as_path()).unwrap();
        teardown.run().unwrap();

        assert_eq!(seen, "original");
        assert_eq!(fs_err::read_to_string(dst.as_path()).unwrap(), "");
    }

    #[test]
    fn destination_type_must_match() {
        let dir = tempfile::tempdir().unwrap();
        let src = source_tree(dir.path());
        let dst = dir.path().join("occupied");
        fs_err::write(&dst, "a file where a dir should go").unwrap();

        let err = BindPlacer::new().place(&src, &abs(&dst), false).unwrap_err();
        assert_matches!(err, PlacerError::PrepareDestination(..));
    }
}
