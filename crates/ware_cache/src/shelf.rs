use ware_fs::RelPath;
use ware_types::WareId;

/// The directory below a ware type that holds the unpacked filesets.
pub const FILESET_DIR: &str = "fileset";

/// The directory inside the cache root that holds staging directories. It
/// lives on the same filesystem as the shelves so a commit is a single rename.
pub const STAGING_DIR: &str = ".tmp";

/// Returns the directory that holds all shelves of `ware_type`.
pub fn namespace_for(ware_type: &str) -> RelPath {
    RelPath::new(format!("{ware_type}/{FILESET_DIR}"))
        .expect("ware types only contain path-safe characters")
}

/// Returns the location of the shelf of `ware_id`, relative to the cache
/// root.
///
/// The layout is `<type>/fileset/<hash[0..3]>/<hash[3..6]>/<hash>`. Sharding
/// on the hash prefix keeps directories small.
pub fn shelf_for(ware_id: &WareId) -> RelPath {
    let hash = ware_id.hash();
    RelPath::new(format!(
        "{}/{FILESET_DIR}/{}/{}/{hash}",
        ware_id.ware_type(),
        &hash[0..3],
        &hash[3..6],
    ))
    .expect("ware ids only contain path-safe characters")
}
