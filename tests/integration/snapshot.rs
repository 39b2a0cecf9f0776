//! Snapshot store behavior on real directories.

use anyhow::Result;
use apup::test_utils::LiveTree;
use apup::update::SnapshotStore;

#[test]
fn test_missing_paths_produce_no_snapshot_entries() -> Result<()> {
    let tree = LiveTree::new()?;
    tree.write("dados/src/config.json", r#"{"prefixo":"!"}"#)?;

    let store = SnapshotStore::new(&tree.layout());
    let snapshot = store.create()?;

    assert_eq!(snapshot.saved, vec![std::path::PathBuf::from("src/config.json")]);
    assert!(snapshot.location.join("src/config.json").is_file());
    assert!(!snapshot.location.join("database").exists());
    assert!(!snapshot.location.join("midias").exists());
    Ok(())
}

#[test]
fn test_snapshot_of_empty_install_is_empty() -> Result<()> {
    let tree = LiveTree::new()?;
    let store = SnapshotStore::new(&tree.layout());
    let snapshot = store.create()?;

    assert!(snapshot.location.starts_with(tree.path()));
    assert_eq!(std::fs::read_dir(&snapshot.location)?.count(), 0);
    assert_eq!(snapshot.files, 0);
    Ok(())
}

#[test]
fn test_restore_reproduces_user_data_byte_for_byte() -> Result<()> {
    let tree = LiveTree::new()?;
    tree.write("dados/database/db.json", r#"{"v":1}"#)?;
    tree.write("dados/database/nested/users.json", "[1,2,3]")?;
    tree.write("dados/src/config.json", r#"{"prefixo":"!"}"#)?;
    std::fs::create_dir_all(tree.join("dados/midias"))?;
    std::fs::write(tree.join("dados/midias/image.bin"), [0u8, 159, 146, 150, 255])?;

    let before = tree.contents()?;
    let store = SnapshotStore::new(&tree.layout());
    let snapshot = store.create()?;

    std::fs::remove_dir_all(tree.join("dados"))?;
    store.restore(&snapshot.location)?;
    store.discard(&snapshot.location);

    assert_eq!(tree.contents()?, before);
    Ok(())
}

#[test]
fn test_restore_overwrites_new_files() -> Result<()> {
    let tree = LiveTree::new()?;
    tree.write("dados/src/config.json", "user")?;
    let store = SnapshotStore::new(&tree.layout());
    let snapshot = store.create()?;

    tree.write("dados/src/config.json", "shipped default")?;
    store.restore(&snapshot.location)?;

    assert_eq!(tree.read("dados/src/config.json")?, "user");
    Ok(())
}

#[test]
fn test_list_orders_newest_first() -> Result<()> {
    let tree = LiveTree::new()?;
    let store = SnapshotStore::new(&tree.layout());
    std::fs::create_dir(tree.join("backup_20240101_000000_000"))?;
    std::fs::create_dir(tree.join("backup_20240301_120000_500"))?;
    std::fs::create_dir(tree.join("backup_garbage"))?;

    let names: Vec<_> = store.list()?.into_iter().map(|s| s.name).collect();
    assert_eq!(
        names,
        vec!["backup_20240301_120000_500", "backup_20240101_000000_000", "backup_garbage"]
    );
    Ok(())
}
