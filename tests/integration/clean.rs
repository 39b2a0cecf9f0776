//! Clean-step exclusions.

use anyhow::Result;
use apup::test_utils::LiveTree;
use apup::update::{SnapshotStore, TreeReplacer};

#[test]
fn test_clean_keeps_snapshot_and_removes_artifacts() -> Result<()> {
    let tree = LiveTree::installed()?;
    tree.write(".github/workflows/ci.yml", "on: push")?;
    let layout = tree.layout();

    let snapshot = SnapshotStore::new(&layout).create()?;
    let saved_before: Vec<_> = walk(&snapshot.location)?;

    TreeReplacer::new(&layout, 10).clean(std::slice::from_ref(&snapshot.location))?;

    for artifact in [".git", ".github", "node_modules", "package.json", "package-lock.json", "README.md"]
    {
        assert!(!tree.exists(artifact), "{artifact} should be removed");
    }
    assert!(snapshot.location.is_dir());
    assert_eq!(walk(&snapshot.location)?, saved_before);
    assert!(tree.exists("index.js"));
    Ok(())
}

#[test]
fn test_clean_deletes_unconfigured_user_data() -> Result<()> {
    let tree = LiveTree::installed()?;
    tree.write("dados/notes.txt", "not backed up")?;
    tree.write("dados/cache/session.json", "{}")?;
    let layout = tree.layout();

    let snapshot = SnapshotStore::new(&layout).create()?;
    TreeReplacer::new(&layout, 10).clean(std::slice::from_ref(&snapshot.location))?;
    SnapshotStore::new(&layout).restore(&snapshot.location)?;

    // Only the configured paths come back
    assert!(!tree.exists("dados/notes.txt"));
    assert!(!tree.exists("dados/cache"));
    assert_eq!(tree.read("dados/database/db.json")?, r#"{"v":1}"#);
    assert_eq!(tree.read("dados/src/config.json")?, r#"{"prefixo":"!"}"#);
    Ok(())
}

#[test]
fn test_clean_spares_snapshot_inside_data_root() -> Result<()> {
    let mut tree = LiveTree::installed()?;
    tree.config.layout.snapshot_parent = "dados/backups".into();
    let layout = tree.layout();

    let snapshot = SnapshotStore::new(&layout).create()?;
    assert!(snapshot.location.starts_with(tree.join("dados/backups")));

    TreeReplacer::new(&layout, 10).clean(std::slice::from_ref(&snapshot.location))?;

    assert!(snapshot.location.join("database/db.json").is_file());
    assert!(!tree.exists("dados/database"));
    assert!(!tree.exists("dados/midias"));
    Ok(())
}

fn walk(root: &std::path::Path) -> Result<Vec<(std::path::PathBuf, Vec<u8>)>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push((entry.path().to_path_buf(), std::fs::read(entry.path())?));
        }
    }
    Ok(files)
}
