//! Tests of the `apup` binary.

use anyhow::Result;
use apup::test_utils::LiveTree;
use apup::update::SnapshotStore;
use assert_cmd::Command;
use predicates::prelude::*;

fn apup(tree: &LiveTree) -> Command {
    let mut cmd = Command::cargo_bin("apup").unwrap();
    cmd.arg("--dir")
        .arg(tree.path())
        .arg("--no-progress")
        .env_remove("APUP_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("apup")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("restore"))
        .stdout(predicate::str::contains("snapshots"));
}

#[test]
fn test_snapshots_in_empty_directory() -> Result<()> {
    let tree = LiveTree::new()?;
    apup(&tree)
        .arg("snapshots")
        .assert()
        .success()
        .stdout(predicate::str::contains("No snapshots found"));
    Ok(())
}

#[test]
fn test_snapshots_lists_leftovers() -> Result<()> {
    let tree = LiveTree::new()?;
    std::fs::create_dir(tree.join("backup_20240301_120000_500"))?;
    apup(&tree)
        .arg("snapshots")
        .assert()
        .success()
        .stdout(predicate::str::contains("backup_20240301_120000_500"))
        .stdout(predicate::str::contains("2024-03-01 12:00:00"));
    Ok(())
}

#[test]
fn test_restore_missing_snapshot_fails() -> Result<()> {
    let tree = LiveTree::installed()?;
    apup(&tree)
        .args(["restore", "backup_does_not_exist"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("backup_does_not_exist"));
    Ok(())
}

#[test]
fn test_restore_brings_back_user_data() -> Result<()> {
    let tree = LiveTree::installed()?;
    let snapshot = SnapshotStore::new(&tree.layout()).create()?;
    std::fs::remove_dir_all(tree.join("dados"))?;

    let name = snapshot.location.file_name().unwrap().to_string_lossy().to_string();
    apup(&tree)
        .args(["restore", name.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored 3 files"));

    assert_eq!(tree.read("dados/database/db.json")?, r#"{"v":1}"#);
    assert_eq!(tree.read("dados/src/config.json")?, r#"{"prefixo":"!"}"#);
    assert!(snapshot.location.is_dir());
    Ok(())
}

#[test]
fn test_invalid_config_is_rejected() -> Result<()> {
    let tree = LiveTree::new()?;
    tree.write("apup.toml", "[layout]\ndata_root = \"../outside\"\n")?;
    apup(&tree).arg("snapshots").assert().code(1);
    Ok(())
}

#[test]
fn test_missing_directory_is_rejected() {
    Command::cargo_bin("apup")
        .unwrap()
        .args(["--dir", "/definitely/not/a/real/apup/dir", "snapshots"])
        .assert()
        .code(1);
}

#[test]
fn test_revision_without_known_api_writes_empty_record() -> Result<()> {
    let tree = LiveTree::new()?;
    tree.write(".apup/revision.json", "not json")?;

    apup(&tree)
        .arg("revision")
        .assert()
        .success()
        .stdout(predicate::str::contains("Commit count unknown"));

    let record: serde_json::Value = serde_json::from_str(&tree.read(".apup/revision.json")?)?;
    assert_eq!(record, serde_json::json!({}));
    Ok(())
}

#[cfg(unix)]
mod start {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_start_without_config_runs_npm_start() -> Result<()> {
        let tree = LiveTree::new()?;
        let bin = tempfile::TempDir::new()?;
        let npm = bin.path().join("npm");
        std::fs::write(&npm, "#!/bin/sh\necho \"$@\" > npm-args.txt\nexit 7\n")?;
        std::fs::set_permissions(&npm, std::fs::Permissions::from_mode(0o755))?;

        apup(&tree)
            .arg("start")
            .env("PATH", bin.path())
            .assert()
            .code(7);

        assert_eq!(tree.read("npm-args.txt")?.trim(), "start");
        Ok(())
    }
}

#[cfg(unix)]
mod with_git {
    use super::*;
    use apup::git::is_git_installed;
    use apup::test_utils::create_source_repo;
    use tempfile::TempDir;

    const INSTALL_CONFIG: &str = "[install]\nprogram = \"sh\"\nargs = [\"-c\", \"true\"]\n";

    #[test]
    fn test_update_from_local_repository() -> Result<()> {
        if !is_git_installed() {
            return Ok(());
        }
        let origin = TempDir::new()?;
        let repo = create_source_repo(
            origin.path(),
            &[
                ("index.js", "console.log('v2')"),
                ("README.md", "new readme"),
                ("dados/src/config.json", r#"{"prefixo":"?"}"#),
            ],
        )?;

        let tree = LiveTree::installed()?;
        tree.write("apup.toml", INSTALL_CONFIG)?;

        apup(&tree)
            .args(["-q", "update", "--yes", "--source"])
            .arg(repo.file_url())
            .assert()
            .success()
            .stdout(predicate::str::contains("Update complete"));

        assert_eq!(tree.read("index.js")?, "console.log('v2')");
        assert_eq!(tree.read("dados/src/config.json")?, r#"{"prefixo":"!"}"#);
        assert_eq!(tree.read("dados/database/db.json")?, r#"{"v":1}"#);
        assert!(!tree.exists("README.md"));
        assert!(!tree.exists("node_modules"));
        assert!(tree.exists(".apup/revision.json"));

        let leftovers = SnapshotStore::new(&tree.layout()).list()?;
        assert!(leftovers.is_empty(), "snapshot should be discarded: {leftovers:?}");
        Ok(())
    }

    #[test]
    fn test_failed_update_reports_snapshot() -> Result<()> {
        if !is_git_installed() {
            return Ok(());
        }
        let tree = LiveTree::installed()?;
        tree.write("apup.toml", INSTALL_CONFIG)?;
        let missing = tree.join("no-such-origin");

        apup(&tree)
            .args(["-q", "update", "--yes", "--source"])
            .arg(&missing)
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Update failed at step 'fetch'"))
            .stderr(predicate::str::contains("backup_"));

        assert_eq!(tree.read("index.js")?, "console.log('v1')");
        assert_eq!(SnapshotStore::new(&tree.layout()).list()?.len(), 1);
        Ok(())
    }
}
