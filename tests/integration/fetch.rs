//! Fetch isolation and real shallow clones.

use anyhow::Result;
use apup::config::SourceConfig;
use apup::core::UpdateError;
use apup::git::is_git_installed;
use apup::test_utils::{
    CallLog, FakeConfirmer, FakeFetcher, FakeInstaller, LiveTree, create_source_repo,
    init_test_logging,
};
use apup::update::{Fetcher, GitFetcher, Orchestrator, Outcome, Reporter, Step};
use std::path::PathBuf;
use tempfile::TempDir;

#[tokio::test]
async fn test_failed_fetch_leaves_tree_and_prior_snapshot_untouched() -> Result<()> {
    init_test_logging(None);
    let tree = LiveTree::installed()?;
    tree.write("backup_20240101_000000_000/database/db.json", r#"{"v":0}"#)?;
    let before = tree.contents()?;

    let log = CallLog::new();
    let report = Orchestrator::new(
        tree.layout(),
        &tree.config.workflow,
        FakeFetcher::failing(&log),
        FakeInstaller::succeeding(&log),
        FakeConfirmer::new(&log, true),
    )
    .run()
    .await;

    assert_eq!(report.failed_step(), Some(Step::Fetch));
    assert_eq!(report.exit_code(), 1);
    let Outcome::Aborted { error, .. } = &report.outcome else {
        panic!("expected an aborted run");
    };
    assert!(matches!(
        error.downcast_ref::<UpdateError>(),
        Some(UpdateError::FetchFailed { .. })
    ));

    // Everything except this run's snapshot is exactly as before
    let snapshot = report.snapshot.clone().expect("snapshot taken before fetch");
    let snapshot_name = snapshot.file_name().unwrap().to_string_lossy().to_string();
    let after: Vec<_> = tree
        .contents()?
        .into_iter()
        .filter(|(path, _)| !path.starts_with(&snapshot_name))
        .collect();
    assert_eq!(after, before);
    assert!(snapshot.join("database/db.json").is_file());
    Ok(())
}

#[tokio::test]
async fn test_git_fetch_clones_and_strips_readme() -> Result<()> {
    if !is_git_installed() {
        return Ok(());
    }
    let temp = TempDir::new()?;
    let repo = create_source_repo(
        &temp.path().join("origin"),
        &[("index.js", "v2"), ("README.md", "docs"), ("lib/util.js", "util")],
    )?;

    let source = SourceConfig {
        url: repo.file_url(),
        ..SourceConfig::default()
    };
    let staging = temp.path().join("staging");
    let fetcher = GitFetcher::new(&source, vec![PathBuf::from("README.md")]);
    fetcher.verify()?;
    fetcher.fetch(&staging, &Reporter::silent()).await?;

    assert_eq!(std::fs::read_to_string(staging.join("index.js"))?, "v2");
    assert_eq!(std::fs::read_to_string(staging.join("lib/util.js"))?, "util");
    assert!(!staging.join("README.md").exists());
    Ok(())
}

#[tokio::test]
async fn test_git_fetch_failure_leaves_live_tree_untouched() -> Result<()> {
    if !is_git_installed() {
        return Ok(());
    }
    let tree = LiveTree::installed()?;
    let before = tree.contents()?;

    let source = SourceConfig {
        url: tree.join("no-such-origin").display().to_string(),
        ..SourceConfig::default()
    };
    let layout = tree.layout();
    let err = GitFetcher::new(&source, layout.excluded_files.clone())
        .fetch(&layout.staging_dir, &Reporter::silent())
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<UpdateError>(),
        Some(UpdateError::FetchFailed { .. })
    ));
    assert_eq!(tree.contents()?, before);
    Ok(())
}
