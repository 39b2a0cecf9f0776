//! Orchestrator behavior: ordering, aborts, cancellation and the full scenario.

use anyhow::Result;
use apup::core::UpdateError;
use apup::test_utils::{
    CallLog, FakeConfirmer, FakeFetcher, FakeInstaller, LiveTree, init_test_logging,
};
use apup::update::{CountdownConfirmer, Orchestrator, Outcome, ProgressEvent, Reporter, Step};
use std::time::Duration;

const NEW_RELEASE: &[(&str, &str)] = &[
    ("index.js", "console.log('v2')"),
    ("package.json", r#"{"name":"app","version":"2.0.0"}"#),
    ("lib/commands.js", "module.exports = {}"),
    ("dados/database/db.json", r#"{"v":"shipped"}"#),
    ("dados/src/config.json", r#"{"prefixo":"?"}"#),
];

#[tokio::test]
async fn test_update_replaces_application_and_keeps_user_data() -> Result<()> {
    init_test_logging(None);
    let tree = LiveTree::installed()?;
    tree.write("dados/leftover.log", "deleted by clean")?;

    let log = CallLog::new();
    let (reporter, mut rx) = Reporter::channel();
    let report = Orchestrator::new(
        tree.layout(),
        &tree.config.workflow,
        FakeFetcher::with_files(&log, NEW_RELEASE),
        FakeInstaller::succeeding(&log),
        FakeConfirmer::new(&log, true),
    )
    .with_reporter(reporter)
    .run()
    .await;

    assert!(report.is_success(), "outcome: {:?}", report.outcome);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.completed, Step::ALL.to_vec());
    assert_eq!(report.entries_applied, 4);

    // User data survives regardless of what the release shipped
    assert_eq!(tree.read("dados/database/db.json")?, r#"{"v":1}"#);
    assert_eq!(tree.read("dados/src/config.json")?, r#"{"prefixo":"!"}"#);
    assert_eq!(tree.read("dados/midias/logo.png")?, "png-bytes");
    assert!(!tree.exists("dados/leftover.log"));

    // Application files are the new ones
    assert_eq!(tree.read("index.js")?, "console.log('v2')");
    assert_eq!(tree.read("lib/commands.js")?, "module.exports = {}");
    assert!(!tree.exists("node_modules"));
    assert!(!tree.exists(".git"));
    assert!(!tree.exists("README.md"));

    // Temporary material is gone
    assert!(report.snapshot_discarded);
    assert!(!report.snapshot.as_ref().unwrap().exists());
    assert!(!tree.layout().staging_dir.exists());

    assert_eq!(
        log.calls(),
        vec!["verify-fetcher", "verify-installer", "confirm", "fetch", "install"]
    );

    let mut started = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let ProgressEvent::StepStarted { step, .. } = event {
            started.push(step);
        }
    }
    assert_eq!(started, Step::ALL.to_vec());
    Ok(())
}

#[tokio::test]
async fn test_install_failure_aborts_and_keeps_snapshot() -> Result<()> {
    let tree = LiveTree::installed()?;
    let log = CallLog::new();

    let report = Orchestrator::new(
        tree.layout(),
        &tree.config.workflow,
        FakeFetcher::with_files(&log, NEW_RELEASE),
        FakeInstaller::failing(&log),
        FakeConfirmer::new(&log, true),
    )
    .run()
    .await;

    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.failed_step(), Some(Step::InstallDependencies));
    assert_eq!(report.completed, Step::ALL[..7].to_vec());
    assert!(!report.completed.contains(&Step::Finalize));

    let snapshot = report.recovery_snapshot().expect("snapshot is kept");
    assert_eq!(
        std::fs::read_to_string(snapshot.join("database/db.json"))?,
        r#"{"v":1}"#
    );
    // Restore ran before the failing step
    assert_eq!(tree.read("dados/src/config.json")?, r#"{"prefixo":"!"}"#);
    assert_eq!(log.calls().last().map(String::as_str), Some("install"));
    Ok(())
}

#[tokio::test]
async fn test_failed_step_stops_the_sequence() -> Result<()> {
    let tree = LiveTree::installed()?;
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
    assert_eq!(
        report.completed,
        vec![Step::VerifyPrerequisites, Step::Confirm, Step::Snapshot]
    );
    assert_eq!(
        log.calls(),
        vec!["verify-fetcher", "verify-installer", "confirm", "fetch"]
    );
    // Clean never ran
    assert!(tree.exists("node_modules/dep/index.js"));
    assert!(tree.exists("dados/database/db.json"));
    Ok(())
}

#[tokio::test]
async fn test_apply_failure_keeps_snapshot_for_recovery() -> Result<()> {
    let tree = LiveTree::installed()?;
    let log = CallLog::new();

    let report = Orchestrator::new(
        tree.layout(),
        &tree.config.workflow,
        FakeFetcher::unreadable_staging(&log),
        FakeInstaller::succeeding(&log),
        FakeConfirmer::new(&log, true),
    )
    .run()
    .await;

    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.failed_step(), Some(Step::Apply));
    assert_eq!(report.completed, Step::ALL[..5].to_vec());
    for step in [Step::Restore, Step::InstallDependencies, Step::Finalize] {
        assert!(!report.completed.contains(&step), "{step} must not run");
    }
    assert!(!log.calls().contains(&"install".to_string()));

    let Outcome::Aborted { error, .. } = &report.outcome else {
        panic!("expected an aborted run");
    };
    assert!(matches!(
        error.downcast_ref::<UpdateError>(),
        Some(UpdateError::FileSystemError { .. })
    ));

    // Clean ran and apply stopped before copying anything
    assert!(!tree.exists("node_modules"));
    assert_eq!(tree.read("index.js")?, "console.log('v1')");
    assert!(!report.snapshot_discarded);
    let snapshot = report.recovery_snapshot().expect("snapshot is kept");
    assert_eq!(
        std::fs::read_to_string(snapshot.join("database/db.json"))?,
        r#"{"v":1}"#
    );
    assert_eq!(
        std::fs::read_to_string(snapshot.join("src/config.json"))?,
        r#"{"prefixo":"!"}"#
    );
    Ok(())
}

#[tokio::test]
async fn test_rejected_snapshot_location_is_not_reported() -> Result<()> {
    let mut tree = LiveTree::installed()?;
    tree.config.layout.snapshot_parent = "dados/database/backups".into();
    let log = CallLog::new();

    let report = Orchestrator::new(
        tree.layout(),
        &tree.config.workflow,
        FakeFetcher::with_files(&log, NEW_RELEASE),
        FakeInstaller::succeeding(&log),
        FakeConfirmer::new(&log, true),
    )
    .run()
    .await;

    assert_eq!(report.failed_step(), Some(Step::Snapshot));
    assert!(report.snapshot.is_none());
    assert!(report.recovery_snapshot().is_none());
    assert!(!tree.exists("dados/database/backups"));
    assert!(!log.calls().contains(&"fetch".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_missing_prerequisite_stops_before_anything_else() -> Result<()> {
    let tree = LiveTree::installed()?;
    let before = tree.contents()?;
    let log = CallLog::new();

    let report = Orchestrator::new(
        tree.layout(),
        &tree.config.workflow,
        FakeFetcher::with_files(&log, NEW_RELEASE).missing_tool("git"),
        FakeInstaller::succeeding(&log),
        FakeConfirmer::new(&log, true),
    )
    .run()
    .await;

    assert_eq!(report.failed_step(), Some(Step::VerifyPrerequisites));
    assert_eq!(report.exit_code(), 1);
    assert!(report.snapshot.is_none());
    assert_eq!(log.calls(), vec!["verify-fetcher"]);
    assert_eq!(tree.contents()?, before);
    Ok(())
}

#[tokio::test]
async fn test_declined_confirmation_is_a_clean_exit() -> Result<()> {
    let tree = LiveTree::installed()?;
    let before = tree.contents()?;
    let log = CallLog::new();

    let report = Orchestrator::new(
        tree.layout(),
        &tree.config.workflow,
        FakeFetcher::with_files(&log, NEW_RELEASE),
        FakeInstaller::succeeding(&log),
        FakeConfirmer::new(&log, false),
    )
    .run()
    .await;

    assert!(matches!(
        report.outcome,
        Outcome::Cancelled {
            step: Some(Step::Confirm)
        }
    ));
    assert_eq!(report.exit_code(), 0);
    assert!(report.snapshot.is_none());
    assert_eq!(tree.contents()?, before);
    Ok(())
}

#[tokio::test]
async fn test_interrupt_during_countdown_changes_nothing() -> Result<()> {
    let tree = LiveTree::installed()?;
    let before = tree.contents()?;
    let log = CallLog::new();

    let report = Orchestrator::new(
        tree.layout(),
        &tree.config.workflow,
        FakeFetcher::with_files(&log, NEW_RELEASE),
        FakeInstaller::succeeding(&log),
        CountdownConfirmer::new(30),
    )
    .run_until(tokio::time::sleep(Duration::from_millis(200)))
    .await;

    assert!(matches!(
        report.outcome,
        Outcome::Cancelled {
            step: Some(Step::Confirm)
        }
    ));
    assert_eq!(report.exit_code(), 0);
    assert_eq!(log.calls(), vec!["verify-fetcher", "verify-installer"]);
    assert_eq!(tree.contents()?, before);
    Ok(())
}
