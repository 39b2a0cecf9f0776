//! Local Git repositories that stand in for the application's remote.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::process::Command;

/// A repository on disk that tests can clone from with a `file://` URL.
pub struct TestGit {
    root: PathBuf,
}

impl TestGit {
    /// Wraps an existing directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Runs `git <args>` inside the repository.
    pub fn git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .output()
            .with_context(|| format!("Could not run git {}", args.join(" ")))?;
        if !output.status.success() {
            bail!("git {} failed: {}", args.join(" "), String::from_utf8_lossy(&output.stderr).trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// `git init` with a local identity so commits work on bare CI machines.
    pub fn init(&self) -> Result<()> {
        self.git(&["init", "--quiet"])?;
        self.git(&["config", "user.email", "release@apup.example"])?;
        self.git(&["config", "user.name", "Release Bot"])?;
        Ok(())
    }

    /// Stages everything and commits it.
    pub fn commit_all(&self, message: &str) -> Result<()> {
        self.git(&["add", "--all"])?;
        self.git(&["commit", "--quiet", "-m", message])?;
        Ok(())
    }

    /// `file://` URL of the repository; shallow clones need the URL form.
    pub fn file_url(&self) -> String {
        let path = self.root.display().to_string().replace('\\', "/");
        match path.strip_prefix('/') {
            Some(rest) => format!("file:///{rest}"),
            None => format!("file:///{path}"),
        }
    }
}

/// Creates a repository at `path` whose single commit holds `files`.
pub fn create_source_repo(path: &Path, files: &[(&str, &str)]) -> Result<TestGit> {
    for (relative, content) in files {
        let file = path.join(relative);
        crate::utils::fs::ensure_parent_dir(&file)?;
        std::fs::write(&file, content)?;
    }
    crate::utils::fs::ensure_dir(path)?;

    let repo = TestGit::new(path);
    repo.init()?;
    repo.commit_all("Release")?;
    Ok(repo)
}
