//! Deployment by pushing the output tree to a git branch (GitHub Pages and
//! any other git remote).
//!
//! A working clone is kept between runs. Each deploy fetches the target
//! branch, mirrors the output into the clone, and commits and pushes only if
//! something changed. Authentication is whatever the user's git and SSH
//! setup provides.

use crate::{DeploymentResult, Deployer};
use async_trait::async_trait;
use blog_kit_core::{DeployError, DeploymentTarget};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const TRANSIENT_MARKERS: &[&str] = &[
    "Could not resolve host",
    "Connection timed out",
    "Connection reset",
    "Connection refused",
    "early EOF",
];

const AUTH_MARKERS: &[&str] = &[
    "Permission denied (publickey)",
    "Authentication failed",
    "could not read Username",
    "returned error: 403",
    "denied to",
];

const MISSING_BRANCH_MARKER: &str = "couldn't find remote ref";

/// State of the target branch on the remote after fetching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemoteBranch {
    Fetched,
    Missing,
}

/// Captured result of one git invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Runs git commands. Swapped out in tests.
#[async_trait]
pub trait GitTransport: Send + Sync {
    async fn run(&self, workdir: &Path, args: &[&str]) -> io::Result<GitOutput>;
}

/// The `git` executable on `PATH`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGit;

#[async_trait]
impl GitTransport for SystemGit {
    async fn run(&self, workdir: &Path, args: &[&str]) -> io::Result<GitOutput> {
        let output = tokio::process::Command::new("git")
            .args(args)
            .current_dir(workdir)
            .output()
            .await?;
        Ok(GitOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

pub struct GitDeployer<G: GitTransport = SystemGit> {
    name: String,
    remote: String,
    branch: String,
    workdir: PathBuf,
    transport: G,
    retry_delay: Duration,
}

impl GitDeployer<SystemGit> {
    pub fn from_target(target: &DeploymentTarget, workdir: impl Into<PathBuf>) -> Self {
        Self::with_transport(target, workdir, SystemGit)
    }
}

impl<G: GitTransport> GitDeployer<G> {
    pub fn with_transport(target: &DeploymentTarget, workdir: impl Into<PathBuf>, transport: G) -> Self {
        let name = match target {
            DeploymentTarget::GitHub { .. } => "github",
            DeploymentTarget::Git { .. } => "git",
        };
        Self {
            name: name.to_string(),
            remote: target.remote_url(),
            branch: target.branch().to_string(),
            workdir: workdir.into(),
            transport,
            retry_delay: Duration::from_secs(2),
        }
    }

    /// Pause before the single retry of a transient failure
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn target(&self) -> String {
        format!("{} ({})", self.remote, self.branch)
    }

    async fn git(&self, args: &[&str]) -> Result<GitOutput, DeployError> {
        debug!(args = ?args, "git");
        let output = self
            .transport
            .run(&self.workdir, args)
            .await
            .map_err(|e| DeployError::other(format!("failed to run git: {e}")))?;
        if output.success {
            Ok(output)
        } else {
            Err(classify(args, &output.stderr))
        }
    }

    /// Run once more after a transient failure
    async fn git_with_retry(&self, args: &[&str]) -> Result<GitOutput, DeployError> {
        match self.git(args).await {
            Err(e) if e.is_transient() => {
                warn!(error = %e, "transient git failure, retrying once");
                tokio::time::sleep(self.retry_delay).await;
                self.git(args).await
            }
            result => result,
        }
    }

    /// Commits on the local branch that the remote does not have
    async fn unpushed_commits(&self) -> Result<usize, DeployError> {
        let range = format!("origin/{}..HEAD", self.branch);
        let output = self.git(&["rev-list", "--count", range.as_str()]).await?;
        Ok(output.stdout.trim().parse().unwrap_or(0))
    }

    /// Point HEAD at an unborn branch, dropping any local commits left by an
    /// earlier run whose push never landed.
    async fn start_branch(&self) -> Result<(), DeployError> {
        let head = format!("refs/heads/{}", self.branch);
        self.git(&["symbolic-ref", "HEAD", head.as_str()]).await?;
        let existing = self
            .transport
            .run(&self.workdir, &["rev-parse", "--verify", "--quiet", head.as_str()])
            .await
            .map_err(|e| DeployError::other(format!("failed to run git: {e}")))?;
        if existing.success {
            warn!(branch = %self.branch, "discarding local commits the remote never received");
            self.git(&["update-ref", "-d", head.as_str()]).await?;
        }
        Ok(())
    }

    async fn prepare_workdir(&self) -> Result<RemoteBranch, DeployError> {
        fs::create_dir_all(&self.workdir).map_err(|e| {
            DeployError::other(format!("failed to create {}: {e}", self.workdir.display()))
        })?;

        if self.workdir.join(".git").exists() {
            self.git(&["remote", "set-url", "origin", self.remote.as_str()]).await?;
        } else {
            self.git(&["init", "--quiet"]).await?;
            self.git(&["remote", "add", "origin", self.remote.as_str()]).await?;
        }

        match self.git_with_retry(&["fetch", "origin", self.branch.as_str()]).await {
            Ok(_) => {
                let upstream = format!("origin/{}", self.branch);
                self.git(&["checkout", "--force", "-B", self.branch.as_str(), upstream.as_str()])
                    .await?;
                Ok(RemoteBranch::Fetched)
            }
            Err(e) if e.message.contains(MISSING_BRANCH_MARKER) => {
                info!(branch = %self.branch, "remote branch does not exist yet, starting it");
                self.start_branch().await?;
                Ok(RemoteBranch::Missing)
            }
            Err(e) => Err(e),
        }
    }

    async fn push(&self) -> Result<(), DeployError> {
        self.git_with_retry(&["push", "origin", self.branch.as_str()]).await?;
        info!(remote = %self.target(), "deployed");
        Ok(())
    }
}

#[async_trait]
impl<G: GitTransport> Deployer for GitDeployer<G> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deploy(&self, output: &Path) -> Result<DeploymentResult, DeployError> {
        if !output.is_dir() {
            return Err(DeployError::other(format!(
                "output directory {} does not exist",
                output.display()
            )));
        }
        info!(remote = %self.target(), "deploying");

        let remote = self.prepare_workdir().await?;
        let files = mirror(output, &self.workdir)
            .map_err(|e| DeployError::other(format!("failed to stage output: {e}")))?;
        debug!(files, "mirrored output into working clone");

        self.git(&["add", "--all"]).await?;
        let status = self.git(&["status", "--porcelain"]).await?;
        if status.stdout.trim().is_empty() {
            // The tree matches HEAD; only a push can still be owed
            let changed =
                remote == RemoteBranch::Fetched && self.unpushed_commits().await? > 0;
            if changed {
                self.push().await?;
            } else {
                info!("target already up to date");
            }
            return Ok(DeploymentResult {
                target: self.target(),
                changed,
            });
        }

        let message = format!(
            "Publish deploy {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        );
        self.git(&["commit", "--quiet", "-m", message.as_str()]).await?;
        self.push().await?;
        Ok(DeploymentResult {
            target: self.target(),
            changed: true,
        })
    }
}

fn classify(args: &[&str], stderr: &str) -> DeployError {
    let command = args.first().copied().unwrap_or("git");
    let message = format!("git {} failed: {}", command, stderr.trim());
    if AUTH_MARKERS.iter().any(|m| stderr.contains(m)) {
        DeployError::auth(message)
    } else if TRANSIENT_MARKERS.iter().any(|m| stderr.contains(m)) {
        DeployError::transient(message)
    } else {
        DeployError::other(message)
    }
}

/// Make `dest` hold exactly the files of `source`, leaving `dest/.git` alone
fn mirror(source: &Path, dest: &Path) -> io::Result<usize> {
    for entry in fs::read_dir(dest)? {
        let entry = entry?;
        if entry.file_name() == ".git" {
            continue;
        }
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }

    let mut copied = 0;
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blog_kit_core::DeployErrorKind;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records every command; answers from a queue of scripted failures
    /// keyed by subcommand, succeeding otherwise with the scripted stdout.
    #[derive(Default)]
    struct FakeGit {
        calls: Mutex<Vec<String>>,
        failures: Mutex<VecDeque<(&'static str, &'static str)>>,
        answers: Vec<(&'static str, &'static str)>,
    }

    impl FakeGit {
        fn with_status(status: &'static str) -> Self {
            Self::default().answer("status", status)
        }

        fn answer(mut self, command: &'static str, stdout: &'static str) -> Self {
            self.answers.push((command, stdout));
            self
        }

        fn fail(self, command: &'static str, stderr: &'static str) -> Self {
            self.failures.lock().unwrap().push_back((command, stderr));
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, command: &str) -> usize {
            self.calls()
                .iter()
                .filter(|c| c.split(' ').next() == Some(command))
                .count()
        }
    }

    #[async_trait]
    impl GitTransport for FakeGit {
        async fn run(&self, _workdir: &Path, args: &[&str]) -> io::Result<GitOutput> {
            self.calls.lock().unwrap().push(args.join(" "));

            let mut failures = self.failures.lock().unwrap();
            if let Some(pos) = failures.iter().position(|(cmd, _)| *cmd == args[0]) {
                if let Some((_, stderr)) = failures.remove(pos) {
                    return Ok(GitOutput {
                        success: false,
                        stderr: stderr.to_string(),
                        ..Default::default()
                    });
                }
            }

            let stdout = self
                .answers
                .iter()
                .find(|(cmd, _)| *cmd == args[0])
                .map_or("", |(_, stdout)| *stdout);
            Ok(GitOutput {
                success: true,
                stdout: stdout.to_string(),
                ..Default::default()
            })
        }
    }

    fn github() -> DeploymentTarget {
        DeploymentTarget::GitHub {
            repository: "tg908/tg908.github.io".to_string(),
            branch: "master".to_string(),
            use_ssh: true,
        }
    }

    struct Fixture {
        _dir: TempDir,
        output: PathBuf,
        workdir: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("Output");
        fs::create_dir_all(output.join("posts/hello")).unwrap();
        fs::write(output.join("index.html"), "home").unwrap();
        fs::write(output.join("posts/hello/index.html"), "hello").unwrap();
        let workdir = dir.path().join(".blog-kit/deploy");
        Fixture {
            _dir: dir,
            output,
            workdir,
        }
    }

    fn deployer(fx: &Fixture, git: FakeGit) -> GitDeployer<FakeGit> {
        GitDeployer::with_transport(&github(), &fx.workdir, git).retry_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_first_deploy_starts_branch_and_pushes() {
        let fx = fixture();
        let git = FakeGit::with_status("A  index.html\n")
            .fail("fetch", "fatal: couldn't find remote ref master")
            .fail("rev-parse", "");
        let deployer = deployer(&fx, git);

        let result = deployer.deploy(&fx.output).await.unwrap();

        assert!(result.changed);
        assert_eq!(result.target, "git@github.com:tg908/tg908.github.io.git (master)");
        let calls = deployer.transport.calls();
        assert_eq!(
            calls,
            vec![
                "init --quiet",
                "remote add origin git@github.com:tg908/tg908.github.io.git",
                "fetch origin master",
                "symbolic-ref HEAD refs/heads/master",
                "rev-parse --verify --quiet refs/heads/master",
                "add --all",
                "status --porcelain",
                calls[7].as_str(),
                "push origin master",
            ]
        );
        assert!(calls[7].starts_with("commit --quiet -m Publish deploy "));
        assert_eq!(
            fs::read_to_string(fx.workdir.join("posts/hello/index.html")).unwrap(),
            "hello"
        );
    }

    #[tokio::test]
    async fn test_existing_branch_is_checked_out() {
        let fx = fixture();
        let deployer = deployer(&fx, FakeGit::with_status("M index.html\n"));
        deployer.deploy(&fx.output).await.unwrap();
        assert!(
            deployer
                .transport
                .calls()
                .contains(&"checkout --force -B master origin/master".to_string())
        );
    }

    #[tokio::test]
    async fn test_unchanged_tree_is_a_no_op() {
        let fx = fixture();
        let deployer = deployer(&fx, FakeGit::with_status(""));

        let result = deployer.deploy(&fx.output).await.unwrap();

        assert!(!result.changed);
        assert_eq!(deployer.transport.count("rev-list"), 1);
        assert_eq!(deployer.transport.count("commit"), 0);
        assert_eq!(deployer.transport.count("push"), 0);
    }

    #[tokio::test]
    async fn test_unpushed_commit_on_missing_branch_is_discarded() {
        let fx = fixture();
        // Local branch holds a commit from a run whose push was rejected
        let git = FakeGit::with_status("A  index.html\n")
            .fail("fetch", "fatal: couldn't find remote ref master");
        let deployer = deployer(&fx, git);

        let result = deployer.deploy(&fx.output).await.unwrap();

        assert!(result.changed);
        let calls = deployer.transport.calls();
        let reset = calls
            .iter()
            .position(|c| c == "update-ref -d refs/heads/master")
            .unwrap();
        let add = calls.iter().position(|c| c == "add --all").unwrap();
        assert!(reset < add);
        assert_eq!(deployer.transport.count("commit"), 1);
        assert_eq!(deployer.transport.count("push"), 1);
    }

    #[tokio::test]
    async fn test_clean_tree_ahead_of_remote_is_pushed() {
        let fx = fixture();
        let git = FakeGit::with_status("").answer("rev-list", "1\n");
        let deployer = deployer(&fx, git);

        let result = deployer.deploy(&fx.output).await.unwrap();

        assert!(result.changed);
        assert!(
            deployer
                .transport
                .calls()
                .contains(&"rev-list --count origin/master..HEAD".to_string())
        );
        assert_eq!(deployer.transport.count("commit"), 0);
        assert_eq!(deployer.transport.count("push"), 1);
    }

    #[tokio::test]
    async fn test_https_denial_not_retried() {
        let fx = fixture();
        let git = FakeGit::with_status("M index.html\n").fail(
            "push",
            "fatal: unable to access 'https://github.com/tg908/tg908.github.io.git/': The requested URL returned error: 403",
        );
        let deployer = deployer(&fx, git);

        let err = deployer.deploy(&fx.output).await.unwrap_err();
        assert_eq!(err.kind, DeployErrorKind::Auth);
        assert_eq!(deployer.transport.count("push"), 1);
    }

    #[tokio::test]
    async fn test_transient_push_failure_retried_once() {
        let fx = fixture();
        let git = FakeGit::with_status("M index.html\n")
            .fail("push", "fatal: unable to access 'https://github.com/': Could not resolve host");
        let deployer = deployer(&fx, git);

        assert!(deployer.deploy(&fx.output).await.unwrap().changed);
        assert_eq!(deployer.transport.count("push"), 2);
    }

    #[tokio::test]
    async fn test_repeated_transient_failure_gives_up() {
        let fx = fixture();
        let git = FakeGit::with_status("M index.html\n")
            .fail("push", "fatal: early EOF")
            .fail("push", "fatal: early EOF");
        let deployer = deployer(&fx, git);

        let err = deployer.deploy(&fx.output).await.unwrap_err();
        assert_eq!(err.kind, DeployErrorKind::Transient);
        assert_eq!(deployer.transport.count("push"), 2);
    }

    #[tokio::test]
    async fn test_auth_failure_not_retried() {
        let fx = fixture();
        let git = FakeGit::with_status("").fail(
            "fetch",
            "git@github.com: Permission denied (publickey).\nfatal: Could not read from remote repository.",
        );
        let deployer = deployer(&fx, git);

        let err = deployer.deploy(&fx.output).await.unwrap_err();
        assert_eq!(err.kind, DeployErrorKind::Auth);
        assert!(err.message.starts_with("git fetch failed"));
        assert_eq!(deployer.transport.count("fetch"), 1);
        assert_eq!(deployer.transport.count("add"), 0);
    }

    #[tokio::test]
    async fn test_missing_output_fails_before_git() {
        let fx = fixture();
        let deployer = deployer(&fx, FakeGit::default());
        let err = deployer.deploy(&fx.workdir.join("nope")).await.unwrap_err();
        assert_eq!(err.kind, DeployErrorKind::Other);
        assert!(deployer.transport.calls().is_empty());
    }

    #[test]
    fn test_mirror_replaces_files_but_keeps_git_dir() {
        let fx = fixture();
        fs::create_dir_all(fx.workdir.join(".git")).unwrap();
        fs::write(fx.workdir.join(".git/HEAD"), "ref").unwrap();
        fs::create_dir_all(fx.workdir.join("old")).unwrap();
        fs::write(fx.workdir.join("old/page.html"), "stale").unwrap();

        let copied = mirror(&fx.output, &fx.workdir).unwrap();

        assert_eq!(copied, 2);
        assert!(fx.workdir.join(".git/HEAD").exists());
        assert!(!fx.workdir.join("old").exists());
        assert!(fx.workdir.join("index.html").exists());
    }

    #[test]
    fn test_classify() {
        assert!(classify(&["push"], "Connection reset by peer").is_transient());
        assert_eq!(
            classify(&["push"], "remote: Authentication failed").kind,
            DeployErrorKind::Auth
        );
        assert_eq!(
            classify(&["push"], "! [rejected] master -> master (non-fast-forward)").kind,
            DeployErrorKind::Other
        );
        assert_eq!(
            classify(
                &["push"],
                "fatal: unable to access 'https://github.com/a/b.git/': The requested URL returned error: 403"
            )
            .kind,
            DeployErrorKind::Auth
        );
        assert_eq!(
            classify(&["push"], "remote: Permission to a/b.git denied to someone.").kind,
            DeployErrorKind::Auth
        );
        assert!(
            classify(
                &["fetch"],
                "fatal: unable to access 'https://github.com/a/b.git/': Could not resolve host: github.com"
            )
            .is_transient()
        );
    }
}
