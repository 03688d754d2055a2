use std::{
    path::{Path, PathBuf},
    process::Command,
};

use crate::errors::SyncError;

const COMMIT_AUTHOR: &str = "beanbot <beanbot@localhost>";

/// Remote synchronization of the ledger directory. Both operations are
/// idempotent so the pipeline can retry them safely.
pub(crate) trait Synchronizer {
    /// Bring the local copy up to date with the remote, discarding local
    /// divergence.
    fn pull(&self) -> Result<(), SyncError>;

    /// Publish a changed file to the remote with the given message.
    fn push(&self, relative_path: &str, message: &str) -> Result<(), SyncError>;
}

/// No remote configured. Everything stays local.
pub(crate) struct NoopSync;

impl Synchronizer for NoopSync {
    fn pull(&self) -> Result<(), SyncError> {
        Ok(())
    }

    fn push(&self, _relative_path: &str, _message: &str) -> Result<(), SyncError> {
        Ok(())
    }
}

/// The ledger directory is a git worktree tracking a remote.
pub(crate) struct GitSync {
    root: PathBuf,
}

impl GitSync {
    pub(crate) fn new(root: &Path) -> Self {
        GitSync {
            root: root.to_path_buf(),
        }
    }

    fn git(&self, args: &[&str]) -> Result<(), SyncError> {
        tracing::debug!("git {}", args.join(" "));
        let status = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(SyncError::Command {
                command: format!("git {}", args.join(" ")),
                status,
            })
        }
    }

    fn is_clean(&self, relative_path: &str) -> Result<bool, SyncError> {
        let status = Command::new("git")
            .args(["diff", "--quiet", "HEAD", "--", relative_path])
            .current_dir(&self.root)
            .status()?;
        Ok(status.success())
    }
}

impl Synchronizer for GitSync {
    fn pull(&self) -> Result<(), SyncError> {
        // local divergence loses, the remote is the source of truth
        self.git(&["reset", "--hard"])?;
        self.git(&["clean", "-fd"])?;
        self.git(&["pull"])
    }

    fn push(&self, relative_path: &str, message: &str) -> Result<(), SyncError> {
        // stage first: a brand-new entry file is untracked and would
        // otherwise look clean and never reach the remote
        self.git(&["add", relative_path])?;
        if self.is_clean(relative_path)? {
            tracing::debug!("{relative_path} unchanged, nothing to push");
            return Ok(());
        }
        self.git(&["commit", "--author", COMMIT_AUTHOR, "-am", message])?;
        self.git(&["push"])
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn git(root: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(root)
            .status()
            .unwrap();
        assert!(status.success(), "git {args:?} failed");
    }

    fn init_repo(root: &Path) {
        git(root, &["init", "-q"]);
        git(root, &["config", "user.name", "test"]);
        git(root, &["config", "user.email", "test@localhost"]);
        fs::write(root.join("main.bean"), "2024-01-01 open Assets:Cash\n").unwrap();
        git(root, &["add", "main.bean"]);
        git(root, &["commit", "-qm", "initial"]);
    }

    fn log_contains(root: &Path, needle: &str) -> bool {
        let output = Command::new("git")
            .args(["log", "--oneline"])
            .current_dir(root)
            .output()
            .unwrap();
        String::from_utf8_lossy(&output.stdout).contains(needle)
    }

    #[test]
    fn push_commits_a_new_untracked_file() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        fs::create_dir_all(dir.path().join("books/2024")).unwrap();
        fs::write(
            dir.path().join("books/2024/march.bean"),
            "2024-03-01 * \"Coffee\" #bot\n",
        )
        .unwrap();

        let sync = GitSync::new(dir.path());
        // no remote is configured, so the final push fails, but by then the
        // new file must already be committed locally
        assert!(sync.push("books/2024/march.bean", "beanbot: Coffee").is_err());
        assert!(log_contains(dir.path(), "beanbot: Coffee"));
    }

    #[test]
    fn push_commits_a_changed_tracked_file() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        fs::write(
            dir.path().join("main.bean"),
            "2024-01-01 open Assets:Cash\n2024-01-01 open Expenses:Food\n",
        )
        .unwrap();

        let sync = GitSync::new(dir.path());
        assert!(sync.push("main.bean", "beanbot: Groceries").is_err());
        assert!(log_contains(dir.path(), "beanbot: Groceries"));
    }

    #[test]
    fn push_skips_when_nothing_changed() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());

        let sync = GitSync::new(dir.path());
        sync.push("main.bean", "beanbot: nothing").unwrap();
        assert!(!log_contains(dir.path(), "beanbot: nothing"));
    }
}
