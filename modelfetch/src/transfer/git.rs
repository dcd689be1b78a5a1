//! Cloning custom node repositories.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use super::error::{TransferError, TransferResult};

/// Clones a repository into a destination directory.
pub trait RepositoryCloner: Send + Sync {
    /// Clone `repo_url` into `dest`, which must not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `ToolFailed` if the clone did not complete.
    fn clone_repo(&self, repo_url: &str, dest: &Path) -> TransferResult<()>;
}

/// Cloner backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCloner {
    program: String,
}

impl Default for GitCloner {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitCloner {
    /// Create a cloner that runs `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl RepositoryCloner for GitCloner {
    fn clone_repo(&self, repo_url: &str, dest: &Path) -> TransferResult<()> {
        debug!(repo = %repo_url, dest = %dest.display(), "Cloning repository");

        let output = Command::new(&self.program)
            .args(["clone", "--quiet"])
            .arg(repo_url)
            .arg(dest)
            // Never block on a credential prompt for private or missing repos.
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| TransferError::tool("git", format!("could not start: {}", e)))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = match stderr.trim() {
            "" => output.status.to_string(),
            message => message.to_string(),
        };
        Err(TransferError::tool("git", reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_program_is_tool_error() {
        let temp = TempDir::new().unwrap();
        let cloner = GitCloner::new("modelfetch-test-no-such-git");

        let err = cloner
            .clone_repo("https://github.com/acme/nodes", &temp.path().join("nodes"))
            .unwrap_err();

        match err {
            TransferError::ToolFailed { tool, reason } => {
                assert_eq!(tool, "git");
                assert!(reason.contains("could not start"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
