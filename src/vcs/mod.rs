//! Jujutsu (jj) gateway
//!
//! All VCS access goes through the `jj` executable invoked as a subprocess.
//! The gateway captures stdout for read-style calls and surfaces non-zero
//! exits as [`RippleError::ExternalTool`] carrying the captured stderr. It
//! holds no business logic; sequencing lives in the engine.

use crate::errors::{Result, RippleError};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Base revision for a freshly created change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewChangeBase<'a> {
    /// Base-level block: merge of the working copy and the stack's
    /// target bookmark (`jj new @ <bookmark>`).
    Target(&'a str),
    /// Mid-stack block: child of the predecessor's change.
    Change(&'a str),
}

/// The jj subcommands the engine sequences. Implemented by [`JjVcs`] for
/// real repositories and by scripted fakes in tests.
pub trait VcsGateway {
    /// Change id of the working-copy change, re-queried on every call.
    fn current_change_id(&self) -> Result<String>;

    /// `jj git fetch`
    fn fetch(&self) -> Result<()>;

    /// Create a new change on the given base with the given description.
    fn new_change(&self, base: NewChangeBase<'_>, message: &str) -> Result<()>;

    /// `jj describe <change> -m <message>`
    fn describe(&self, change_id: &str, message: &str) -> Result<()>;

    /// `jj edit <change>` — make the change current.
    fn edit(&self, change_id: &str) -> Result<()>;

    /// `jj bookmark create <name> -r <change>`
    fn create_bookmark(&self, name: &str, change_id: &str) -> Result<()>;

    /// `jj git push -b <name>`, with `--allow-new` on first submission.
    fn push_bookmark(&self, name: &str, allow_new: bool) -> Result<()>;

    /// `jj bookmark delete <name>`
    fn delete_bookmark(&self, name: &str) -> Result<()>;

    /// `jj rebase -s <change> -d <destination>`
    fn rebase(&self, change_id: &str, destination: &str) -> Result<()>;

    /// `jj abandon <change>`
    fn abandon(&self, change_id: &str) -> Result<()>;
}

/// Gateway to a real jj working copy rooted at `repo_root`.
pub struct JjVcs {
    repo_root: PathBuf,
}

impl JjVcs {
    pub fn new(repo_root: PathBuf) -> Self {
        Self { repo_root }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Run `jj` with the given argument vector and return captured stdout.
    fn run(&self, args: &[&str]) -> Result<String> {
        debug!("jj {}", args.join(" "));

        let output = Command::new("jj")
            .args(args)
            .current_dir(&self.repo_root)
            .output()
            .map_err(|e| {
                RippleError::external_tool(format!("jj {}", args.join(" ")), e.to_string())
            })?;

        if !output.status.success() {
            return Err(RippleError::external_tool(
                format!("jj {}", args.join(" ")),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl VcsGateway for JjVcs {
    fn current_change_id(&self) -> Result<String> {
        let stdout = self.run(&["show", "--template", "change_id ++ \" \""])?;
        parse_change_id(&stdout).ok_or_else(|| {
            RippleError::external_tool(
                "jj show --template".to_string(),
                "no change id in output".to_string(),
            )
        })
    }

    fn fetch(&self) -> Result<()> {
        self.run(&["git", "fetch"]).map(|_| ())
    }

    fn new_change(&self, base: NewChangeBase<'_>, message: &str) -> Result<()> {
        match base {
            NewChangeBase::Target(bookmark) => {
                self.run(&["new", "@", bookmark, "-m", message]).map(|_| ())
            }
            NewChangeBase::Change(change_id) => {
                self.run(&["new", change_id, "-m", message]).map(|_| ())
            }
        }
    }

    fn describe(&self, change_id: &str, message: &str) -> Result<()> {
        self.run(&["describe", change_id, "-m", message]).map(|_| ())
    }

    fn edit(&self, change_id: &str) -> Result<()> {
        self.run(&["edit", change_id]).map(|_| ())
    }

    fn create_bookmark(&self, name: &str, change_id: &str) -> Result<()> {
        self.run(&["bookmark", "create", name, "-r", change_id])
            .map(|_| ())
    }

    fn push_bookmark(&self, name: &str, allow_new: bool) -> Result<()> {
        if allow_new {
            self.run(&["git", "push", "-b", name, "--allow-new"]).map(|_| ())
        } else {
            self.run(&["git", "push", "-b", name]).map(|_| ())
        }
    }

    fn delete_bookmark(&self, name: &str) -> Result<()> {
        self.run(&["bookmark", "delete", name]).map(|_| ())
    }

    fn rebase(&self, change_id: &str, destination: &str) -> Result<()> {
        self.run(&["rebase", "-s", change_id, "-d", destination])
            .map(|_| ())
    }

    fn abandon(&self, change_id: &str) -> Result<()> {
        self.run(&["abandon", change_id]).map(|_| ())
    }
}

/// First whitespace-separated token of the `change_id ++ " "` template output.
fn parse_change_id(stdout: &str) -> Option<String> {
    stdout
        .split_whitespace()
        .next()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Check if a directory is a jj repository
pub fn is_jj_repository(path: &Path) -> bool {
    path.join(".jj").is_dir()
}

/// Find the root of the jj repository by walking up from `start_path`
pub fn find_repository_root(start_path: &Path) -> Result<PathBuf> {
    let mut current = Some(start_path);
    while let Some(dir) = current {
        if is_jj_repository(dir) {
            return Ok(dir.to_path_buf());
        }
        current = dir.parent();
    }
    Err(RippleError::config(format!(
        "Not in a jj repository: {}",
        start_path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_change_id() {
        assert_eq!(
            parse_change_id("qpvuntsmwlqt fb21d0ac\n"),
            Some("qpvuntsmwlqt".to_string())
        );
        assert_eq!(
            parse_change_id("  qpvuntsmwlqt "),
            Some("qpvuntsmwlqt".to_string())
        );
        assert_eq!(parse_change_id(""), None);
        assert_eq!(parse_change_id("   \n"), None);
    }

    #[test]
    fn test_find_repository_root_direct() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join(".jj")).unwrap();

        let root = find_repository_root(tmp.path()).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn test_find_repository_root_from_subdirectory() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join(".jj")).unwrap();
        let nested = tmp.path().join("src").join("deep");
        fs::create_dir_all(&nested).unwrap();

        let root = find_repository_root(&nested).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn test_find_repository_root_not_a_repo() {
        let tmp = TempDir::new().unwrap();
        assert!(find_repository_root(tmp.path()).is_err());
    }
}
