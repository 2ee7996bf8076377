//! Git adapter for the test project.
//!
//! Commits in the project trigger the booster's hooks, so the wrapper keeps
//! each call explicit about whether failure is fatal.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use tracing::{debug, instrument};

use crate::io::process::{CommandResult, CommandRunner, CommandSpec};

/// Parsed `git status --porcelain` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// 2-letter XY code, or "??" for untracked.
    pub code: String,
    pub path: String,
}

/// Runs git commands in a working directory through a [`CommandRunner`].
#[derive(Debug)]
pub struct Git<'a, R: CommandRunner> {
    runner: &'a R,
    workdir: PathBuf,
}

impl<'a, R: CommandRunner> Git<'a, R> {
    pub fn new(runner: &'a R, workdir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn init(&self) -> Result<()> {
        self.run_checked(&["init"])?;
        Ok(())
    }

    /// Set a repository-local author identity.
    pub fn set_identity(&self, name: &str, email: &str) -> Result<()> {
        self.run_checked(&["config", "user.name", name])?;
        self.run_checked(&["config", "user.email", email])?;
        Ok(())
    }

    /// Checkout an existing branch; returns whether git accepted it.
    #[instrument(skip_all, fields(branch = %branch))]
    pub fn try_checkout(&self, branch: &str) -> Result<bool> {
        let result = self.run_lenient(&["checkout", branch])?;
        debug!(branch, ok = result.success(), "checkout attempted");
        Ok(result.success())
    }

    /// Checkout the first candidate branch that exists; `None` if none do.
    pub fn checkout_first<S: AsRef<str>>(&self, candidates: &[S]) -> Result<Option<String>> {
        for candidate in candidates {
            let candidate = candidate.as_ref();
            if self.try_checkout(candidate)? {
                return Ok(Some(candidate.to_string()));
            }
        }
        Ok(None)
    }

    /// Create and checkout a new branch at current HEAD.
    #[instrument(skip_all, fields(branch = %branch))]
    pub fn checkout_new_branch(&self, branch: &str) -> Result<()> {
        debug!(branch, "creating and checking out new branch");
        self.run_checked(&["checkout", "-b", branch])?;
        Ok(())
    }

    /// Force-delete a local branch; returns whether git accepted it.
    pub fn try_delete_branch(&self, branch: &str) -> Result<bool> {
        Ok(self.run_lenient(&["branch", "-D", branch])?.success())
    }

    pub fn add(&self, path: &str) -> Result<()> {
        self.run_checked(&["add", path])?;
        Ok(())
    }

    /// Stage all changes (respects .gitignore).
    pub fn add_all(&self) -> Result<()> {
        self.run_checked(&["add", "-A"])?;
        Ok(())
    }

    /// Remove `path` from the index, keeping the working-tree file.
    pub fn unstage(&self, path: &str) -> Result<()> {
        self.run_checked(&["reset", "-q", "--", path])?;
        Ok(())
    }

    /// Commit staged changes; any failure (including a hook veto) is an error.
    pub fn commit(&self, message: &str) -> Result<()> {
        self.run_checked(&["commit", "-m", message])?;
        Ok(())
    }

    /// Attempt a commit with extra environment; the caller judges the result.
    ///
    /// With `capture` false the hook output streams to the terminal.
    #[instrument(skip_all)]
    pub fn try_commit(
        &self,
        message: &str,
        env: &[(String, String)],
        capture: bool,
    ) -> Result<CommandResult> {
        let mut spec = self
            .spec(&["commit", "-m", message])
            .allow_failure()
            .envs(env.iter().cloned());
        if capture {
            spec = spec.capture();
        }
        let result = self.runner.run(&spec)?;
        debug!(exit_code = ?result.code, "commit attempted");
        Ok(result)
    }

    /// Full message of the last commit.
    pub fn last_commit_message(&self) -> Result<String> {
        self.run_capture(&["log", "-1", "--pretty=%B"])
    }

    /// `<short sha> <subject>` of the last commit.
    pub fn last_commit_summary(&self) -> Result<String> {
        Ok(self
            .run_capture(&["log", "-1", "--pretty=format:%h %s"])?
            .trim()
            .to_string())
    }

    /// Current HEAD sha, or `None` when the repository has no commits.
    pub fn head_sha(&self) -> Result<Option<String>> {
        let result = self.run_lenient(&["rev-parse", "--verify", "-q", "HEAD"])?;
        if !result.success() {
            return Ok(None);
        }
        Ok(Some(result.stdout.trim().to_string()))
    }

    /// Get status entries (including untracked) in porcelain format.
    pub fn status_porcelain(&self) -> Result<Vec<StatusEntry>> {
        let out = self.run_capture(&["status", "--porcelain=v1", "-uall"])?;
        let mut entries = Vec::new();
        for line in out.lines() {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(parse_status_line(line)?);
        }
        Ok(entries)
    }

    pub fn has_changes(&self) -> Result<bool> {
        Ok(!self.status_porcelain()?.is_empty())
    }

    fn spec(&self, args: &[&str]) -> CommandSpec {
        CommandSpec::new("git", args.iter().copied()).current_dir(&self.workdir)
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        Ok(self.runner.run(&self.spec(args).capture())?.stdout)
    }

    fn run_checked(&self, args: &[&str]) -> Result<CommandResult> {
        self.runner.run(&self.spec(args))
    }

    fn run_lenient(&self, args: &[&str]) -> Result<CommandResult> {
        self.runner.run(&self.spec(args).capture().allow_failure())
    }
}

fn parse_status_line(line: &str) -> Result<StatusEntry> {
    if let Some(path) = line.strip_prefix("?? ") {
        return Ok(StatusEntry {
            code: "??".to_string(),
            path: path.trim().to_string(),
        });
    }
    if line.len() < 4 {
        return Err(anyhow!("unexpected porcelain line: '{line}'"));
    }
    let code = line[..2].to_string();
    let mut path = line[3..].trim().to_string();
    if let Some((_, new)) = path.split_once("->") {
        path = new.trim().to_string();
    }
    Ok(StatusEntry { code, path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedRunner;

    #[test]
    fn parses_untracked_line() {
        let e = parse_status_line("?? test_commit.php").expect("parse");
        assert_eq!(
            e,
            StatusEntry {
                code: "??".to_string(),
                path: "test_commit.php".to_string()
            }
        );
    }

    #[test]
    fn parses_rename_line_uses_new_path() {
        let e = parse_status_line("R  old.php -> new.php").expect("parse");
        assert_eq!(e.path, "new.php");
    }

    #[test]
    fn checkout_first_tries_candidates_in_order() {
        let runner =
            ScriptedRunner::new().on("git checkout main", CommandResult::failed(1, "no main"));
        let git = Git::new(&runner, "/project");
        let chosen = git.checkout_first(&["main", "master"]).expect("checkout");
        assert_eq!(chosen.as_deref(), Some("master"));
        assert_eq!(
            runner.command_lines(),
            vec!["git checkout main", "git checkout master"]
        );
    }

    #[test]
    fn checkout_first_returns_none_when_all_fail() {
        let runner = ScriptedRunner::new().on("git checkout", CommandResult::failed(1, "nope"));
        let git = Git::new(&runner, "/project");
        assert_eq!(git.checkout_first(&["main", "master"]).expect("checkout"), None);
    }

    #[test]
    fn try_commit_passes_env_and_never_errors_on_veto() {
        let runner =
            ScriptedRunner::new().on("git commit", CommandResult::failed(1, "hook said no"));
        let git = Git::new(&runner, "/project");
        let env = vec![("SKIP_PHPSTAN".to_string(), "1".to_string())];
        let result = git.try_commit("add test", &env, true).expect("attempt");
        assert_eq!(result.code, Some(1));

        let specs = runner.specs();
        assert_eq!(specs[0].env.get("SKIP_PHPSTAN").map(String::as_str), Some("1"));
        assert_eq!(specs[0].workdir.as_deref(), Some(Path::new("/project")));
    }
}
