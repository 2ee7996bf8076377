//! Acceptance tests for the git hooks and CI workflow files the booster installs.
//!
//! The branch test walks two paths from the default branch:
//!
//! ```text
//! OnDefaultBranch -> OnFeatureBranch{valid}   -> Accepted
//! OnDefaultBranch -> OnFeatureBranch{invalid} -> Rejected
//! ```
//!
//! A valid branch must be accepted and get a ticket footer appended; an
//! invalid one must be vetoed without moving HEAD. The harness returns to the
//! default branch after each path whatever its outcome.

use std::fs;
use std::io::ErrorKind;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::console::Console;
use crate::core::branch_policy::BranchPolicy;
use crate::core::run_config::RunConfig;
use crate::core::workflows::{ArtifactSource, check_workflow_artifacts};
use crate::error::HarnessError;
use crate::io::config::HarnessConfig;
use crate::io::git::Git;
use crate::io::process::{CommandResult, CommandRunner};
use crate::state::EnvironmentState;

pub const VALID_COMMIT_MESSAGE: &str = "feat: add test feature";
pub const INVALID_COMMIT_MESSAGE: &str = "add another test";
pub const ARTIFACTS_COMMIT_MESSAGE: &str = "chore: integrate php booster";

const VALID_FILE_CONTENTS: &str =
    "<?php\n// Test commit file for integration testing\necho \"Hello, World!\";\n";
const INVALID_FILE_CONTENTS: &str =
    "<?php\n// Another test commit file\necho \"Another test\";\n";

/// Branch used when the project does not require ticket ids.
const UNTICKETED_BRANCH: &str = "feature/test-feature";

/// One branch + commit attempt and what the hooks should do with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchScenario {
    pub branch_name: String,
    pub commit_message: String,
    pub file_name: String,
    pub file_contents: String,
    /// `<Label>: <Ticket>` line the commit-msg hook must append.
    pub expected_footer: Option<String>,
}

impl BranchScenario {
    /// Feature branch that satisfies `policy`, using `ticket_number`.
    pub fn valid(policy: &BranchPolicy, ticket_number: &str) -> Result<Self> {
        let branch_name = policy
            .sample_valid_branch(ticket_number)
            .unwrap_or_else(|| UNTICKETED_BRANCH.to_string());
        let expected_footer = policy.expected_footer(&branch_name)?;
        if policy.requires_ticket() && expected_footer.is_none() {
            return Err(HarnessError::precondition(format!(
                "ticket number '{ticket_number}' does not satisfy the branch policy"
            ))
            .into());
        }
        Ok(Self {
            branch_name,
            commit_message: VALID_COMMIT_MESSAGE.to_string(),
            file_name: "test_commit.php".to_string(),
            file_contents: VALID_FILE_CONTENTS.to_string(),
            expected_footer,
        })
    }

    /// Branch whose name the hooks must reject.
    pub fn invalid(branch_name: &str) -> Self {
        Self {
            branch_name: branch_name.to_string(),
            commit_message: INVALID_COMMIT_MESSAGE.to_string(),
            file_name: "test_commit2.php".to_string(),
            file_contents: INVALID_FILE_CONTENTS.to_string(),
            expected_footer: None,
        }
    }
}

/// Where the branch test currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookPhase {
    OnDefaultBranch,
    OnFeatureBranch { valid: bool },
    Accepted,
    Rejected,
}

/// Outcome of a completed branch-validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookReport {
    pub default_branch: String,
    /// Phases in the order they were entered.
    pub phases: Vec<HookPhase>,
}

/// Check that a commit expected to be vetoed was vetoed.
///
/// The commit must exit non-zero and HEAD must not have moved. A commit
/// killed without an exit code proves nothing and is reported as failed.
pub fn judge_rejection(
    result: &CommandResult,
    head_before: Option<&str>,
    head_after: Option<&str>,
) -> Result<(), HarnessError> {
    match result.code {
        Some(0) => Err(HarnessError::assertion("Invalid branch incorrectly accepted")),
        None => Err(HarnessError::CommandFailed {
            program: "git".to_string(),
            args: vec!["commit".to_string()],
            code: None,
        }),
        Some(_) if head_before != head_after => Err(HarnessError::assertion(format!(
            "Rejected commit still moved HEAD ({} -> {})",
            head_before.unwrap_or("none"),
            head_after.unwrap_or("none")
        ))),
        Some(_) => Ok(()),
    }
}

pub struct HookAcceptanceTester<'a, R: CommandRunner> {
    run: &'a RunConfig,
    config: &'a HarnessConfig,
    runner: &'a R,
    state: EnvironmentState<'a, R>,
    console: Console,
}

impl<'a, R: CommandRunner> HookAcceptanceTester<'a, R> {
    pub fn new(
        run: &'a RunConfig,
        config: &'a HarnessConfig,
        runner: &'a R,
        console: Console,
    ) -> Self {
        Self {
            run,
            config,
            runner,
            state: EnvironmentState::new(run, config, runner),
            console,
        }
    }

    /// Branch policy declared by the project, or the configured fallback.
    pub fn load_policy(&self) -> BranchPolicy {
        let policy = &self.config.policy;
        let fallback = || {
            BranchPolicy::new(
                &policy.footer_label,
                Some(policy.ticket_prefix.clone()),
                Some(policy.ticket_pattern.clone()),
            )
        };
        let path = self.run.target_dir.join(&policy.config_file);
        match fs::read_to_string(&path) {
            Ok(source) => match BranchPolicy::parse_config_source(&source) {
                Ok(parsed) => parsed,
                Err(err) => {
                    self.console.warn(format!(
                        "Could not parse {}: {err:#}. Using default branch policy.",
                        policy.config_file
                    ));
                    fallback()
                }
            },
            Err(err) => {
                debug!(path = %path.display(), err = %err, "branch policy file unreadable");
                fallback()
            }
        }
    }

    /// Commit on a valid and an invalid branch and check the hooks' verdicts.
    #[instrument(skip_all)]
    pub fn test_branch_validation(&self) -> Result<HookReport> {
        if !self.state.project_created() || !self.state.booster_integrated() {
            return Err(HarnessError::precondition(
                "Project not set up or booster not integrated. Run previous steps first.",
            )
            .into());
        }
        self.console.info("Testing branch validation...");

        let policy = self.load_policy();
        let valid = BranchScenario::valid(&policy, &self.config.hooks.ticket_number)?;
        let invalid = BranchScenario::invalid(&self.config.hooks.invalid_branch);
        let git = Git::new(self.runner, &self.run.target_dir);

        let mut phases = Vec::new();
        let default_branch = self.switch_to_default(&git)?;
        phases.push(HookPhase::OnDefaultBranch);

        for scenario in [&valid, &invalid] {
            if !git.try_delete_branch(&scenario.branch_name)? {
                debug!(branch = %scenario.branch_name, "no leftover test branch to delete");
            }
        }

        let outcome = self.run_valid_case(&git, &valid, &mut phases);
        self.return_to_default(&git, &default_branch, &mut phases);
        outcome?;

        let outcome = self.run_invalid_case(&git, &invalid, &mut phases);
        self.return_to_default(&git, &default_branch, &mut phases);
        outcome?;

        if self.config.hooks.commit_artifacts {
            self.commit_leftovers(&git)?;
        }

        Ok(HookReport {
            default_branch,
            phases,
        })
    }

    fn switch_to_default(&self, git: &Git<'_, R>) -> Result<String> {
        let candidates = &self.config.hooks.default_branches;
        git.checkout_first(candidates)?.ok_or_else(|| {
            HarnessError::precondition(format!(
                "Could not check out a default branch (tried {})",
                candidates.join(", ")
            ))
            .into()
        })
    }

    fn return_to_default(
        &self,
        git: &Git<'_, R>,
        default_branch: &str,
        phases: &mut Vec<HookPhase>,
    ) {
        match git.try_checkout(default_branch) {
            Ok(true) => phases.push(HookPhase::OnDefaultBranch),
            Ok(false) => self
                .console
                .warn(format!("Could not return to {default_branch}")),
            Err(err) => self
                .console
                .warn(format!("Could not return to {default_branch}: {err:#}")),
        }
    }

    fn stage_scenario_file(&self, git: &Git<'_, R>, scenario: &BranchScenario) -> Result<()> {
        let path = self.run.target_dir.join(&scenario.file_name);
        fs::write(&path, &scenario.file_contents)
            .with_context(|| format!("write {}", path.display()))?;
        self.console.info(format!("Created test file: {}", path.display()));
        git.add(&scenario.file_name)?;
        Ok(())
    }

    fn run_valid_case(
        &self,
        git: &Git<'_, R>,
        scenario: &BranchScenario,
        phases: &mut Vec<HookPhase>,
    ) -> Result<()> {
        git.checkout_new_branch(&scenario.branch_name)?;
        phases.push(HookPhase::OnFeatureBranch { valid: true });
        self.stage_scenario_file(git, scenario)?;

        let result = git.try_commit(&scenario.commit_message, &self.config.hooks.skip_env, false)?;
        if !result.success() {
            return Err(HarnessError::assertion(format!(
                "Commit on valid branch {} failed",
                scenario.branch_name
            ))
            .into());
        }
        phases.push(HookPhase::Accepted);
        self.console.success("Valid branch + commit message accepted");
        self.console
            .info(format!("Commit: {}", git.last_commit_summary()?));

        let Some(footer) = &scenario.expected_footer else {
            self.console
                .warn("Branch policy does not require ticket ids; skipping footer check");
            return Ok(());
        };
        let message = git.last_commit_message()?;
        if !message.contains(footer.as_str()) {
            return Err(HarnessError::assertion(format!(
                "Ticket footer not appended to commit message (expected '{footer}')"
            ))
            .into());
        }
        self.console.success("Ticket footer correctly appended");
        Ok(())
    }

    fn run_invalid_case(
        &self,
        git: &Git<'_, R>,
        scenario: &BranchScenario,
        phases: &mut Vec<HookPhase>,
    ) -> Result<()> {
        git.checkout_new_branch(&scenario.branch_name)?;
        phases.push(HookPhase::OnFeatureBranch { valid: false });
        self.stage_scenario_file(git, scenario)?;

        let head_before = git.head_sha()?;
        let result = git.try_commit(&scenario.commit_message, &self.config.hooks.skip_env, true)?;
        let head_after = git.head_sha()?;
        debug!(
            exit_code = ?result.code,
            stderr = %result.stderr.trim(),
            "invalid branch commit attempted"
        );
        judge_rejection(&result, head_before.as_deref(), head_after.as_deref())?;
        phases.push(HookPhase::Rejected);
        self.console.success("Invalid branch correctly rejected");

        git.unstage(&scenario.file_name)?;
        let path = self.run.target_dir.join(&scenario.file_name);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err).with_context(|| format!("remove {}", path.display())),
        }
        Ok(())
    }

    fn commit_leftovers(&self, git: &Git<'_, R>) -> Result<()> {
        if !git.has_changes()? {
            return Ok(());
        }
        self.console.info("Committing integration artifacts...");
        git.add_all()?;
        let result = git.try_commit(ARTIFACTS_COMMIT_MESSAGE, &self.config.hooks.skip_env, false)?;
        if result.success() {
            self.console.success("Integration artifacts committed");
        } else {
            self.console
                .warn("Could not commit integration artifacts; leaving them staged");
        }
        Ok(())
    }

    /// Check the workflow files and the reusable action shipped by the booster.
    #[instrument(skip_all)]
    pub fn test_workflow_artifacts(&self) -> Result<()> {
        if !self.state.project_created() {
            return Err(HarnessError::precondition(format!(
                "No project found at {}. Run 'setup' first.",
                self.run.target_dir.display()
            ))
            .into());
        }
        self.console.info("Testing GitHub Actions configuration...");

        let workflows = self
            .config
            .workflows
            .files
            .iter()
            .map(|file| self.read_artifact(file))
            .collect::<Result<Vec<_>>>()?;
        let action = self.read_artifact(&self.config.workflows.action)?;

        let problems = check_workflow_artifacts(&workflows, &action);
        if problems.is_empty() {
            self.console.success("GitHub Actions configuration is valid");
            return Ok(());
        }
        for problem in &problems {
            self.console.error(problem);
        }
        Err(HarnessError::assertion(format!(
            "GitHub Actions configuration has {} problem(s): {}",
            problems.len(),
            problems.join("; ")
        ))
        .into())
    }

    fn read_artifact(&self, relative: &str) -> Result<ArtifactSource> {
        let path = self.run.target_dir.join(relative);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
        };
        Ok(ArtifactSource::new(relative, contents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use crate::test_support::{ScriptedRunner, TempProject};

    fn prj_policy() -> BranchPolicy {
        BranchPolicy::new("Closes", Some("PRJ".into()), Some("[0-9]+".into()))
    }

    #[test]
    fn valid_scenario_expects_footer() {
        let scenario = BranchScenario::valid(&prj_policy(), "123").expect("scenario");
        assert_eq!(scenario.branch_name, "feature/PRJ-123-test-feature");
        assert_eq!(scenario.expected_footer.as_deref(), Some("Closes: PRJ-123"));
        assert_eq!(scenario.commit_message, VALID_COMMIT_MESSAGE);
    }

    #[test]
    fn valid_scenario_without_ticket_policy_has_no_footer() {
        let policy = BranchPolicy::new("Closes", None, None);
        let scenario = BranchScenario::valid(&policy, "123").expect("scenario");
        assert_eq!(scenario.branch_name, UNTICKETED_BRANCH);
        assert_eq!(scenario.expected_footer, None);
    }

    #[test]
    fn ticket_number_must_fit_pattern() {
        let policy = BranchPolicy::new("Closes", Some("PRJ".into()), Some("[A-Z]{3}".into()));
        assert!(BranchScenario::valid(&policy, "123").is_err());
    }

    #[test]
    fn rejection_requires_non_zero_exit() {
        let accepted = CommandResult::ok("");
        assert_eq!(
            judge_rejection(&accepted, Some("abc"), Some("def")),
            Err(HarnessError::assertion("Invalid branch incorrectly accepted"))
        );
        let vetoed = CommandResult::failed(1, "invalid branch name");
        assert_eq!(judge_rejection(&vetoed, Some("abc"), Some("abc")), Ok(()));
    }

    #[test]
    fn rejection_with_moved_head_fails() {
        let vetoed = CommandResult::failed(1, "");
        let err = judge_rejection(&vetoed, Some("abc"), Some("def")).expect_err("moved");
        assert!(err.to_string().contains("moved HEAD"));
    }

    #[test]
    fn killed_commit_is_not_a_rejection() {
        let killed = CommandResult::default();
        assert!(matches!(
            judge_rejection(&killed, Some("abc"), Some("abc")),
            Err(HarnessError::CommandFailed { code: None, .. })
        ));
    }

    #[test]
    fn requires_integrated_project() {
        let project = TempProject::new().expect("project").with_composer().expect("composer");
        let config = HarnessConfig::default();
        let run = project.run_config();
        let runner = ScriptedRunner::new();
        let err = HookAcceptanceTester::new(&run, &config, &runner, Console::plain())
            .test_branch_validation()
            .expect_err("not integrated");
        assert!(matches!(classify(&err), Some(HarnessError::Precondition(_))));
        assert!(runner.specs().is_empty());
    }

    #[test]
    fn missing_default_branch_is_a_precondition() {
        let project = TempProject::new().expect("project").with_composer().expect("composer");
        project.write(".booster-version", "1.0.0").expect("stamp");
        let config = HarnessConfig::default();
        let run = project.run_config();
        let runner = ScriptedRunner::new().on("git checkout", CommandResult::failed(1, ""));
        let err = HookAcceptanceTester::new(&run, &config, &runner, Console::plain())
            .test_branch_validation()
            .expect_err("no default branch");
        assert!(err.to_string().contains("main, master"));
    }

    #[test]
    fn policy_comes_from_project_file() {
        let project = TempProject::new().expect("project");
        project
            .write(
                "validate-branch-name.config.cjs",
                "const config = { ticketIdPrefix: 'ERM', ticketNumberPattern: '[0-9]+', \
                 commitFooterLabel: 'Refs' };",
            )
            .expect("write");
        let config = HarnessConfig::default();
        let run = project.run_config();
        let runner = ScriptedRunner::new();
        let policy =
            HookAcceptanceTester::new(&run, &config, &runner, Console::plain()).load_policy();
        assert_eq!(policy.ticket_prefix.as_deref(), Some("ERM"));
        assert_eq!(policy.footer_label, "Refs");
    }

    #[test]
    fn policy_falls_back_to_config() {
        let project = TempProject::new().expect("project");
        let config = HarnessConfig::default();
        let run = project.run_config();
        let runner = ScriptedRunner::new();
        let policy =
            HookAcceptanceTester::new(&run, &config, &runner, Console::plain()).load_policy();
        assert_eq!(policy, prj_policy());
    }

    const WORKFLOW: &str = "on: push
jobs:
  qa:
    runs-on: ubuntu-latest
    steps:
      - uses: ./.github/actions/php
";
    const ACTION: &str = "name: PHP\nruns:\n  using: composite\n  steps: []\n";

    #[test]
    fn workflow_artifacts_pass_when_valid() {
        let project = TempProject::new().expect("project").with_composer().expect("composer");
        project.write(".github/workflows/php.yml", WORKFLOW).expect("workflow");
        project.write(".github/actions/php/action.yml", ACTION).expect("action");
        let config = HarnessConfig::default();
        let run = project.run_config();
        let runner = ScriptedRunner::new();
        HookAcceptanceTester::new(&run, &config, &runner, Console::plain())
            .test_workflow_artifacts()
            .expect("valid");
    }

    #[test]
    fn workflow_problems_are_collected() {
        let project = TempProject::new().expect("project").with_composer().expect("composer");
        let config = HarnessConfig::default();
        let run = project.run_config();
        let runner = ScriptedRunner::new();
        let err = HookAcceptanceTester::new(&run, &config, &runner, Console::plain())
            .test_workflow_artifacts()
            .expect_err("missing files");
        let message = err.to_string();
        assert!(message.contains("2 problem(s)"));
        assert!(message.contains(".github/workflows/php.yml: file is missing"));
        assert!(message.contains(".github/actions/php/action.yml: file is missing"));
    }
}
