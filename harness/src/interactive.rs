//! Interactive-mode checks of the integration script.
//!
//! The standalone test runs the script in an empty scratch directory and
//! answers its prompts from a fixed list, so no framework project is needed.

use std::fs;
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::console::Console;
use crate::core::manifest::missing_entries;
use crate::core::run_config::RunConfig;
use crate::error::HarnessError;
use crate::integrate::{BoosterIntegrator, IntegrationMode, local_dev_env};
use crate::interrupt;
use crate::io::config::HarnessConfig;
use crate::io::process::{CommandRunner, CommandSpec};
use crate::state::EnvironmentState;

/// Scripted answers as stdin payload, one per line.
pub fn answers_input<S: AsRef<str>>(answers: &[S]) -> String {
    let mut input = answers
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n");
    input.push('\n');
    input
}

/// Last `count` lines of `output`.
fn tail_lines(output: &str, count: usize) -> Vec<&str> {
    let lines: Vec<&str> = output.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].to_vec()
}

pub struct InteractiveTester<'a, R: CommandRunner> {
    run: &'a RunConfig,
    config: &'a HarnessConfig,
    runner: &'a R,
    state: EnvironmentState<'a, R>,
    console: Console,
}

impl<'a, R: CommandRunner> InteractiveTester<'a, R> {
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

    /// Run the script with scripted answers in the scratch directory.
    #[instrument(skip_all)]
    pub fn test_standalone(&self) -> Result<()> {
        self.console.info("Standalone Interactive Mode Test");
        let script = self.run.integration_script();
        if !script.is_file() {
            return Err(HarnessError::precondition(format!(
                "Booster script not found at: {}",
                script.display()
            ))
            .into());
        }
        self.console
            .info(format!("Found booster script at: {}", script.display()));

        let dir = self.run.interactive_test_dir();
        if !dir.exists() {
            self.console
                .info(format!("Creating test directory: {}", dir.display()));
            fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        }

        let interactive = &self.config.interactive;
        self.console
            .info("Running integration script with interactive flag and simulated input");
        self.console
            .info(format!("Working directory: {}", dir.display()));
        let spec = CommandSpec::new(
            "bash",
            [
                script.display().to_string(),
                self.config.integration.interactive_flag.clone(),
                "-v".to_string(),
            ],
        )
        .current_dir(&dir)
        .envs(local_dev_env(self.run))
        .stdin(answers_input(&interactive.answers))
        .capture()
        .allow_failure();
        let result = self.runner.run(&spec)?;
        debug!(exit_code = ?result.code, "interactive script finished");

        if !result.stdout.trim().is_empty() {
            self.console.info("Integration script output (truncated):");
            for line in tail_lines(&result.stdout, interactive.output_tail_lines) {
                self.console.info(line);
            }
        }
        if !result.stderr.trim().is_empty() {
            self.console.warn("Integration script errors:");
            for line in result.stderr.lines() {
                self.console.warn(line);
            }
        }

        let missing = missing_entries(&interactive.expected_files, |entry| {
            dir.join(entry).exists()
        });
        if !missing.is_empty() {
            self.console
                .error("The following expected files were not created:");
            for file in &missing {
                self.console.error(format!("  - {file}"));
            }
            return Err(HarnessError::assertion(format!(
                "Expected files not created: {}",
                missing.join(", ")
            ))
            .into());
        }

        let branch_config = dir.join(&self.config.policy.config_file);
        if branch_config.is_file() {
            let contents = fs::read_to_string(&branch_config)
                .with_context(|| format!("read {}", branch_config.display()))?;
            if !contents.contains(&interactive.expected_branch_marker) {
                return Err(HarnessError::assertion(format!(
                    "Ticket prefix '{}' not found in branch validation config",
                    interactive.expected_branch_marker
                ))
                .into());
            }
            self.console
                .success("Branch validation config contains correct ticket prefix.");
        }

        if !result.success() {
            return Err(HarnessError::assertion(format!(
                "Standalone interactive test failed with exit code: {}",
                result
                    .code
                    .map_or_else(|| "none".to_string(), |code| code.to_string())
            ))
            .into());
        }
        self.console
            .success("Standalone interactive test completed successfully!");
        Ok(())
    }

    /// Integrate the existing project, prompting the user unless `automated`.
    #[instrument(skip_all, fields(automated = automated))]
    pub fn test_project(&self, automated: bool) -> Result<()> {
        if !self.state.project_created() {
            return Err(HarnessError::precondition(format!(
                "Project not found. Please run setup first: booster-test setup {} {}",
                self.run.project_type, self.run.project_name
            ))
            .into());
        }
        if !self.state.runtime_up() {
            return Err(HarnessError::precondition(format!(
                "DDEV not running. Please start it first: cd {} && ddev start",
                self.run.target_dir.display()
            ))
            .into());
        }
        self.console.info("Project found and DDEV is running");

        let mode = if automated {
            self.console.info("Running in AUTOMATED mode...");
            IntegrationMode::Automated
        } else {
            self.console.info("Running in INTERACTIVE mode...");
            self.console
                .warn("You will be prompted for configuration options");
            wait_for_enter()?;
            interrupt::check()?;
            IntegrationMode::Interactive
        };

        let integrated = BoosterIntegrator::new(self.run, self.config, self.runner, self.console)
            .integrate(mode)?;
        if !integrated {
            return Err(HarnessError::assertion("Interactive mode test failed!").into());
        }
        self.console
            .success("Interactive mode test completed successfully!");
        Ok(())
    }

    /// Remove the scratch directory; absence only warns.
    pub fn clean(&self) -> Result<()> {
        let dir = self.run.interactive_test_dir();
        if !dir.exists() {
            self.console.warn("No test directory found. Nothing to clean up.");
            return Ok(());
        }
        fs::remove_dir_all(&dir).with_context(|| format!("remove {}", dir.display()))?;
        self.console.success("Test directory cleaned up successfully.");
        Ok(())
    }
}

fn wait_for_enter() -> Result<()> {
    print!("Press Enter to continue...");
    io::stdout().flush().context("flush stdout")?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read confirmation")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::core::manifest::DEFAULT_INTERACTIVE_ARTIFACTS;
    use crate::error::classify;
    use crate::io::process::CommandResult;
    use crate::test_support::{ScriptedRunner, TempProject, ddev_running};

    fn project_with_script() -> TempProject {
        let project = TempProject::new().expect("project");
        project
            .write_root("booster/integrate_booster.sh", "#!/bin/bash\n")
            .expect("script");
        project
    }

    fn write_generated_files(dir: &Path, branch_config: &str) {
        for entry in DEFAULT_INTERACTIVE_ARTIFACTS {
            let path = dir.join(entry);
            fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            fs::write(&path, "").expect("write");
        }
        fs::write(dir.join("validate-branch-name.config.cjs"), branch_config).expect("write");
    }

    #[test]
    fn answers_are_newline_terminated() {
        assert_eq!(answers_input(&["y", "y", "PRJ", "", "y", "y"]), "y\ny\nPRJ\n\ny\ny\n");
    }

    #[test]
    fn tail_keeps_last_lines() {
        assert_eq!(tail_lines("a\nb\nc\n", 2), vec!["b", "c"]);
        assert_eq!(tail_lines("a\n", 20), vec!["a"]);
    }

    #[test]
    fn standalone_feeds_answers_and_checks_files() {
        let project = project_with_script();
        let config = HarnessConfig::default();
        let run = project.run_config();
        let runner = ScriptedRunner::new().on_with("bash", CommandResult::ok("done\n"), |spec| {
            let dir = spec.workdir.clone().expect("workdir");
            write_generated_files(&dir, "ticketIdPrefix: 'PRJ', example: 'feature/PRJ-123'");
        });

        InteractiveTester::new(&run, &config, &runner, Console::plain())
            .test_standalone()
            .expect("standalone");

        let spec = &runner.specs()[0];
        assert_eq!(spec.args[1..], ["-I".to_string(), "-v".to_string()]);
        assert_eq!(spec.stdin.as_deref(), Some("y\ny\nPRJ\n\ny\ny\n"));
        assert_eq!(spec.workdir.as_deref(), Some(run.interactive_test_dir().as_path()));
        assert!(spec.capture);
    }

    #[test]
    fn standalone_lists_every_missing_file() {
        let project = project_with_script();
        let config = HarnessConfig::default();
        let run = project.run_config();
        let runner = ScriptedRunner::new();
        let err = InteractiveTester::new(&run, &config, &runner, Console::plain())
            .test_standalone()
            .expect_err("nothing generated");
        let message = err.to_string();
        for entry in DEFAULT_INTERACTIVE_ARTIFACTS {
            assert!(message.contains(entry), "{entry} not reported");
        }
    }

    #[test]
    fn standalone_requires_ticket_prefix_in_branch_config() {
        let project = project_with_script();
        let config = HarnessConfig::default();
        let run = project.run_config();
        let runner = ScriptedRunner::new().on_with("bash", CommandResult::ok(""), |spec| {
            let dir = spec.workdir.clone().expect("workdir");
            write_generated_files(&dir, "const config = {};");
        });
        let err = InteractiveTester::new(&run, &config, &runner, Console::plain())
            .test_standalone()
            .expect_err("no prefix");
        assert!(err.to_string().contains("Ticket prefix 'PRJ-'"));
    }

    #[test]
    fn standalone_fails_on_non_zero_exit() {
        let project = project_with_script();
        let config = HarnessConfig::default();
        let run = project.run_config();
        let runner =
            ScriptedRunner::new().on_with("bash", CommandResult::failed(3, "boom"), |spec| {
                let dir = spec.workdir.clone().expect("workdir");
                write_generated_files(&dir, "PRJ-123");
            });
        let err = InteractiveTester::new(&run, &config, &runner, Console::plain())
            .test_standalone()
            .expect_err("exit 3");
        assert!(err.to_string().ends_with("exit code: 3"));
    }

    #[test]
    fn automated_project_run_delegates_to_integration() {
        let project = TempProject::new().expect("project").with_composer().expect("composer");
        project
            .write_root("booster/integrate_booster.sh", "")
            .expect("script");
        let config = HarnessConfig::default();
        let run = project.run_config();
        let runner = ScriptedRunner::new()
            .on("ddev status", ddev_running())
            .on("bash", CommandResult::failed(1, ""));
        let err = InteractiveTester::new(&run, &config, &runner, Console::plain())
            .test_project(true)
            .expect_err("integration failed");
        assert!(matches!(classify(&err), Some(HarnessError::Assertion(_))));
        assert!(runner.command_lines().last().expect("bash").ends_with(" -N"));
    }

    #[test]
    fn clean_is_tolerant_of_missing_directory() {
        let project = TempProject::new().expect("project");
        let config = HarnessConfig::default();
        let run = project.run_config();
        let runner = ScriptedRunner::new();
        let tester = InteractiveTester::new(&run, &config, &runner, Console::plain());
        tester.clean().expect("nothing to clean");

        fs::create_dir_all(run.interactive_test_dir().join("nested")).expect("mkdir");
        tester.clean().expect("clean");
        assert!(!run.interactive_test_dir().exists());
    }
}
