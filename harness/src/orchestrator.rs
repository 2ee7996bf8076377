//! Dispatch of named actions to the step implementations.

use anyhow::Result;
use clap::ValueEnum;
use tracing::{info, instrument};

use crate::clean::EnvironmentCleaner;
use crate::console::Console;
use crate::core::run_config::{Action, RunConfig};
use crate::env_check::EnvironmentChecker;
use crate::error::HarnessError;
use crate::hooks::HookAcceptanceTester;
use crate::integrate::{BoosterIntegrator, IntegrationMode};
use crate::interactive::InteractiveTester;
use crate::io::config::HarnessConfig;
use crate::io::process::CommandRunner;
use crate::provision::ProjectProvisioner;
use crate::status::show_status;
use crate::verify::IntegrationVerifier;

/// Name of the binary, used in follow-up hints.
pub const BIN_NAME: &str = "booster-test";

/// Runs one action against the environment described by a [`RunConfig`].
pub struct Orchestrator<'a, R: CommandRunner> {
    run: &'a RunConfig,
    config: &'a HarnessConfig,
    runner: &'a R,
    console: Console,
}

impl<'a, R: CommandRunner> Orchestrator<'a, R> {
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
            console,
        }
    }

    #[instrument(skip_all, fields(action = %action))]
    pub fn run(&self, action: Action) -> Result<()> {
        info!(target_dir = %self.run.target_dir.display(), "dispatching action");
        if action.requires_env_check() && action != Action::Full {
            self.env_check()?;
        }
        match action {
            Action::Full => self.run_full(),
            Action::EnvCheck => Ok(()),
            Action::Setup => self.provisioner().setup_project(),
            Action::SetupResume => self.provisioner().setup_resume(),
            Action::Integrate => self.integrate(IntegrationMode::Automated),
            Action::Verify => self.verifier().verify(),
            Action::TestHooks => self.hooks().test_branch_validation().map(|_| ()),
            Action::TestGithubActions => self.hooks().test_workflow_artifacts(),
            Action::TestInteractive => self.interactive().test_standalone(),
            Action::TestInteractiveProject => self.interactive().test_project(self.run.automated),
            Action::CleanInteractiveTest => self.interactive().clean(),
            Action::Clean => self.cleaner().clean(),
            Action::Status => {
                show_status(self.run, self.config, self.runner, self.console);
                Ok(())
            }
            Action::Help => {
                self.print_help();
                Ok(())
            }
        }
    }

    /// Complete lifecycle: check, set up, integrate, verify, exercise hooks and workflows.
    ///
    /// Stops at the first failing step.
    pub fn run_full(&self) -> Result<()> {
        self.env_check()?;
        self.provisioner().setup_project()?;
        self.integrate(IntegrationMode::Automated)?;
        self.verifier().verify()?;
        self.hooks().test_branch_validation()?;
        self.hooks().test_workflow_artifacts()?;

        let target = self.run.target_dir.display();
        self.console.success(format!(
            "Test completed successfully! Project is available at: {target}"
        ));
        self.console
            .info(format!("To clean up, run: {BIN_NAME} clean"));
        self.console
            .info(format!("To stop DDEV: cd {target} && ddev stop"));
        Ok(())
    }

    fn env_check(&self) -> Result<()> {
        let checker = EnvironmentChecker::new(self.config, self.runner, self.console);
        checker.show_environment();
        checker.check_requirements()
    }

    fn integrate(&self, mode: IntegrationMode) -> Result<()> {
        let integrator = BoosterIntegrator::new(self.run, self.config, self.runner, self.console);
        if !integrator.integrate(mode)? {
            return Err(HarnessError::assertion("Booster integration script failed").into());
        }
        Ok(())
    }

    fn print_help(&self) {
        self.console.info(format!(
            "Usage: {BIN_NAME} [action] [project_type] [project_name] [options]"
        ));
        self.console.info("Actions:");
        for action in Action::value_variants() {
            let help = action
                .to_possible_value()
                .and_then(|value| value.get_help().map(ToString::to_string))
                .unwrap_or_default();
            self.console.detail(format!("{:<26} {help}", action.name()));
        }
        self.console.info(format!("Run '{BIN_NAME} --help' for all options."));
    }

    fn provisioner(&self) -> ProjectProvisioner<'a, R> {
        ProjectProvisioner::new(self.run, self.config, self.runner, self.console)
    }

    fn verifier(&self) -> IntegrationVerifier<'a, R> {
        IntegrationVerifier::new(self.run, self.config, self.runner, self.console)
    }

    fn hooks(&self) -> HookAcceptanceTester<'a, R> {
        HookAcceptanceTester::new(self.run, self.config, self.runner, self.console)
    }

    fn interactive(&self) -> InteractiveTester<'a, R> {
        InteractiveTester::new(self.run, self.config, self.runner, self.console)
    }

    fn cleaner(&self) -> EnvironmentCleaner<'a, R> {
        EnvironmentCleaner::new(self.run, self.config, self.runner, self.console)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use crate::io::process::CommandResult;
    use crate::test_support::{ScriptedRunner, TempProject};

    fn ready_host() -> ScriptedRunner {
        ScriptedRunner::new()
            .with_available(&["ddev", "git"])
            .on("ddev version", CommandResult::ok("DDEV version v1.23.1\n"))
    }

    #[test]
    fn read_only_actions_skip_requirement_check() {
        let project = TempProject::new().expect("project");
        let config = HarnessConfig::default();
        let run = project.run_config();
        let runner = ScriptedRunner::new();
        let orchestrator = Orchestrator::new(&run, &config, &runner, Console::plain());
        orchestrator.run(Action::Help).expect("help");
        orchestrator.run(Action::CleanInteractiveTest).expect("clean interactive");
        assert!(runner.specs().is_empty());
    }

    #[test]
    fn mutating_actions_stop_when_requirements_fail() {
        let project = TempProject::new().expect("project");
        let config = HarnessConfig::default();
        let run = project.run_config();
        let runner = ScriptedRunner::new();
        let err = Orchestrator::new(&run, &config, &runner, Console::plain())
            .run(Action::Setup)
            .expect_err("tools missing");
        assert!(matches!(classify(&err), Some(HarnessError::Precondition(_))));
        assert!(!runner.ran("ddev config"));
    }

    #[test]
    fn env_check_runs_probes_only() {
        let project = TempProject::new().expect("project");
        let config = HarnessConfig::default();
        let run = project.run_config();
        let runner = ready_host();
        Orchestrator::new(&run, &config, &runner, Console::plain())
            .run(Action::EnvCheck)
            .expect("env check");
        assert_eq!(runner.command_lines(), vec!["docker version", "ddev version"]);
    }

    #[test]
    fn full_run_aborts_at_first_failing_step() {
        let project = TempProject::new().expect("project").with_composer().expect("composer");
        let config = HarnessConfig::default();
        let run = project.run_config();
        let runner = ready_host();
        let err = Orchestrator::new(&run, &config, &runner, Console::plain())
            .run(Action::Full)
            .expect_err("project exists");
        assert!(err.to_string().contains("already exists"));
        assert_eq!(runner.command_lines(), vec!["docker version", "ddev version"]);
    }

    #[test]
    fn full_run_stops_when_integration_fails() {
        let project = TempProject::new().expect("project");
        project
            .write_root("booster/integrate_booster.sh", "")
            .expect("script");
        let config = HarnessConfig::default();
        let run = project.run_config();
        let composer_target = project.path().to_path_buf();
        let runner = ready_host()
            .on_with("ddev composer create-project", CommandResult::ok(""), move |_| {
                std::fs::write(composer_target.join("composer.json"), "{}").expect("composer.json");
            })
            .on("ddev status", CommandResult::ok("Project: demo OK"))
            .on("bash", CommandResult::failed(1, ""));
        let err = Orchestrator::new(&run, &config, &runner, Console::plain())
            .run(Action::Full)
            .expect_err("integration failed");
        assert_eq!(
            classify(&err),
            Some(&HarnessError::Assertion("Booster integration script failed".into()))
        );
        assert!(runner.ran("git commit -m feat: initial commit with laravel framework"));
        assert!(!runner.ran("ddev composer show"));
    }
}
