//! Post-integration checks on the test project.

use std::fs;
use std::io::ErrorKind;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::console::Console;
use crate::core::manifest::missing_entries;
use crate::core::renovate::check_renovate_config;
use crate::core::run_config::RunConfig;
use crate::error::HarnessError;
use crate::io::config::HarnessConfig;
use crate::io::process::{CommandRunner, CommandSpec};
use crate::state::EnvironmentState;

/// Lines of `ddev composer show` echoed as a diagnostic.
const PACKAGE_PREVIEW_LINES: usize = 10;

pub struct IntegrationVerifier<'a, R: CommandRunner> {
    run: &'a RunConfig,
    config: &'a HarnessConfig,
    runner: &'a R,
    state: EnvironmentState<'a, R>,
    console: Console,
}

impl<'a, R: CommandRunner> IntegrationVerifier<'a, R> {
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

    /// Verify artifacts, tooling and `renovate.json` of an integrated project.
    #[instrument(skip_all)]
    pub fn verify(&self) -> Result<()> {
        let target = &self.run.target_dir;
        if !self.state.project_created() {
            return Err(HarnessError::precondition(format!(
                "No project found at {}. Run 'setup' first.",
                target.display()
            ))
            .into());
        }
        if !self.state.runtime_up() {
            return Err(
                HarnessError::precondition("DDEV not running. Run 'setup-resume' first.").into(),
            );
        }

        self.console.info("Verifying integration...");
        self.check_manifest()?;
        self.list_packages();
        self.check_ecs()?;
        self.log_php_version();
        self.check_renovate()?;

        self.console.success("Integration verification passed!");
        Ok(())
    }

    fn check_manifest(&self) -> Result<()> {
        let target = &self.run.target_dir;
        let missing = missing_entries(&self.config.expected_artifacts, |entry| {
            target.join(entry).exists()
        });
        if missing.is_empty() {
            self.console.success("All expected files are present");
            return Ok(());
        }
        self.console
            .warn(format!("Missing expected files: {}", missing.join(", ")));
        Err(HarnessError::assertion(format!(
            "Some expected files are missing. Integration may be incomplete: {}",
            missing.join(", ")
        ))
        .into())
    }

    fn ddev(&self, args: &[&str]) -> CommandSpec {
        CommandSpec::new("ddev", args.iter().copied())
            .current_dir(&self.run.target_dir)
            .capture()
    }

    /// Informational. Unlike [`Self::check_ecs`], a failure only warns.
    fn list_packages(&self) {
        self.console.info("Checking composer packages and tools...");
        match self.runner.run(&self.ddev(&["composer", "show"]).allow_failure()) {
            Ok(result) if result.success() => {
                for line in result.stdout.trim().lines().take(PACKAGE_PREVIEW_LINES) {
                    self.console.detail(line);
                }
                self.console
                    .info(format!("... (showing first {PACKAGE_PREVIEW_LINES} packages)"));
            }
            Ok(result) => self.console.warn(format!(
                "Could not list composer packages: {}",
                result.stderr.trim()
            )),
            Err(err) => self.console.warn(format!("Could not list composer packages: {err:#}")),
        }
    }

    fn check_ecs(&self) -> Result<()> {
        let result = self
            .runner
            .run(&self.ddev(&["composer", "ecs", "--version"]).allow_failure())?;
        if !result.success() {
            debug!(stderr = %result.stderr, "ecs probe failed");
            return Err(
                HarnessError::assertion("ECS command not working through DDEV").into(),
            );
        }
        self.console.success("ECS is working through DDEV");
        Ok(())
    }

    /// Informational like [`Self::list_packages`]; the PHP version is never asserted.
    fn log_php_version(&self) {
        match self.runner.run(&self.ddev(&["exec", "php", "-v"]).allow_failure()) {
            Ok(result) if result.success() => self
                .console
                .info(format!("PHP version in DDEV: {}", result.first_line())),
            Ok(_) | Err(_) => self.console.warn("Could not determine PHP version in DDEV"),
        }
    }

    fn check_renovate(&self) -> Result<()> {
        let path = self.run.target_dir.join(&self.config.renovate.path);
        let source = match fs::read_to_string(&path) {
            Ok(source) => source,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(HarnessError::assertion(format!(
                    "{} not found",
                    self.config.renovate.path
                ))
                .into());
            }
            Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
        };
        let report = check_renovate_config(&source, &self.config.renovate.language_group)
            .map_err(|err| {
                HarnessError::assertion(format!(
                    "Invalid JSON in {}: {err}",
                    self.config.renovate.path
                ))
            })?;
        for warning in &report.warnings {
            self.console.warn(warning);
        }
        if report.is_clean() {
            self.console.success("renovate.json configuration is valid");
        }
        Ok(())
    }
}
