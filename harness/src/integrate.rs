//! Running the booster's integration script against the test project.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, instrument};

use crate::console::Console;
use crate::core::run_config::RunConfig;
use crate::error::HarnessError;
use crate::io::config::{HarnessConfig, IntegrationConfig};
use crate::io::process::{CommandRunner, CommandSpec};
use crate::state::EnvironmentState;

/// How the integration script asks its questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationMode {
    /// Prompts on the terminal.
    Interactive,
    /// Uses defaults without prompting.
    Automated,
}

impl IntegrationMode {
    pub fn flag(self, config: &IntegrationConfig) -> &str {
        match self {
            IntegrationMode::Interactive => &config.interactive_flag,
            IntegrationMode::Automated => &config.automated_flag,
        }
    }
}

/// `BOOSTER_LOCAL_PATH` from the parent environment wins over `default`.
pub fn resolve_local_path(override_path: Option<OsString>, default: &Path) -> PathBuf {
    override_path
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| default.to_path_buf())
}

/// Environment that makes the integration script use the local booster tree.
pub fn local_dev_env(run: &RunConfig) -> Vec<(String, String)> {
    let local_path = resolve_local_path(env::var_os("BOOSTER_LOCAL_PATH"), &run.booster_dir());
    vec![
        ("BOOSTER_LOCAL_DEV".to_string(), "1".to_string()),
        (
            "BOOSTER_LOCAL_PATH".to_string(),
            local_path.display().to_string(),
        ),
    ]
}

pub struct BoosterIntegrator<'a, R: CommandRunner> {
    run: &'a RunConfig,
    config: &'a HarnessConfig,
    runner: &'a R,
    state: EnvironmentState<'a, R>,
    console: Console,
}

impl<'a, R: CommandRunner> BoosterIntegrator<'a, R> {
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

    /// Run the integration script in the project.
    ///
    /// Returns `Ok(false)` when the script itself fails; missing
    /// prerequisites are errors.
    #[instrument(skip_all, fields(mode = ?mode))]
    pub fn integrate(&self, mode: IntegrationMode) -> Result<bool> {
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
        if self.state.booster_integrated() {
            self.console
                .warn("Booster already appears to be integrated. Continuing anyway...");
        }

        let script = self.run.integration_script();
        if !script.is_file() {
            return Err(HarnessError::precondition(format!(
                "Integration script not found at {}",
                script.display()
            ))
            .into());
        }

        self.console.info("Integrating PHP Booster...");
        self.console.info("Using local integration script for testing");
        let spec = CommandSpec::new(
            "bash",
            [
                script.display().to_string(),
                mode.flag(&self.config.integration).to_string(),
            ],
        )
        .current_dir(target)
        .envs(local_dev_env(self.run))
        .allow_failure();
        let result = self.runner.run(&spec)?;
        debug!(exit_code = ?result.code, "integration script finished");

        if result.success() {
            self.console.success("Booster integration complete");
            Ok(true)
        } else {
            self.console.error(format!(
                "Booster integration failed (exit code {})",
                result
                    .code
                    .map_or_else(|| "none".to_string(), |code| code.to_string())
            ));
            Ok(false)
        }
    }
}
