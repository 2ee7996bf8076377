//! Teardown of the test project and its runtime.

use std::fs;

use anyhow::{Context, Result};
use tracing::instrument;

use crate::console::Console;
use crate::core::run_config::RunConfig;
use crate::io::config::HarnessConfig;
use crate::io::process::{CommandRunner, CommandSpec};
use crate::state::EnvironmentState;

pub struct EnvironmentCleaner<'a, R: CommandRunner> {
    run: &'a RunConfig,
    runner: &'a R,
    state: EnvironmentState<'a, R>,
    console: Console,
}

impl<'a, R: CommandRunner> EnvironmentCleaner<'a, R> {
    pub fn new(
        run: &'a RunConfig,
        config: &'a HarnessConfig,
        runner: &'a R,
        console: Console,
    ) -> Self {
        Self {
            run,
            runner,
            state: EnvironmentState::new(run, config, runner),
            console,
        }
    }

    /// Stop and delete the runtime (best effort), then remove the project directory.
    #[instrument(skip_all)]
    pub fn clean(&self) -> Result<()> {
        let target = &self.run.target_dir;
        self.console
            .info(format!("Cleaning up test environment at {}", target.display()));
        if !target.exists() {
            self.console
                .info(format!("No test environment found at {}", target.display()));
            return Ok(());
        }

        if self.state.runtime_up() {
            self.console.info("Stopping DDEV project...");
            self.best_effort(&["stop"]);
            self.best_effort(&["delete", "--omit-snapshot", "--yes"]);
        }

        self.console.info("Removing project directory...");
        fs::remove_dir_all(target).with_context(|| format!("remove {}", target.display()))?;
        self.console.success("Test environment cleaned up");
        Ok(())
    }

    fn best_effort(&self, args: &[&str]) {
        let spec = CommandSpec::new("ddev", args.iter().copied())
            .current_dir(&self.run.target_dir)
            .allow_failure();
        match self.runner.run(&spec) {
            Ok(result) if result.success() => {}
            Ok(result) => self.console.warn(format!(
                "'{spec}' failed (exit code {}); continuing",
                result
                    .code
                    .map_or_else(|| "none".to_string(), |code| code.to_string())
            )),
            Err(err) => self.console.warn(format!("'{spec}' failed: {err:#}; continuing")),
        }
    }
}
