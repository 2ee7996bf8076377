//! Observed state of the test environment.
//!
//! Nothing here is cached: every predicate looks at the filesystem or asks
//! ddev again, because other steps (and the user) mutate the project between
//! calls.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::core::run_config::RunConfig;
use crate::core::runtime_status::indicates_running;
use crate::io::config::HarnessConfig;
use crate::io::process::{CommandRunner, CommandSpec};

/// Re-probing view of the project described by a [`RunConfig`].
#[derive(Debug)]
pub struct EnvironmentState<'a, R: CommandRunner> {
    run: &'a RunConfig,
    config: &'a HarnessConfig,
    runner: &'a R,
}

impl<'a, R: CommandRunner> EnvironmentState<'a, R> {
    pub fn new(run: &'a RunConfig, config: &'a HarnessConfig, runner: &'a R) -> Self {
        Self {
            run,
            config,
            runner,
        }
    }

    fn target(&self) -> &Path {
        &self.run.target_dir
    }

    /// The target directory holds a composer project.
    pub fn project_created(&self) -> bool {
        self.target().is_dir() && self.target().join("composer.json").is_file()
    }

    /// ddev reports at least one running service for the project.
    pub fn runtime_up(&self) -> bool {
        if !self.target().is_dir() {
            return false;
        }
        let spec = CommandSpec::new("ddev", ["status"])
            .current_dir(self.target())
            .capture()
            .allow_failure();
        match self.runner.run(&spec) {
            Ok(result) => {
                let up = indicates_running(
                    result.code,
                    &result.stdout,
                    &self.config.runtime_indicators,
                );
                debug!(exit_code = ?result.code, up, "probed runtime status");
                up
            }
            Err(err) => {
                debug!(err = %format!("{err:#}"), "runtime status probe failed");
                false
            }
        }
    }

    /// The booster has been integrated: version stamp first, then the legacy file pair.
    pub fn booster_integrated(&self) -> bool {
        if self.target().join(&self.config.version_stamp).is_file() {
            return true;
        }
        self.config
            .legacy_markers
            .iter()
            .all(|marker| self.target().join(marker).is_file())
    }

    /// All expected hooks are regular files under `.git/hooks`.
    pub fn hooks_installed(&self) -> bool {
        let hooks_dir = self.target().join(".git").join("hooks");
        self.config
            .hook_files
            .iter()
            .all(|hook| hooks_dir.join(hook).is_file())
    }

    /// Version recorded in the stamp file, if readable and non-empty.
    pub fn integrated_version(&self) -> Option<String> {
        let path = self.target().join(&self.config.version_stamp);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) => {
                debug!(path = %path.display(), err = %err, "version stamp unreadable");
                return None;
            }
        };
        parse_version_stamp(&contents)
    }
}

/// `VERSION=<v>` line if present, otherwise the whole trimmed contents.
fn parse_version_stamp(contents: &str) -> Option<String> {
    let version = contents
        .lines()
        .find_map(|line| line.trim().strip_prefix("VERSION="))
        .unwrap_or(contents)
        .trim();
    if version.is_empty() {
        None
    } else {
        Some(version.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::process::CommandResult;
    use crate::test_support::{ScriptedRunner, TempProject};

    #[test]
    fn project_requires_composer_manifest() {
        let project = TempProject::new().expect("project");
        let config = HarnessConfig::default();
        let runner = ScriptedRunner::new();
        let run = project.run_config();
        let state = EnvironmentState::new(&run, &config, &runner);
        assert!(!state.project_created());

        project.write("composer.json", "{}").expect("write");
        assert!(state.project_created());
        assert!(runner.specs().is_empty());
    }

    #[test]
    fn runtime_up_needs_zero_exit_and_indicator() {
        let project = TempProject::new().expect("project");
        let config = HarnessConfig::default();
        let run = project.run_config();

        let runner =
            ScriptedRunner::new().on("ddev status", CommandResult::ok("Project: demo  web OK"));
        assert!(EnvironmentState::new(&run, &config, &runner).runtime_up());

        let runner = ScriptedRunner::new().on("ddev status", CommandResult::ok("nothing here"));
        assert!(!EnvironmentState::new(&run, &config, &runner).runtime_up());

        let runner =
            ScriptedRunner::new().on("ddev status", CommandResult::failed(1, "Project: demo"));
        assert!(!EnvironmentState::new(&run, &config, &runner).runtime_up());
    }

    #[test]
    fn runtime_down_without_directory_skips_probe() {
        let project = TempProject::new().expect("project");
        let config = HarnessConfig::default();
        let runner = ScriptedRunner::new();
        let mut run = project.run_config();
        run.target_dir = project.path().join("missing");
        assert!(!EnvironmentState::new(&run, &config, &runner).runtime_up());
        assert!(runner.specs().is_empty());
    }

    #[test]
    fn runtime_probe_spawn_error_is_not_up() {
        let project = TempProject::new().expect("project");
        let config = HarnessConfig::default();
        let run = project.run_config();
        let runner = ScriptedRunner::new().on_error("ddev status", "ddev not found");
        assert!(!EnvironmentState::new(&run, &config, &runner).runtime_up());
    }

    #[test]
    fn integration_detected_by_stamp_or_legacy_pair() {
        let project = TempProject::new().expect("project");
        let config = HarnessConfig::default();
        let runner = ScriptedRunner::new();
        let run = project.run_config();
        let state = EnvironmentState::new(&run, &config, &runner);
        assert!(!state.booster_integrated());

        project
            .write("tools/git-hooks/shared/utils.ts", "")
            .expect("write");
        assert!(!state.booster_integrated());
        project
            .write("tools/git-hooks/hooks/commit-msg.ts", "")
            .expect("write");
        assert!(state.booster_integrated());
    }

    #[test]
    fn stamp_alone_means_integrated() {
        let project = TempProject::new().expect("project");
        let config = HarnessConfig::default();
        let runner = ScriptedRunner::new();
        let run = project.run_config();
        project.write(".booster-version", "1.4.0\n").expect("write");
        let state = EnvironmentState::new(&run, &config, &runner);
        assert!(state.booster_integrated());
        assert!(!state.hooks_installed());
        assert_eq!(state.integrated_version().as_deref(), Some("1.4.0"));
    }

    #[test]
    fn hooks_installed_requires_every_hook() {
        let project = TempProject::new().expect("project");
        let config = HarnessConfig::default();
        let runner = ScriptedRunner::new();
        let run = project.run_config();
        let state = EnvironmentState::new(&run, &config, &runner);
        project.write(".git/hooks/commit-msg", "").expect("write");
        project.write(".git/hooks/pre-commit", "").expect("write");
        assert!(!state.hooks_installed());
        project.write(".git/hooks/pre-push", "").expect("write");
        assert!(state.hooks_installed());
    }

    #[test]
    fn version_stamp_formats() {
        assert_eq!(parse_version_stamp("  2.0.1 \n").as_deref(), Some("2.0.1"));
        assert_eq!(
            parse_version_stamp("VERSION=1.2.3\nDATE=2024-01-01\n").as_deref(),
            Some("1.2.3")
        );
        assert_eq!(parse_version_stamp("   \n"), None);
        assert_eq!(parse_version_stamp("VERSION=\n"), None);
    }
}
