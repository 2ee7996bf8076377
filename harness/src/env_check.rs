//! Host prerequisites and environment information.

use std::env;
use std::fs;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, instrument};

use crate::console::Console;
use crate::error::HarnessError;
use crate::io::config::HarnessConfig;
use crate::io::process::{CommandRunner, CommandSpec};

/// Checks that the host can run the harness. Never mutates anything.
pub struct EnvironmentChecker<'a, R: CommandRunner> {
    config: &'a HarnessConfig,
    runner: &'a R,
    console: Console,
}

impl<'a, R: CommandRunner> EnvironmentChecker<'a, R> {
    pub fn new(config: &'a HarnessConfig, runner: &'a R, console: Console) -> Self {
        Self {
            config,
            runner,
            console,
        }
    }

    /// Print OS, distribution, shell, user and working directory.
    pub fn show_environment(&self) {
        self.console.info("Environment information:");
        self.console.detail(format!("- OS: {}", env::consts::OS));
        let distribution = fs::read_to_string("/etc/os-release")
            .ok()
            .and_then(|contents| pretty_name(&contents))
            .unwrap_or_else(|| "Unknown".to_string());
        self.console.detail(format!("- Distribution: {distribution}"));
        self.console
            .detail(format!("- Shell: {}", env_or_unknown("SHELL")));
        self.console.detail(format!("- User: {}", env_or_unknown("USER")));
        let cwd = env::current_dir()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|_| "Unknown".to_string());
        self.console.detail(format!("- Working directory: {cwd}"));
    }

    /// Verify required tools, the docker daemon and ddev.
    ///
    /// All missing tools are reported together before failing.
    #[instrument(skip_all)]
    pub fn check_requirements(&self) -> Result<()> {
        self.console.info("Checking requirements...");

        let mut missing = Vec::new();
        for tool in &self.config.required_tools {
            if self.runner.is_available(tool) {
                self.console.info(format!("✓ {tool} is available"));
            } else {
                self.console.error(format!("✗ {tool} is missing"));
                missing.push(tool.as_str());
            }
        }
        for tool in &self.config.optional_tools {
            if self.runner.is_available(tool) {
                self.console.info(format!("✓ {tool} is available (host)"));
            } else {
                self.console
                    .info(format!("ℹ {tool} not found on host (will use DDEV {tool})"));
            }
        }
        if !missing.is_empty() {
            self.console
                .error("Please install the missing commands and try again.");
            return Err(HarnessError::precondition(format!(
                "Missing required commands: {}",
                missing.join(", ")
            ))
            .into());
        }

        self.check_docker()?;
        self.check_ddev_version()?;

        if env::var_os("CI").is_some() {
            self.console.info("Running in CI environment");
        }
        self.console.success("All requirements satisfied");
        Ok(())
    }

    fn check_docker(&self) -> Result<()> {
        let timeout = Duration::from_secs(self.config.docker_timeout_secs);
        let spec = CommandSpec::new("docker", ["version"])
            .capture()
            .allow_failure()
            .timeout(timeout);
        let result = match self.runner.run(&spec) {
            Ok(result) => result,
            Err(err) => {
                debug!(err = %format!("{err:#}"), "docker probe failed to run");
                self.console.error("✗ Docker not available");
                return Err(HarnessError::precondition("Docker not available").into());
            }
        };
        if result.timed_out {
            self.console.error("✗ Docker not responding");
            return Err(HarnessError::precondition(format!(
                "Docker did not respond within {}s",
                timeout.as_secs()
            ))
            .into());
        }
        if !result.success() {
            self.console.error("✗ Docker not working");
            return Err(HarnessError::precondition("Docker not working").into());
        }
        self.console.info("✓ Docker is available");
        Ok(())
    }

    fn check_ddev_version(&self) -> Result<()> {
        let spec = CommandSpec::new("ddev", ["version"]).capture();
        let result = match self.runner.run(&spec) {
            Ok(result) => result,
            Err(err) => {
                debug!(err = %format!("{err:#}"), "ddev version probe failed");
                self.console.error("✗ Cannot determine DDEV version");
                return Err(HarnessError::precondition("Cannot determine DDEV version").into());
            }
        };
        match ddev_version_line(&result.stdout) {
            Some(line) => self.console.info(format!("✓ {line}")),
            None => self.console.info("✓ DDEV is available"),
        }
        Ok(())
    }
}

fn env_or_unknown(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| "Unknown".to_string())
}

/// `PRETTY_NAME` from an os-release file, unquoted.
fn pretty_name(os_release: &str) -> Option<String> {
    os_release.lines().find_map(|line| {
        line.strip_prefix("PRETTY_NAME=")
            .map(|value| value.trim().trim_matches('"').to_string())
    })
}

/// The line of `ddev version` output that names the version.
fn ddev_version_line(output: &str) -> Option<&str> {
    output
        .lines()
        .map(str::trim)
        .find(|line| line.to_lowercase().contains("ddev version"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use crate::io::process::CommandResult;
    use crate::test_support::ScriptedRunner;

    fn precondition_message(err: &anyhow::Error) -> String {
        match classify(err) {
            Some(HarnessError::Precondition(message)) => message.clone(),
            other => panic!("expected precondition, got {other:?}"),
        }
    }

    #[test]
    fn all_missing_tools_are_reported_together() {
        let config = HarnessConfig::default();
        let runner = ScriptedRunner::new();
        let checker = EnvironmentChecker::new(&config, &runner, Console::plain());
        let err = checker.check_requirements().expect_err("missing tools");
        assert_eq!(
            precondition_message(&err),
            "Missing required commands: ddev, git"
        );
        assert!(runner.specs().is_empty());
    }

    #[test]
    fn optional_tool_absence_is_not_fatal() {
        let config = HarnessConfig::default();
        let runner = ScriptedRunner::new()
            .with_available(&["ddev", "git"])
            .on("ddev version", CommandResult::ok("ITEM  VALUE\nDDEV version  v1.23.1\n"));
        let checker = EnvironmentChecker::new(&config, &runner, Console::plain());
        checker.check_requirements().expect("requirements");
        assert_eq!(runner.command_lines(), vec!["docker version", "ddev version"]);
        assert_eq!(runner.specs()[0].timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn docker_failure_is_a_precondition() {
        let config = HarnessConfig::default();
        let runner = ScriptedRunner::new()
            .with_available(&["ddev", "git"])
            .on("docker version", CommandResult::failed(1, "Cannot connect"));
        let checker = EnvironmentChecker::new(&config, &runner, Console::plain());
        let err = checker.check_requirements().expect_err("docker down");
        assert_eq!(precondition_message(&err), "Docker not working");
        assert!(!runner.ran("ddev version"));
    }

    #[test]
    fn docker_timeout_is_a_precondition() {
        let config = HarnessConfig::default();
        let runner = ScriptedRunner::new().with_available(&["ddev", "git"]).on(
            "docker version",
            CommandResult {
                timed_out: true,
                ..CommandResult::default()
            },
        );
        let checker = EnvironmentChecker::new(&config, &runner, Console::plain());
        let err = checker.check_requirements().expect_err("docker hung");
        assert!(precondition_message(&err).contains("30s"));
    }

    #[test]
    fn ddev_version_failure_is_a_precondition() {
        let config = HarnessConfig::default();
        let runner = ScriptedRunner::new()
            .with_available(&["ddev", "git"])
            .on("ddev version", CommandResult::failed(127, ""));
        let checker = EnvironmentChecker::new(&config, &runner, Console::plain());
        let err = checker.check_requirements().expect_err("ddev broken");
        assert_eq!(precondition_message(&err), "Cannot determine DDEV version");
    }

    #[test]
    fn parses_pretty_name() {
        let os_release = "NAME=\"Ubuntu\"\nPRETTY_NAME=\"Ubuntu 24.04 LTS\"\nID=ubuntu\n";
        assert_eq!(pretty_name(os_release).as_deref(), Some("Ubuntu 24.04 LTS"));
        assert_eq!(pretty_name("ID=alpine\n"), None);
    }

    #[test]
    fn finds_version_line_case_insensitively() {
        let output = "ITEM            VALUE\nDDEV version    v1.23.1\ndocker   27.0\n";
        assert_eq!(ddev_version_line(output), Some("DDEV version    v1.23.1"));
        assert_eq!(ddev_version_line("v1.23.1\n"), None);
    }
}
