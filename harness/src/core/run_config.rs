//! Immutable description of one harness invocation.

use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;

/// Framework used to scaffold the test project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ProjectType {
    #[default]
    Laravel,
    Symfony,
}

impl ProjectType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectType::Laravel => "laravel",
            ProjectType::Symfony => "symfony",
        }
    }

    /// Project name used when none is given on the command line.
    pub fn default_project_name(self) -> String {
        format!("booster-test-{}", self.as_str())
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every procedure the harness knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Action {
    /// Run the complete lifecycle test.
    #[default]
    Full,
    /// Only check the host environment and requirements.
    EnvCheck,
    /// Only create the project (fails if it already exists).
    Setup,
    /// Start the runtime of an existing project.
    SetupResume,
    /// Only run the booster integration.
    Integrate,
    /// Only verify integration artifacts.
    Verify,
    /// Exercise the git hooks with a valid and an invalid branch.
    TestHooks,
    /// Check CI workflow files and the reusable action.
    TestGithubActions,
    /// Run the integration script interactively in a scratch directory.
    TestInteractive,
    /// Run the integration on the existing project in interactive or automated mode.
    TestInteractiveProject,
    /// Remove the scratch directory used by `test-interactive`.
    CleanInteractiveTest,
    /// Tear down the runtime and remove the project directory.
    Clean,
    /// Print the observed environment state.
    Status,
    /// Print usage information.
    Help,
}

impl Action {
    /// Actions that run the host requirement check before doing anything else.
    pub fn requires_env_check(self) -> bool {
        !matches!(
            self,
            Action::Clean | Action::CleanInteractiveTest | Action::Status | Action::Help
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Action::Full => "full",
            Action::EnvCheck => "env-check",
            Action::Setup => "setup",
            Action::SetupResume => "setup-resume",
            Action::Integrate => "integrate",
            Action::Verify => "verify",
            Action::TestHooks => "test-hooks",
            Action::TestGithubActions => "test-github-actions",
            Action::TestInteractive => "test-interactive",
            Action::TestInteractiveProject => "test-interactive-project",
            Action::CleanInteractiveTest => "clean-interactive-test",
            Action::Clean => "clean",
            Action::Status => "status",
            Action::Help => "help",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved invocation settings. Built once in `main`, then only borrowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub action: Action,
    pub project_type: ProjectType,
    pub project_name: String,
    /// Directory holding (or about to hold) the test project.
    pub target_dir: PathBuf,
    /// Directory of the harness itself (`<root>/tools/internal-test`).
    pub script_dir: PathBuf,
    /// Booster repository root.
    pub root_dir: PathBuf,
    /// Run integration without prompting.
    pub automated: bool,
}

impl RunConfig {
    /// Build a config with the conventional layout under `root_dir`.
    ///
    /// `project_name` defaults to `booster-test-<type>` and `target_dir` to
    /// `<root_dir>/tests/<type>/<name>`.
    pub fn new(
        action: Action,
        project_type: ProjectType,
        project_name: Option<String>,
        target_dir: Option<PathBuf>,
        root_dir: PathBuf,
    ) -> Self {
        let project_name = project_name.unwrap_or_else(|| project_type.default_project_name());
        let target_dir = target_dir.unwrap_or_else(|| {
            root_dir
                .join("tests")
                .join(project_type.as_str())
                .join(&project_name)
        });
        Self {
            action,
            project_type,
            project_name,
            target_dir,
            script_dir: root_dir.join("tools").join("internal-test"),
            root_dir,
            automated: false,
        }
    }

    pub fn with_automated(mut self, automated: bool) -> Self {
        self.automated = automated;
        self
    }

    /// Path to the booster source tree used for local-development integration.
    pub fn booster_dir(&self) -> PathBuf {
        self.root_dir.join("booster")
    }

    /// Path to the integration script.
    pub fn integration_script(&self) -> PathBuf {
        self.booster_dir().join("integrate_booster.sh")
    }

    /// Scratch directory used by the standalone interactive test.
    pub fn interactive_test_dir(&self) -> PathBuf {
        self.root_dir.join("tests").join("temp_interactive_test")
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn defaults_follow_project_type() {
        let cfg = RunConfig::new(
            Action::Setup,
            ProjectType::Symfony,
            None,
            None,
            PathBuf::from("/repo"),
        );
        assert_eq!(cfg.project_name, "booster-test-symfony");
        assert_eq!(
            cfg.target_dir,
            Path::new("/repo/tests/symfony/booster-test-symfony")
        );
        assert_eq!(cfg.script_dir, Path::new("/repo/tools/internal-test"));
        assert_eq!(
            cfg.integration_script(),
            Path::new("/repo/booster/integrate_booster.sh")
        );
    }

    #[test]
    fn explicit_target_dir_wins() {
        let cfg = RunConfig::new(
            Action::Full,
            ProjectType::Laravel,
            Some("demo".into()),
            Some(PathBuf::from("/tmp/demo")),
            PathBuf::from("/repo"),
        );
        assert_eq!(cfg.project_name, "demo");
        assert_eq!(cfg.target_dir, Path::new("/tmp/demo"));
    }

    #[test]
    fn read_only_actions_skip_env_check() {
        assert!(!Action::Status.requires_env_check());
        assert!(!Action::Clean.requires_env_check());
        assert!(!Action::Help.requires_env_check());
        assert!(Action::Setup.requires_env_check());
        assert!(Action::TestHooks.requires_env_check());
    }

    #[test]
    fn action_names_match_cli_values() {
        for action in Action::value_variants() {
            let value = action.to_possible_value().expect("possible value");
            assert_eq!(value.get_name(), action.name());
        }
    }
}
