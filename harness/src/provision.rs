//! Creating the framework project inside a ddev runtime.

use std::fs;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::console::Console;
use crate::core::run_config::{ProjectType, RunConfig};
use crate::error::HarnessError;
use crate::io::config::HarnessConfig;
use crate::io::git::Git;
use crate::io::process::{CommandRunner, CommandSpec};
use crate::state::EnvironmentState;

pub const GIT_USER_NAME: &str = "Test User";
pub const GIT_USER_EMAIL: &str = "test@example.com";

/// ddev invocations that scaffold a project of `project_type`, in order.
pub fn provisioning_commands(project_type: ProjectType, project_name: &str) -> Vec<Vec<String>> {
    let project_name_flag = format!("--project-name={project_name}");
    let project_name_flag = project_name_flag.as_str();
    let commands: Vec<Vec<&str>> = match project_type {
        ProjectType::Symfony => vec![
            vec![
                "config",
                project_name_flag,
                "--project-type=php",
                "--docroot=public",
                "--create-docroot",
            ],
            vec!["start"],
            vec![
                "composer",
                "create-project",
                "symfony/skeleton:^7.0",
                ".",
                "--no-interaction",
                "--prefer-dist",
            ],
            vec!["composer", "require", "webapp", "--no-interaction"],
        ],
        ProjectType::Laravel => vec![
            vec![
                "config",
                project_name_flag,
                "--project-type=laravel",
                "--docroot=public",
            ],
            vec!["start"],
            vec![
                "composer",
                "create-project",
                "laravel/laravel:^11",
                ".",
                "--no-interaction",
                "--prefer-dist",
            ],
        ],
    };
    commands
        .into_iter()
        .map(|args| args.into_iter().map(str::to_string).collect())
        .collect()
}

pub struct ProjectProvisioner<'a, R: CommandRunner> {
    run: &'a RunConfig,
    runner: &'a R,
    state: EnvironmentState<'a, R>,
    console: Console,
}

impl<'a, R: CommandRunner> ProjectProvisioner<'a, R> {
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

    /// Scaffold a fresh project and commit it. Refuses to touch an existing one.
    #[instrument(skip_all, fields(project_type = %self.run.project_type))]
    pub fn setup_project(&self) -> Result<()> {
        let target = &self.run.target_dir;
        if self.state.project_created() {
            return Err(HarnessError::precondition(format!(
                "Project already exists at {}. \
                 Use 'setup-resume' to continue or 'clean' to start fresh.",
                target.display()
            ))
            .into());
        }

        self.console
            .info(format!("Setting up {} project...", self.run.project_type));
        fs::create_dir_all(target).with_context(|| format!("create {}", target.display()))?;

        for args in provisioning_commands(self.run.project_type, &self.run.project_name) {
            let spec = CommandSpec::new("ddev", args).current_dir(target);
            info!(command = %spec, "provisioning");
            self.runner.run(&spec)?;
        }

        self.init_repository()?;
        self.console
            .success(format!("Project setup complete at {}", target.display()));
        Ok(())
    }

    fn init_repository(&self) -> Result<()> {
        self.console.info("Initializing git repository...");
        let git = Git::new(self.runner, &self.run.target_dir);
        git.init()?;
        git.set_identity(GIT_USER_NAME, GIT_USER_EMAIL)?;
        git.add(".")?;
        git.commit(&format!(
            "feat: initial commit with {} framework",
            self.run.project_type
        ))?;
        Ok(())
    }

    /// Start the runtime of an existing project; no-op when already up.
    #[instrument(skip_all)]
    pub fn setup_resume(&self) -> Result<()> {
        if !self.state.project_created() {
            return Err(HarnessError::precondition(format!(
                "No project found at {}. Run 'setup' first.",
                self.run.target_dir.display()
            ))
            .into());
        }
        if self.state.runtime_up() {
            self.console.info("DDEV is already running");
            return Ok(());
        }
        self.console.info("Resuming project setup...");
        self.console.info("Starting DDEV...");
        self.runner
            .run(&CommandSpec::new("ddev", ["start"]).current_dir(&self.run.target_dir))?;
        self.console.success("Project resumed successfully");
        Ok(())
    }
}
