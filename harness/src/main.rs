//! `booster-test`: end-to-end integration tests for the PHP booster.

use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use harness::console::Console;
use harness::core::run_config::{Action, ProjectType, RunConfig};
use harness::error::{HarnessError, exit_code_for};
use harness::exit_codes;
use harness::interrupt;
use harness::io::config::{CONFIG_FILE_NAME, load_config};
use harness::io::process::SystemRunner;
use harness::logging;
use harness::orchestrator::Orchestrator;

#[derive(Parser, Debug)]
#[command(
    name = "booster-test",
    version,
    about = "Integration tests for the PHP booster against a real ddev project"
)]
struct Cli {
    /// Action to run.
    #[arg(value_enum, default_value_t = Action::Full)]
    action: Action,

    /// Framework used to scaffold the test project.
    #[arg(value_enum, default_value_t = ProjectType::Laravel)]
    project_type: ProjectType,

    /// Project name (default: booster-test-<type>).
    project_name: Option<String>,

    /// Project directory (default: <root-dir>/tests/<type>/<name>).
    #[arg(long)]
    target_dir: Option<PathBuf>,

    /// Booster repository root (default: current directory).
    #[arg(long, env = "BOOSTER_ROOT_DIR")]
    root_dir: Option<PathBuf>,

    /// Harness config file (default: <root-dir>/tools/internal-test/booster-test.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Integrate without prompting (test-interactive-project).
    #[arg(long)]
    automated: bool,

    /// Enable debug tracing for the harness.
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long)]
    no_color: bool,
}

impl Cli {
    fn into_run_config(self, cwd: PathBuf) -> Result<RunConfig> {
        let root_dir = self.root_dir.unwrap_or(cwd);
        if !root_dir.is_dir() {
            return Err(HarnessError::Usage(format!(
                "root directory {} does not exist",
                root_dir.display()
            ))
            .into());
        }
        Ok(RunConfig::new(
            self.action,
            self.project_type,
            self.project_name,
            self.target_dir,
            root_dir,
        )
        .with_automated(self.automated))
    }
}

fn main() {
    let cli = Cli::parse();
    let console = Console::new(!cli.no_color);
    let outcome = run(cli, console);
    if interrupt::requested() {
        console.error(HarnessError::Interrupted.to_string());
        process::exit(exit_codes::FAILURE);
    }
    if let Err(err) = outcome {
        console.error(format!("{err:#}"));
        process::exit(exit_code_for(&err));
    }
    process::exit(exit_codes::OK);
}

fn run(cli: Cli, console: Console) -> Result<()> {
    logging::init(cli.verbose);
    interrupt::install()?;
    let explicit_config = cli.config.clone();
    let cwd = env::current_dir().context("resolve current directory")?;
    let run = cli.into_run_config(cwd)?;

    let config_path = match explicit_config {
        Some(path) if !path.is_file() => {
            return Err(HarnessError::Usage(format!(
                "config file {} does not exist",
                path.display()
            ))
            .into());
        }
        Some(path) => path,
        None => run.script_dir.join(CONFIG_FILE_NAME),
    };
    let config = load_config(&config_path)?;

    let runner = SystemRunner::new(console);
    Orchestrator::new(&run, &config, &runner, console).run(run.action)
}
