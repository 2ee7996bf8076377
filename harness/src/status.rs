//! Read-only report of the observed environment state.

use crate::console::{Console, mark};
use crate::core::run_config::RunConfig;
use crate::io::config::HarnessConfig;
use crate::io::process::CommandRunner;
use crate::state::EnvironmentState;

/// One line per observed fact, in display order.
pub fn status_lines<R: CommandRunner>(
    run: &RunConfig,
    state: &EnvironmentState<'_, R>,
) -> Vec<String> {
    let project_created = state.project_created();
    let mut lines = vec![
        format!("- Project type: {}", run.project_type),
        format!("- Target directory: {}", run.target_dir.display()),
        format!("- Project exists: {}", mark(project_created)),
        format!("- DDEV running: {}", mark(state.runtime_up())),
        format!("- Booster integrated: {}", mark(state.booster_integrated())),
    ];
    if let Some(version) = state.integrated_version() {
        lines.push(format!("- Booster version: {version}"));
    }
    lines.push(format!("- Git hooks installed: {}", mark(state.hooks_installed())));
    if project_created {
        let composer = run.target_dir.join("composer.json").is_file();
        lines.push(format!("- Composer.json: {}", mark(composer)));
    }
    lines
}

pub fn show_status<R: CommandRunner>(
    run: &RunConfig,
    config: &HarnessConfig,
    runner: &R,
    console: Console,
) {
    let state = EnvironmentState::new(run, config, runner);
    console.info(format!("Test environment status for {}:", run.project_name));
    for line in status_lines(run, &state) {
        console.detail(line);
    }
}
