//! Test-only helpers: a scripted command runner and a temporary project.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::core::run_config::{Action, ProjectType, RunConfig};
use crate::io::process::{CommandResult, CommandRunner, CommandSpec, check_result};

type Effect = Box<dyn Fn(&CommandSpec)>;

enum Response {
    Result(CommandResult),
    SpawnError(String),
}

struct Rule {
    prefix: String,
    response: Response,
    effect: Option<Effect>,
}

/// [`CommandRunner`] that records every spec and answers from a script.
///
/// Rules match on the rendered command line (`program arg...`) by prefix, in
/// insertion order. Unmatched commands succeed with empty output. The
/// `must_succeed` contract is applied exactly like the system runner does.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<Rule>,
    available: BTreeSet<String>,
    recorded: RefCell<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands starting with `prefix` with `result`.
    pub fn on(mut self, prefix: &str, result: CommandResult) -> Self {
        self.rules.push(Rule {
            prefix: prefix.to_string(),
            response: Response::Result(result),
            effect: None,
        });
        self
    }

    /// Like [`ScriptedRunner::on`], also running `effect` (e.g. creating files).
    pub fn on_with(
        mut self,
        prefix: &str,
        result: CommandResult,
        effect: impl Fn(&CommandSpec) + 'static,
    ) -> Self {
        self.rules.push(Rule {
            prefix: prefix.to_string(),
            response: Response::Result(result),
            effect: Some(Box::new(effect)),
        });
        self
    }

    /// Fail commands starting with `prefix` as if the program could not be spawned.
    pub fn on_error(mut self, prefix: &str, message: &str) -> Self {
        self.rules.push(Rule {
            prefix: prefix.to_string(),
            response: Response::SpawnError(message.to_string()),
            effect: None,
        });
        self
    }

    /// Programs reported as present on `PATH`.
    pub fn with_available(mut self, programs: &[&str]) -> Self {
        self.available
            .extend(programs.iter().map(|program| (*program).to_string()));
        self
    }

    pub fn specs(&self) -> Vec<CommandSpec> {
        self.recorded.borrow().clone()
    }

    /// Rendered command lines in execution order.
    pub fn command_lines(&self) -> Vec<String> {
        self.recorded
            .borrow()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Whether any recorded command line starts with `prefix`.
    pub fn ran(&self, prefix: &str) -> bool {
        self.command_lines()
            .iter()
            .any(|line| line.starts_with(prefix))
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandResult> {
        self.recorded.borrow_mut().push(spec.clone());
        let line = spec.to_string();
        let Some(rule) = self.rules.iter().find(|rule| line.starts_with(&rule.prefix)) else {
            return check_result(spec, CommandResult::ok(""));
        };
        if let Some(effect) = &rule.effect {
            effect(spec);
        }
        match &rule.response {
            Response::Result(result) => check_result(spec, result.clone()),
            Response::SpawnError(message) => {
                Err(anyhow!("{message}")).context(format!("run {spec}"))
            }
        }
    }

    fn is_available(&self, program: &str) -> bool {
        self.available.contains(program)
    }
}

/// Temporary directory laid out like a booster checkout with a test project.
///
/// `root()` plays the booster repository root; `path()` is the project
/// directory (`<root>/project`), created empty.
pub struct TempProject {
    root: TempDir,
    project: PathBuf,
}

impl TempProject {
    pub fn new() -> Result<Self> {
        let root = tempfile::tempdir().context("create tempdir")?;
        let project = root.path().join("project");
        fs::create_dir_all(&project).context("create project dir")?;
        Ok(Self { root, project })
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn path(&self) -> &Path {
        &self.project
    }

    /// Write `contents` to `relative` inside the project, creating parents.
    pub fn write(&self, relative: &str, contents: &str) -> Result<()> {
        write_file(&self.project.join(relative), contents)
    }

    /// Write `contents` to `relative` inside the root, creating parents.
    pub fn write_root(&self, relative: &str, contents: &str) -> Result<()> {
        write_file(&self.root.path().join(relative), contents)
    }

    /// Mark the project as created (`composer.json` present).
    pub fn with_composer(self) -> Result<Self> {
        self.write("composer.json", "{\"name\": \"test/project\"}")?;
        Ok(self)
    }

    /// Run configuration targeting this project, colors off.
    pub fn run_config(&self) -> RunConfig {
        RunConfig::new(
            Action::Full,
            ProjectType::Laravel,
            None,
            Some(self.project.clone()),
            self.root.path().to_path_buf(),
        )
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}

/// A `ddev status` answer that counts as running.
pub fn ddev_running() -> CommandResult {
    CommandResult::ok("Project: booster-test-laravel\nSERVICE  STAT\nweb      OK\n")
}
