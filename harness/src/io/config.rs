//! Harness configuration stored in `booster-test.toml`.
//!
//! Every list the steps check against (tools, indicators, manifests, hook
//! scenarios) lives here so a booster change can be tracked without a
//! rebuild. A missing file means "use the defaults".

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::branch_policy::DEFAULT_FOOTER_LABEL;
use crate::core::manifest::{DEFAULT_EXPECTED_ARTIFACTS, DEFAULT_INTERACTIVE_ARTIFACTS};
use crate::core::renovate::DEFAULT_LANGUAGE_GROUP;
use crate::core::runtime_status::DEFAULT_RUNNING_INDICATORS;
use crate::core::workflows::{DEFAULT_ACTION_FILE, DEFAULT_WORKFLOW_FILES};

/// File name looked up in the harness directory when `--config` is absent.
pub const CONFIG_FILE_NAME: &str = "booster-test.toml";

/// Harness configuration (TOML). Missing fields take the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Host tools whose absence aborts the run.
    pub required_tools: Vec<String>,
    /// Host tools that are only reported.
    pub optional_tools: Vec<String>,
    /// Seconds allowed for `docker version` before the daemon counts as unreachable.
    pub docker_timeout_secs: u64,
    /// Substrings of `ddev status` output that mean the runtime is up.
    pub runtime_indicators: Vec<String>,
    /// Version stamp written by the integration, relative to the project.
    pub version_stamp: String,
    /// Files that identify a pre-stamp integration; all must exist.
    pub legacy_markers: Vec<String>,
    /// Hooks expected under `.git/hooks`.
    pub hook_files: Vec<String>,
    /// Files `verify` requires after integration.
    pub expected_artifacts: Vec<String>,

    pub hooks: HookConfig,
    pub policy: PolicyConfig,
    pub renovate: RenovateConfig,
    pub workflows: WorkflowConfig,
    pub integration: IntegrationConfig,
    pub interactive: InteractiveConfig,
}

/// Branch scenarios for the hook acceptance test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HookConfig {
    /// Tried in order; the first one that checks out is the default branch.
    pub default_branches: Vec<String>,
    /// Ticket number used to build the valid feature branch.
    pub ticket_number: String,
    /// Branch name that the booster must reject.
    pub invalid_branch: String,
    /// Commit leftover integration files after the hook test.
    pub commit_artifacts: bool,
    /// Environment overrides applied to every test commit.
    pub skip_env: Vec<(String, String)>,
}

/// Fallback ticket policy when the project has no branch-name config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PolicyConfig {
    /// Branch-name config file, relative to the project.
    pub config_file: String,
    pub footer_label: String,
    pub ticket_prefix: String,
    pub ticket_pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenovateConfig {
    pub path: String,
    /// `groupName` of the language-level package rule.
    pub language_group: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkflowConfig {
    pub files: Vec<String>,
    /// Reusable composite action that workflows must reference.
    pub action: String,
}

/// Flags passed to the integration script.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IntegrationConfig {
    pub interactive_flag: String,
    pub automated_flag: String,
}

/// Standalone interactive-mode test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InteractiveConfig {
    /// One answer per prompt, fed on stdin in order.
    pub answers: Vec<String>,
    /// Files the script must create in the scratch directory.
    pub expected_files: Vec<String>,
    /// Substring the generated branch-name config must contain.
    pub expected_branch_marker: String,
    /// Trailing stdout lines echoed after the run.
    pub output_tail_lines: usize,
}

fn strings<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            required_tools: strings(["ddev", "git"]),
            optional_tools: strings(["composer"]),
            docker_timeout_secs: 30,
            runtime_indicators: strings(DEFAULT_RUNNING_INDICATORS),
            version_stamp: ".booster-version".to_string(),
            legacy_markers: strings([
                "tools/git-hooks/shared/utils.ts",
                "tools/git-hooks/hooks/commit-msg.ts",
            ]),
            hook_files: strings(["commit-msg", "pre-commit", "pre-push"]),
            expected_artifacts: strings(DEFAULT_EXPECTED_ARTIFACTS),
            hooks: HookConfig::default(),
            policy: PolicyConfig::default(),
            renovate: RenovateConfig::default(),
            workflows: WorkflowConfig::default(),
            integration: IntegrationConfig::default(),
            interactive: InteractiveConfig::default(),
        }
    }
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            default_branches: strings(["main", "master"]),
            ticket_number: "123".to_string(),
            invalid_branch: "invalid-branch-format".to_string(),
            commit_artifacts: true,
            skip_env: vec![
                ("SKIP_PHPSTAN".to_string(), "1".to_string()),
                ("SKIP_PSALM".to_string(), "1".to_string()),
            ],
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            config_file: "validate-branch-name.config.cjs".to_string(),
            footer_label: DEFAULT_FOOTER_LABEL.to_string(),
            ticket_prefix: "PRJ".to_string(),
            ticket_pattern: "[0-9]+".to_string(),
        }
    }
}

impl Default for RenovateConfig {
    fn default() -> Self {
        Self {
            path: "renovate.json".to_string(),
            language_group: DEFAULT_LANGUAGE_GROUP.to_string(),
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            files: strings(DEFAULT_WORKFLOW_FILES),
            action: DEFAULT_ACTION_FILE.to_string(),
        }
    }
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            interactive_flag: "-I".to_string(),
            automated_flag: "-N".to_string(),
        }
    }
}

impl Default for InteractiveConfig {
    fn default() -> Self {
        Self {
            answers: strings(["y", "y", "PRJ", "", "y", "y"]),
            expected_files: strings(DEFAULT_INTERACTIVE_ARTIFACTS),
            expected_branch_marker: "PRJ-".to_string(),
            output_tail_lines: 20,
        }
    }
}

impl HarnessConfig {
    pub fn validate(&self) -> Result<()> {
        non_empty_list("required_tools", &self.required_tools)?;
        non_empty_list("runtime_indicators", &self.runtime_indicators)?;
        non_empty_list("legacy_markers", &self.legacy_markers)?;
        non_empty_list("hook_files", &self.hook_files)?;
        non_empty_list("expected_artifacts", &self.expected_artifacts)?;
        non_empty_list("hooks.default_branches", &self.hooks.default_branches)?;
        non_empty_list("workflows.files", &self.workflows.files)?;
        non_empty_list("interactive.expected_files", &self.interactive.expected_files)?;
        for (field, value) in [
            ("version_stamp", &self.version_stamp),
            ("hooks.ticket_number", &self.hooks.ticket_number),
            ("hooks.invalid_branch", &self.hooks.invalid_branch),
            ("policy.config_file", &self.policy.config_file),
            ("renovate.path", &self.renovate.path),
            ("renovate.language_group", &self.renovate.language_group),
            ("workflows.action", &self.workflows.action),
            ("integration.interactive_flag", &self.integration.interactive_flag),
            ("integration.automated_flag", &self.integration.automated_flag),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow!("{field} must not be blank"));
            }
        }
        if self.docker_timeout_secs == 0 {
            return Err(anyhow!("docker_timeout_secs must be > 0"));
        }
        if self.hooks.skip_env.iter().any(|(key, _)| key.trim().is_empty()) {
            return Err(anyhow!("hooks.skip_env keys must not be blank"));
        }
        Ok(())
    }
}

fn non_empty_list(field: &str, values: &[String]) -> Result<()> {
    if values.is_empty() || values.iter().any(|value| value.trim().is_empty()) {
        return Err(anyhow!("{field} must be a non-empty array of non-blank strings"));
    }
    Ok(())
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `HarnessConfig::default()`.
pub fn load_config(path: &Path) -> Result<HarnessConfig> {
    if !path.exists() {
        let cfg = HarnessConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: HarnessConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
