//! Checks for the GitHub Actions files shipped by the booster.

use std::path::Path;

use serde_yaml::Value;

pub const DEFAULT_WORKFLOW_FILES: [&str; 1] = [".github/workflows/php.yml"];
pub const DEFAULT_ACTION_FILE: &str = ".github/actions/php/action.yml";

/// A workflow-related file as read from disk (`None` when missing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSource {
    pub path: String,
    pub contents: Option<String>,
}

impl ArtifactSource {
    pub fn new(path: impl Into<String>, contents: Option<String>) -> Self {
        Self {
            path: path.into(),
            contents,
        }
    }
}

/// `uses:` value that points at the reusable action, e.g. `./.github/actions/php`.
pub fn action_reference(action_path: &str) -> String {
    let dir = Path::new(action_path)
        .parent()
        .map(|parent| parent.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("./{}", dir.trim_start_matches("./"))
}

/// Validate workflows and the reusable action; return one diagnostic per problem.
pub fn check_workflow_artifacts(
    workflows: &[ArtifactSource],
    action: &ArtifactSource,
) -> Vec<String> {
    let mut problems = Vec::new();
    let reference = action_reference(&action.path);
    let mut referenced = false;
    let mut parsed_workflows = 0usize;

    for workflow in workflows {
        let Some(doc) = parse_mapping(workflow, &mut problems) else {
            continue;
        };
        parsed_workflows += 1;
        for key in ["on", "jobs"] {
            if doc.get(key).is_none() {
                problems.push(format!("{}: missing `{key}` section", workflow.path));
            }
        }
        let mut uses = Vec::new();
        collect_uses(&doc, &mut uses);
        if uses.iter().any(|value| matches_reference(value, &reference)) {
            referenced = true;
        }
    }

    if let Some(doc) = parse_mapping(action, &mut problems) {
        for key in ["name", "runs"] {
            if doc.get(key).is_none() {
                problems.push(format!("{}: missing `{key}`", action.path));
            }
        }
    }

    if parsed_workflows > 0 && !referenced {
        problems.push(format!(
            "no workflow uses the reusable action at {reference}"
        ));
    }

    problems
}

fn parse_mapping(source: &ArtifactSource, problems: &mut Vec<String>) -> Option<Value> {
    let Some(contents) = &source.contents else {
        problems.push(format!("{}: file is missing", source.path));
        return None;
    };
    match serde_yaml::from_str::<Value>(contents) {
        Ok(doc @ Value::Mapping(_)) => Some(doc),
        Ok(_) => {
            problems.push(format!("{}: expected a mapping at the top level", source.path));
            None
        }
        Err(err) => {
            problems.push(format!("{}: invalid YAML ({err})", source.path));
            None
        }
    }
}

fn collect_uses(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                if key.as_str() == Some("uses")
                    && let Some(uses) = child.as_str()
                {
                    out.push(uses.to_string());
                }
                collect_uses(child, out);
            }
        }
        Value::Sequence(items) => {
            for item in items {
                collect_uses(item, out);
            }
        }
        _ => {}
    }
}

fn matches_reference(uses: &str, reference: &str) -> bool {
    let uses = uses.trim().trim_end_matches('/');
    uses == reference || uses.strip_suffix("/action.yml") == Some(reference)
}
