//! Validation rules for the integrated `renovate.json`.
//!
//! Only a syntax error is fatal. Every missing key or rule becomes a warning
//! so one pass reports all of them.

use serde_json::Value;

/// Group name the booster uses for language-level dependencies.
pub const DEFAULT_LANGUAGE_GROUP: &str = "PHP dependencies";

/// Findings for one `renovate.json` document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenovateReport {
    pub warnings: Vec<String>,
}

impl RenovateReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Parse `source` and check required keys and package rules.
///
/// Returns the JSON error for unparseable input.
pub fn check_renovate_config(
    source: &str,
    language_group: &str,
) -> Result<RenovateReport, serde_json::Error> {
    let config: Value = serde_json::from_str(source)?;
    let mut report = RenovateReport::default();

    if config.get("$schema").is_none() {
        report
            .warnings
            .push("renovate.json missing $schema property".to_string());
    }

    if !array_contains(config.get("extends"), "config:base") {
        report
            .warnings
            .push("renovate.json missing or invalid extends configuration".to_string());
    }

    let Some(rules) = config.get("packageRules").and_then(Value::as_array) else {
        report
            .warnings
            .push("renovate.json missing or invalid packageRules".to_string());
        return Ok(report);
    };

    if !rules.iter().any(is_automerge_rule) {
        report
            .warnings
            .push("renovate.json missing automerge rule for minor/patch updates".to_string());
    }
    if !rules.iter().any(is_dev_dependencies_rule) {
        report
            .warnings
            .push("renovate.json missing dev dependencies grouping".to_string());
    }
    if !rules
        .iter()
        .any(|rule| is_language_group_rule(rule, language_group))
    {
        report
            .warnings
            .push(format!("renovate.json missing {language_group} grouping"));
    }

    Ok(report)
}

fn is_automerge_rule(rule: &Value) -> bool {
    rule.get("automerge").is_some() && array_contains(rule.get("matchUpdateTypes"), "minor")
}

fn is_dev_dependencies_rule(rule: &Value) -> bool {
    array_contains(rule.get("matchDepTypes"), "devDependencies")
}

fn is_language_group_rule(rule: &Value, language_group: &str) -> bool {
    rule.get("matchPackagePatterns").is_some()
        && rule.get("groupName").and_then(Value::as_str) == Some(language_group)
}

fn array_contains(value: Option<&Value>, needle: &str) -> bool {
    value
        .and_then(Value::as_array)
        .is_some_and(|items| items.iter().any(|item| item.as_str() == Some(needle)))
}
