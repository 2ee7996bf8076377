//! Branch-naming policy as declared by the integrated project.
//!
//! The booster ships `validate-branch-name.config.cjs`; its commit-msg hook
//! extracts a ticket id from the branch name and appends a
//! `<Label>: <Ticket>` footer. The harness reads the same file so the footer
//! it expects follows the project's own prefix and label.

use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow};
use regex::{Regex, RegexBuilder};

pub const DEFAULT_FOOTER_LABEL: &str = "Closes";

static CONFIG_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)const\s+config\s*=\s*(\{.*?\});").unwrap());
static PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"ticketIdPrefix:\s*['"`]([^'"`]+)['"`]"#).unwrap());
static PATTERN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"ticketNumberPattern:\s*['"`]([^'"`]+)['"`]"#).unwrap());
static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"commitFooterLabel:\s*['"`]([^'"`]+)['"`]"#).unwrap());
static LABEL_SHAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").unwrap());

/// Ticket and footer rules for commits on feature branches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchPolicy {
    /// Footer label, e.g. `Closes`.
    pub footer_label: String,
    /// Alternation of accepted ticket prefixes, e.g. `PRJ|ERM`.
    pub ticket_prefix: Option<String>,
    /// Regex fragment for the ticket number, e.g. `[0-9]+`.
    pub ticket_pattern: Option<String>,
}

impl BranchPolicy {
    pub fn new(
        footer_label: &str,
        ticket_prefix: Option<String>,
        ticket_pattern: Option<String>,
    ) -> Self {
        Self {
            footer_label: sanitize_footer_label(footer_label),
            ticket_prefix: ticket_prefix.filter(|value| !value.trim().is_empty()),
            ticket_pattern: ticket_pattern.filter(|value| !value.trim().is_empty()),
        }
    }

    /// Parse the `const config = { ... };` object of a branch-name config file.
    ///
    /// Absent keys mean "not configured": no prefix or pattern disables the
    /// ticket requirement, a missing label falls back to `Closes`.
    pub fn parse_config_source(source: &str) -> Result<Self> {
        let object = CONFIG_OBJECT_RE
            .captures(source)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("could not find config object in branch-name config"))?;

        let capture = |re: &Regex| {
            re.captures(object)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        };
        let label = capture(&LABEL_RE).unwrap_or_else(|| DEFAULT_FOOTER_LABEL.to_string());
        Ok(Self::new(&label, capture(&PREFIX_RE), capture(&PATTERN_RE)))
    }

    /// Tickets are enforced only when both prefix and number pattern are set.
    pub fn requires_ticket(&self) -> bool {
        self.ticket_prefix.is_some() && self.ticket_pattern.is_some()
    }

    /// Case-insensitive `((?:PREFIX)-PATTERN)` regex, if tickets are enforced.
    pub fn ticket_regex(&self) -> Result<Option<Regex>> {
        let (Some(prefix), Some(pattern)) = (&self.ticket_prefix, &self.ticket_pattern) else {
            return Ok(None);
        };
        let source = format!("((?:{prefix})-{pattern})");
        let re = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("compile ticket regex {source}"))?;
        Ok(Some(re))
    }

    /// Ticket id embedded in `branch`, if any.
    pub fn extract_ticket(&self, branch: &str) -> Result<Option<String>> {
        let Some(re) = self.ticket_regex()? else {
            return Ok(None);
        };
        Ok(re
            .captures(branch)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string()))
    }

    /// Footer line the commit-msg hook must append for a commit on `branch`.
    pub fn expected_footer(&self, branch: &str) -> Result<Option<String>> {
        Ok(self
            .extract_ticket(branch)?
            .map(|ticket| format!("{}: {}", self.footer_label, ticket)))
    }

    /// Feature branch name that satisfies the policy, using `ticket_number`.
    ///
    /// Uses the first prefix of the alternation. Returns `None` when tickets
    /// are not enforced.
    pub fn sample_valid_branch(&self, ticket_number: &str) -> Option<String> {
        let prefix = self.ticket_prefix.as_deref()?.split('|').next()?.trim();
        self.ticket_pattern.as_ref()?;
        Some(format!("feature/{prefix}-{ticket_number}-test-feature"))
    }
}

/// Labels must look like an identifier; anything else falls back to `Closes`.
pub fn sanitize_footer_label(label: &str) -> String {
    let label = label.trim();
    if LABEL_SHAPE_RE.is_match(label) {
        label.to_string()
    } else {
        DEFAULT_FOOTER_LABEL.to_string()
    }
}
