//! Expected-artifact manifests and missing-path collection.

/// Files that must exist in a project after a successful integration.
pub const DEFAULT_EXPECTED_ARTIFACTS: [&str; 10] = [
    "tools/git-hooks/hooks/commit-msg",
    "tools/git-hooks/hooks/pre-commit",
    "tools/git-hooks/hooks/pre-push",
    "tools/git-hooks/hooks/commit-msg.ts",
    "tools/git-hooks/hooks/pre-commit.ts",
    "tools/git-hooks/hooks/pre-push.ts",
    "tools/git-hooks/shared/utils.ts",
    "validate-branch-name.config.cjs",
    "package.json",
    "renovate.json",
];

/// Files the interactive integration must produce in an empty directory.
pub const DEFAULT_INTERACTIVE_ARTIFACTS: [&str; 13] = [
    "package.json",
    "commitlint.config.ts",
    "validate-branch-name.config.cjs",
    "pnpm-workspace.yaml",
    "ecs.php",
    "rector.php",
    "phpstan.neon.dist",
    "psalm.xml",
    ".editorconfig",
    ".booster-version",
    "documentation/openapi.yml",
    "tools/git-hooks/hooks/commit-msg",
    "tools/git-hooks/shared/utils.ts",
];

/// Return every manifest entry for which `exists` is false, in manifest order.
///
/// The whole manifest is always scanned so a report lists all gaps at once.
pub fn missing_entries<S, F>(expected: &[S], exists: F) -> Vec<String>
where
    S: AsRef<str>,
    F: Fn(&str) -> bool,
{
    expected
        .iter()
        .map(AsRef::as_ref)
        .filter(|entry| !exists(entry))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_every_missing_entry_in_order() {
        let present = ["package.json", "renovate.json"];
        let missing = missing_entries(&DEFAULT_EXPECTED_ARTIFACTS, |entry| {
            present.contains(&entry)
        });
        assert_eq!(missing.len(), DEFAULT_EXPECTED_ARTIFACTS.len() - 2);
        assert_eq!(missing[0], "tools/git-hooks/hooks/commit-msg");
        assert_eq!(
            missing.last().map(String::as_str),
            Some("validate-branch-name.config.cjs")
        );
    }

    #[test]
    fn nothing_missing_when_all_exist() {
        let missing = missing_entries(&DEFAULT_EXPECTED_ARTIFACTS, |_| true);
        assert!(missing.is_empty());
    }
}
