//! Interpretation of the runtime's status command output.
//!
//! `ddev status` may exit 0 while no service is healthy, so a zero exit code
//! alone does not count as "up".

/// Substrings that indicate at least one running service.
pub const DEFAULT_RUNNING_INDICATORS: [&str; 6] = [
    "ok",
    "running",
    "healthy",
    "project:",
    "service",
    "docker platform:",
];

/// True iff the status command exited 0 and its output contains an indicator.
///
/// Matching is a case-insensitive substring search.
pub fn indicates_running<S: AsRef<str>>(
    exit_code: Option<i32>,
    output: &str,
    indicators: &[S],
) -> bool {
    if exit_code != Some(0) {
        return false;
    }
    let haystack = output.to_lowercase();
    indicators
        .iter()
        .map(|indicator| indicator.as_ref().to_lowercase())
        .any(|indicator| !indicator.is_empty() && haystack.contains(&indicator))
}
