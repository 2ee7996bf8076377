//! Failure classification for harness steps.
//!
//! Steps return `anyhow::Result`; the variants here are attached as the root
//! cause so the entry point can map a failure to its exit code with
//! [`exit_code_for`].

use thiserror::Error;

use crate::exit_codes;

/// A classified harness failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HarnessError {
    /// Bad command-line input.
    #[error("usage error: {0}")]
    Usage(String),

    /// Required prior state is absent (no project, runtime down, tool missing).
    #[error("{0}")]
    Precondition(String),

    /// Observed behaviour contradicts the contract under test.
    #[error("{0}")]
    Assertion(String),

    /// A spawned process exited non-zero where success was required.
    #[error("command failed: {} (exit code {})", render_command(program, args), render_code(*code))]
    CommandFailed {
        program: String,
        args: Vec<String>,
        code: Option<i32>,
    },

    /// The user pressed Ctrl-C.
    #[error("Interrupted by user")]
    Interrupted,
}

impl HarnessError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn assertion(msg: impl Into<String>) -> Self {
        Self::Assertion(msg.into())
    }
}

/// Map any error returned by an action to the process exit code.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    match classify(err) {
        Some(HarnessError::Usage(_)) => exit_codes::USAGE,
        _ => exit_codes::FAILURE,
    }
}

/// Return the classified failure behind `err`, if any.
pub fn classify(err: &anyhow::Error) -> Option<&HarnessError> {
    err.chain().find_map(|cause| cause.downcast_ref::<HarnessError>())
}

fn render_command(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        return program.to_string();
    }
    format!("{} {}", program, args.join(" "))
}

fn render_code(code: Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    #[test]
    fn usage_maps_to_usage_exit_code() {
        let err = anyhow::Error::new(HarnessError::Usage("bad action".into()));
        assert_eq!(exit_code_for(&err), exit_codes::USAGE);
    }

    #[test]
    fn other_failures_map_to_failure_exit_code() {
        let precondition = anyhow::Error::new(HarnessError::precondition("no project"));
        let io = anyhow::anyhow!("disk on fire");
        assert_eq!(exit_code_for(&precondition), exit_codes::FAILURE);
        assert_eq!(exit_code_for(&io), exit_codes::FAILURE);
    }

    #[test]
    fn interrupt_is_a_plain_failure() {
        let err = Err::<(), _>(HarnessError::Interrupted)
            .context("run bash integrate_booster.sh")
            .expect_err("error");
        assert_eq!(classify(&err), Some(&HarnessError::Interrupted));
        assert_eq!(exit_code_for(&err), exit_codes::FAILURE);
        assert_eq!(HarnessError::Interrupted.to_string(), "Interrupted by user");
    }

    #[test]
    fn classify_finds_cause_behind_context() {
        let err = Err::<(), _>(HarnessError::assertion("footer missing"))
            .context("test hooks")
            .expect_err("error");
        assert_eq!(
            classify(&err),
            Some(&HarnessError::Assertion("footer missing".into()))
        );
    }

    #[test]
    fn command_failed_renders_program_args_and_code() {
        let err = HarnessError::CommandFailed {
            program: "git".into(),
            args: vec!["commit".into(), "-m".into(), "x".into()],
            code: Some(1),
        };
        assert_eq!(
            err.to_string(),
            "command failed: git commit -m x (exit code 1)"
        );
    }
}
