//! Deterministic, pure logic shared by the harness steps.
//!
//! Nothing in here spawns processes. Functions take already-observed data
//! (file contents, command output, path listings) and return verdicts, so
//! each rule can be tested without a ddev project.

pub mod branch_policy;
pub mod manifest;
pub mod renovate;
pub mod run_config;
pub mod runtime_status;
pub mod workflows;
