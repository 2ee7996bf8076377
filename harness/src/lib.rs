//! Integration-test harness for the PHP booster.
//!
//! The harness drives the booster through a realistic project lifecycle:
//! scaffold a Laravel or Symfony project inside ddev, run the integration
//! script, verify the files it produced and exercise the installed git hooks
//! with real commits.
//!
//! - **[`core`]**: Pure, deterministic rules (indicator matching, branch
//!   policy, manifest diffing, renovate and workflow checks). No I/O.
//! - **[`io`]**: Side-effecting adapters (config file, git, process
//!   execution). Every external command goes through
//!   [`io::process::CommandRunner`] so steps can be tested with a scripted
//!   runner.
//!
//! Step modules ([`env_check`], [`provision`], [`integrate`], [`verify`],
//! [`hooks`], [`interactive`], [`status`], [`clean`]) combine both and are
//! dispatched by the [`orchestrator`].

pub mod clean;
pub mod console;
pub mod core;
pub mod env_check;
pub mod error;
pub mod exit_codes;
pub mod hooks;
pub mod integrate;
pub mod interactive;
pub mod interrupt;
pub mod io;
pub mod logging;
pub mod orchestrator;
pub mod provision;
pub mod state;
pub mod status;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod verify;
