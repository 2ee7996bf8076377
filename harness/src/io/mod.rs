//! Side-effecting adapters: configuration files, git and process execution.

pub mod config;
pub mod git;
pub mod process;
