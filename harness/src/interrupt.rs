//! Ctrl-C handling for the whole run.
//!
//! The handler only records that an interrupt arrived. The foreground child
//! gets the same SIGINT and dies on its own; [`check`] then turns the recorded
//! request into [`HarnessError::Interrupted`] so the current step unwinds and
//! `main` exits with the failure code.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};

use crate::error::HarnessError;

static REQUESTED: AtomicBool = AtomicBool::new(false);

/// Install the process-wide SIGINT handler. Call once, from `main`.
pub fn install() -> Result<()> {
    ctrlc::set_handler(|| REQUESTED.store(true, Ordering::SeqCst))
        .context("install interrupt handler")
}

/// Whether the user pressed Ctrl-C during this run.
pub fn requested() -> bool {
    REQUESTED.load(Ordering::SeqCst)
}

/// Fail with [`HarnessError::Interrupted`] once an interrupt was requested.
pub fn check() -> Result<(), HarnessError> {
    if requested() {
        return Err(HarnessError::Interrupted);
    }
    Ok(())
}
