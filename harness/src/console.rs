//! User-facing progress lines.
//!
//! This is product output: every step reports through `[INFO]`, `[SUCCESS]`,
//! `[WARNING]` and `[ERROR]` lines regardless of `RUST_LOG`. Diagnostics for
//! debugging the harness itself go through `tracing` (see [`crate::logging`]).

use colored::{Color, Colorize};

/// Severity of a console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Success => "SUCCESS",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        }
    }

    fn color(self) -> Color {
        match self {
            Level::Info => Color::Blue,
            Level::Success => Color::Green,
            Level::Warning => Color::Yellow,
            Level::Error => Color::Red,
        }
    }
}

/// Prints tagged status lines, optionally colored.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    use_colors: bool,
}

impl Console {
    /// Colors are disabled when `use_colors` is false or `NO_COLOR` is set.
    pub fn new(use_colors: bool) -> Self {
        Self {
            use_colors: use_colors && std::env::var_os("NO_COLOR").is_none(),
        }
    }

    pub fn plain() -> Self {
        Self { use_colors: false }
    }

    pub fn format_line(&self, level: Level, message: &str) -> String {
        let tag = format!("[{}]", level.label());
        if self.use_colors {
            format!("{} {}", tag.color(level.color()), message)
        } else {
            format!("{tag} {message}")
        }
    }

    pub fn info(&self, message: impl AsRef<str>) {
        println!("{}", self.format_line(Level::Info, message.as_ref()));
    }

    pub fn success(&self, message: impl AsRef<str>) {
        println!("{}", self.format_line(Level::Success, message.as_ref()));
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        println!("{}", self.format_line(Level::Warning, message.as_ref()));
    }

    pub fn error(&self, message: impl AsRef<str>) {
        eprintln!("{}", self.format_line(Level::Error, message.as_ref()));
    }

    /// Untagged, indented detail line (listings, status fields).
    pub fn detail(&self, message: impl AsRef<str>) {
        println!("  {}", message.as_ref());
    }
}

/// Check mark used in listings.
pub fn mark(ok: bool) -> &'static str {
    if ok { "✓" } else { "✗" }
}
