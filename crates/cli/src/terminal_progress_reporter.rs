//! Terminal progress reporting and output formatting
//!
//! Status lines carry an emoji prefix, with a plain-text fallback for
//! terminals that can't show one, and are colored unless colors are turned
//! off.

use std::fmt::Display;

use console::{Emoji, style};

// Define emojis with fallbacks for terminals that don't support Unicode
static ERROR_EMOJI: Emoji<'_, '_> = Emoji("❌ ", "[E] ");
static INFO_EMOJI: Emoji<'_, '_> = Emoji("ℹ️ ", "[I] ");
static PROGRESS_EMOJI: Emoji<'_, '_> = Emoji("• ", " • ");
static SUCCESS_EMOJI: Emoji<'_, '_> = Emoji("✅ ", "OK ");
static WARN_EMOJI: Emoji<'_, '_> = Emoji("⚠️ ", "[W] ");

/// Types of status messages that can be displayed to the user
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum MessageType {
    Error,
    Info,
    /// An action about to run
    Progress,
    Success,
    /// Some items failed while others went through
    Warning,
}

/// Terminal progress reporter for consistent CLI output formatting
#[derive(Debug, Clone, Copy)]
pub struct TerminalProgressReporter {
    use_colors: bool,
}

impl TerminalProgressReporter {
    #[must_use]
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Format a status line with appropriate styling and prefix
    pub(crate) fn status_line(self, message_type: MessageType, message: impl Display) -> String {
        let prefix = match message_type {
            MessageType::Error => ERROR_EMOJI,
            MessageType::Info => INFO_EMOJI,
            MessageType::Progress => PROGRESS_EMOJI,
            MessageType::Success => SUCCESS_EMOJI,
            MessageType::Warning => WARN_EMOJI,
        };

        let formatted_message = if self.use_colors {
            match message_type {
                MessageType::Error => style(message).for_stderr().red().bold().to_string(),
                MessageType::Info => style(message).blue().to_string(),
                MessageType::Progress => style(message).dim().to_string(),
                MessageType::Success => style(message).green().to_string(),
                MessageType::Warning => style(message).for_stderr().yellow().bold().to_string(),
            }
        } else {
            message.to_string()
        };

        format!("{prefix}{formatted_message}")
    }

    pub(crate) fn format_error(self, message: impl Display) -> String {
        self.status_line(MessageType::Error, message)
    }

    pub(crate) fn format_info(self, message: impl Display) -> String {
        self.status_line(MessageType::Info, message)
    }

    pub(crate) fn format_progress(self, message: impl Display) -> String {
        self.status_line(MessageType::Progress, message)
    }

    pub(crate) fn format_success(self, message: impl Display) -> String {
        self.status_line(MessageType::Success, message)
    }

    pub(crate) fn format_warning(self, message: impl Display) -> String {
        self.status_line(MessageType::Warning, message)
    }

    pub(crate) fn report_info(self, message: impl Display) {
        println!("{}", self.format_info(message));
    }

    pub(crate) fn report_progress(self, message: impl Display) {
        println!("{}", self.format_progress(message));
    }

    pub(crate) fn report_success(self, message: impl Display) {
        println!("{}", self.format_success(message));
    }

    /// Print a formatted warning message to stderr
    pub(crate) fn report_warning(self, message: impl Display) {
        eprintln!("{}", self.format_warning(message));
    }

    /// Print a formatted error message to stderr
    ///
    /// Uses stderr for proper error stream handling in scripts and pipelines.
    pub(crate) fn report_error(self, message: impl Display) {
        eprintln!("{}", self.format_error(message));
    }
}
