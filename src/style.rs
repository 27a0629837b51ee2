//! Terminal emphasis for rendered output
//!
//! Rendering code never emits escape codes directly. It asks an [`Emphasis`]
//! to paint a piece of text with a semantic [`Tone`]; the concrete style is
//! picked once at startup:
//!
//! - [`Emphasis::Plain`] returns text untouched (pipes, files, `NO_COLOR`)
//! - [`Emphasis::Terminal`] wraps text in ANSI styles via `crossterm`

use crossterm::style::Stylize;
use serde::{Deserialize, Serialize};
use std::os::fd::{AsFd, BorrowedFd};

/// What a painted fragment means, independent of how it looks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tone {
    /// `@set` references on the right side of a match
    SetReference,
    /// `jump` and `goto` verbs
    Branch,
    Return,
    Drop,
    Reject,
    Accept,
    /// masquerade, snat, dnat, redirect
    Nat,
    /// The `AND` between match terms
    Connector,
    /// `chain/handle` column
    Handle,
    /// Hook name in a section header
    Hook,
}

/// Emphasis capability passed to the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Emphasis {
    #[default]
    Plain,
    Terminal,
}

impl Emphasis {
    /// Wraps `text` in the style for `tone`. Never changes the text itself.
    pub fn paint(self, text: &str, tone: Tone) -> String {
        match self {
            Emphasis::Plain => text.to_string(),
            Emphasis::Terminal => {
                let styled = match tone {
                    Tone::SetReference => text.magenta(),
                    Tone::Branch => text.dark_magenta(),
                    Tone::Return => text.dark_cyan(),
                    Tone::Drop => text.dark_red(),
                    Tone::Reject => text.red(),
                    Tone::Accept => text.dark_green(),
                    Tone::Nat => text.yellow(),
                    Tone::Connector | Tone::Handle => text.grey(),
                    Tone::Hook => text.yellow().reverse(),
                };
                styled.to_string()
            }
        }
    }

    /// Picks the emphasis for stdout according to `mode`.
    pub fn detect(mode: ColorMode) -> Self {
        Self::for_stream(mode, std::io::stdout().as_fd())
    }

    /// Picks the emphasis for stderr, where log lines go.
    pub fn detect_stderr(mode: ColorMode) -> Self {
        Self::for_stream(mode, std::io::stderr().as_fd())
    }

    fn for_stream(mode: ColorMode, stream: BorrowedFd<'_>) -> Self {
        match mode {
            ColorMode::Always => Emphasis::Terminal,
            ColorMode::Never => Emphasis::Plain,
            ColorMode::Auto => {
                let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
                let is_atty = nix::unistd::isatty(stream).unwrap_or(false);
                if is_atty && !no_color {
                    Emphasis::Terminal
                } else {
                    Emphasis::Plain
                }
            }
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Emphasis::Terminal
    }
}

/// When to emit ANSI styles
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ColorMode {
    /// Only when stdout is a terminal and `NO_COLOR` is unset
    #[default]
    Auto,
    Always,
    Never,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_is_identity() {
        for tone in [Tone::SetReference, Tone::Accept, Tone::Hook, Tone::Connector] {
            assert_eq!(Emphasis::Plain.paint("@blocklist", tone), "@blocklist");
        }
    }

    #[test]
    fn test_terminal_keeps_content() {
        let painted = Emphasis::Terminal.paint("drop", Tone::Drop);
        assert!(painted.contains("drop"));
        assert!(painted.starts_with('\u{1b}'));
        assert_ne!(painted, "drop");
    }

    #[test]
    fn test_detect_forced_modes() {
        assert_eq!(Emphasis::detect(ColorMode::Always), Emphasis::Terminal);
        assert_eq!(Emphasis::detect(ColorMode::Never), Emphasis::Plain);
        assert!(Emphasis::detect_stderr(ColorMode::Always).is_terminal());
        assert!(!Emphasis::detect_stderr(ColorMode::Never).is_terminal());
    }

    #[test]
    fn test_color_mode_serde() {
        let mode: ColorMode = serde_json::from_str("\"never\"").unwrap();
        assert_eq!(mode, ColorMode::Never);
        assert_eq!(ColorMode::Always.to_string(), "always");
    }
}
