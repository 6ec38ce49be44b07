//! Styling for terminal output.
//!
//! Uses the anstyle ecosystem:
//! - anstream for auto-detecting color support
//! - anstyle for composable styling
//!
//! Styles are used as `{ERROR}text{ERROR:#}`.

use anstyle::{AnsiColor, Color, Style};

/// Auto-detecting println that respects NO_COLOR, CLICOLOR_FORCE, and terminal capabilities
pub use anstream::println;

/// Auto-detecting eprintln that respects NO_COLOR, CLICOLOR_FORCE, and terminal capabilities
pub use anstream::eprintln;

/// Auto-detecting eprint that respects NO_COLOR, CLICOLOR_FORCE, and terminal capabilities
pub use anstream::eprint;

/// Error style (red)
pub const ERROR: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red)));

/// Bold error style, for names embedded in error messages
pub const ERROR_BOLD: Style = ERROR.bold();

/// Hint style (dimmed)
pub const HINT: Style = Style::new().dimmed();

/// Progress style (cyan)
pub const PROGRESS: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan)));

/// Success style (green)
pub const SUCCESS: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green)));

/// Secondary information (bright black)
pub const SECONDARY: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack)));

/// Background for quoted content such as git's stderr
pub const GUTTER: Style = Style::new().bg_color(Some(Color::Ansi(AnsiColor::BrightWhite)));

pub const ERROR_EMOJI: &str = "❌";
pub const HINT_EMOJI: &str = "💡";
pub const PROGRESS_EMOJI: &str = "🔄";
pub const SUCCESS_EMOJI: &str = "✅";

/// Prefix every line of `content` with a gutter bar.
///
/// No trailing newline; callers separate blocks themselves.
pub fn format_with_gutter(content: &str) -> String {
    content
        .lines()
        .map(|line| format!("{GUTTER} {GUTTER:#} {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
