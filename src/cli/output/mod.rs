//! Output formatting for CLI commands.
//!
//! Every command result implements [`CommandOutput`] and is printed either
//! as human-readable text (usually a comfy-table) or as pretty JSON.

/// comfy-table rendering.
pub mod table;

use serde::Serialize;

pub use table::TableFormatter;

/// Result of a command, printable as text or JSON.
pub trait CommandOutput: Serialize {
    /// Text shown without `--json`.
    fn to_human(&self) -> String;

    /// Value shown with `--json`.
    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Print `result` to stdout in the requested format.
pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Truncate a string to at most `max_len` characters, appending "..." if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
