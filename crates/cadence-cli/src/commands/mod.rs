//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init, detect) and shared utilities (open_db)
//! - `import` - CSV import and import file management
//! - `recurring` - Pattern review commands (list, show, confirm, reject, label, history)
//! - `serve` - Web server command
//! - `stats` - Spending totals
//! - `transactions` - Transaction listing

pub mod core;
pub mod import;
pub mod recurring;
pub mod serve;
pub mod stats;
pub mod transactions;

// Re-export command functions for main.rs
pub use core::*;
pub use import::*;
pub use recurring::*;
pub use serve::*;
pub use stats::*;
pub use transactions::*;

/// Actor recorded with pattern decisions made from the CLI
pub const CLI_ACTOR: &str = "cli";

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
