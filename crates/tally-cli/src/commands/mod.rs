//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init, config) and shared utilities (open_db, load_format)
//! - `import` - Statement text import and dry run
//! - `history` - Import session history

pub mod core;
pub mod history;
pub mod import;

// Re-export command functions for main.rs
pub use core::*;
pub use history::*;
pub use import::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
