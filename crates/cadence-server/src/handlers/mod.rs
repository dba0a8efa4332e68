//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod files;
pub mod history;
pub mod recurring;
pub mod stats;
pub mod transactions;

// Re-export all handlers for use in router
pub use files::*;
pub use history::*;
pub use recurring::*;
pub use stats::*;
pub use transactions::*;
