//! Utility functions for display formatting.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{format_date, format_mean, format_trend, truncate_string};
