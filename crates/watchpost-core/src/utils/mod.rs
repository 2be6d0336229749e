//! Utility functions for string formatting and manipulation.

pub mod format;

pub use format::{truncate_body, truncate_string};
