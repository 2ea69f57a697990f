//! Presentation helpers: value formatting and category grouping.

mod classify;
mod format;

pub use classify::{Category, CategoryKind, categorize, find_category};
pub use format::{
    format_duration, format_file_size, format_key, format_timestamp, format_value,
};
