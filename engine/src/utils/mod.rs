//! Utility modules for todopaper.
//!
//! # Modules
//!
//! - [`debounce`]: Leading-edge debounce gate for file-change bursts
//! - [`emoji`]: `:shortcode:` expansion for to-do lines
//! - [`logfile`]: Log file trimming

pub mod debounce;
pub mod emoji;
pub mod logfile;

pub use debounce::{Debounce, DEFAULT_DEBOUNCE_MS};
pub use emoji::emojize;
pub use logfile::{trim_log_file, MAX_LOG_LINES, TRIM_LOG_LINES};
