//! todopaper - renders a to-do list, timetable and weather onto the desktop
//! background.
//!
//! # Overview
//!
//! A markdown-ish to-do file is parsed into display rows, combined with the
//! day's lessons, the upcoming holidays and the current weather, drawn onto
//! a base image and set as the wallpaper. Renders are triggered by changes
//! to the to-do file and by a periodic timer; at most one runs at a time.
//!
//! # Modules
//!
//! - [`types`]: Todo rows, timetable text blocks and render jobs
//! - [`parser`]: To-do file parsing with done-propagation and line wrapping
//! - [`layout`]: Text placement and drawing onto the base image
//! - [`font`]: Font loading with per-glyph fallback
//! - [`sources`]: Weather and timetable collaborators
//! - [`pipeline`]: One render pass from file to wallpaper
//! - [`scheduler`]: Debounced, serialized render triggering
//! - [`sink`]: Setting the desktop background
//! - [`watcher`]: File system watcher for the to-do file
//! - [`config`]: Configuration from environment variables
//! - [`error`]: Error types
//! - [`utils`]: Shared utilities (debouncing, emoji, log trimming)

pub mod config;
pub mod error;
pub mod font;
pub mod layout;
pub mod parser;
pub mod pipeline;
pub mod scheduler;
pub mod sink;
pub mod sources;
pub mod types;
pub mod utils;
pub mod watcher;

pub use config::{Config, ConfigError};
pub use error::{EngineError, FetchError, Result};
pub use font::FontStack;
pub use layout::{Layout, TextPainter};
pub use parser::{parse, read_todo_file};
pub use pipeline::{RenderPaths, RenderPipeline};
pub use scheduler::{Renderer, Scheduler, TriggerReason};
pub use sink::{CommandSink, WallpaperSink};
pub use sources::{TimetableSource, TomorrowIo, WeatherSource, WebUntis};
pub use types::{RenderJob, TimetableBlock, TodoItem};
pub use watcher::{FileWatcher, WatchEvent, WatcherError};
