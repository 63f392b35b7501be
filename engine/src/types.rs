//! Core data types shared between the parser, the compositor and the
//! render pipeline.
//!
//! # Overview
//!
//! - [`TodoItem`]: one display row of the to-do block
//! - [`TimetableBlock`]: the formatted timetable and holiday text, or the
//!   placeholder used when fetching failed
//! - [`RenderJob`]: everything gathered for a single render pass

use chrono::{DateTime, Local};
use serde::Serialize;
use uuid::Uuid;

/// Indent offset that marks a synthetic continuation row produced by wrapping.
pub const CONTINUATION_INDENT: f32 = 0.25;

/// A single structured row of the to-do block.
///
/// Rows are produced by [`crate::parser::parse`] in source order. A long
/// entry may yield two rows: the entry itself and a continuation row with an
/// empty prefix and an indent of `parent + 0.25`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TodoItem {
    /// Leading marker, e.g. `-`. Empty for plain text and continuation rows.
    pub prefix: String,

    /// Remaining content, already fitted to the render width.
    pub text: String,

    /// Whether this item, or an ancestor, is marked done.
    pub checked: bool,

    /// Indentation level. Integral for list depth; a fractional `.25` only
    /// ever marks a continuation row.
    pub indent: f32,

    /// Whether the row is drawn with a strike line.
    ///
    /// Always implies `checked`. Top-level checked items are not struck
    /// through, only their descendants.
    pub strikethrough: bool,
}

impl TodoItem {
    /// Returns the text as drawn on the canvas: `"{prefix} {text}"`.
    #[must_use]
    pub fn display_text(&self) -> String {
        format!("{} {}", self.prefix, self.text)
    }

    /// Returns `true` if this row was synthesised by line wrapping.
    #[must_use]
    pub fn is_continuation(&self) -> bool {
        self.indent.fract() != 0.0
    }
}

/// The timetable and holiday text regions for one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimetableBlock {
    /// Fetched and formatted successfully.
    Available {
        /// Lesson lines, rendered top-left.
        lessons: Vec<String>,
        /// Holiday entries (the last one carries the weather text), rendered
        /// top-right.
        holidays: Vec<String>,
    },

    /// Fetching failed; each region shows a single placeholder entry.
    Unavailable {
        /// Placeholder for the lesson region.
        lessons: Vec<String>,
        /// Placeholder for the holiday region, still carrying the weather text.
        holidays: Vec<String>,
    },
}

impl TimetableBlock {
    /// Lesson lines to render.
    #[must_use]
    pub fn lessons(&self) -> &[String] {
        match self {
            Self::Available { lessons, .. } | Self::Unavailable { lessons, .. } => lessons,
        }
    }

    /// Holiday entries to render.
    #[must_use]
    pub fn holidays(&self) -> &[String] {
        match self {
            Self::Available { holidays, .. } | Self::Unavailable { holidays, .. } => holidays,
        }
    }

    /// Returns `true` if the block holds real fetched data.
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }
}

/// The text gathered for one render pass.
///
/// Created at the start of a render and dropped once the image has been
/// persisted and handed to the wallpaper sink.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Identifier used to correlate the log lines of one render.
    pub id: Uuid,

    /// When the render started.
    pub started_at: DateTime<Local>,

    /// Parsed to-do rows.
    pub todos: Vec<TodoItem>,

    /// Timetable and holiday text.
    pub timetable: TimetableBlock,
}

impl RenderJob {
    /// Creates the job for render `id`, started at `started_at`.
    #[must_use]
    pub fn new(
        id: Uuid,
        started_at: DateTime<Local>,
        todos: Vec<TodoItem>,
        timetable: TimetableBlock,
    ) -> Self {
        Self {
            id,
            started_at,
            todos,
            timetable,
        }
    }

    /// Returns `true` if there is nothing worth drawing.
    ///
    /// A failed timetable fetch counts as empty even though its placeholder
    /// lines would be drawn.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.todos.is_empty() && !self.timetable.is_available()
    }
}
