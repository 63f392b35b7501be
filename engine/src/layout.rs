//! Layout compositor.
//!
//! Places the three text blocks onto the base image:
//!
//! - **Timetable** lines top-left, one per [`Layout::line_spacing`].
//! - **Holiday** entries top-right, right-aligned to a fixed inset, with
//!   [`Layout::holiday_extra_spacing`] more room per entry than the timetable.
//!   Entries may span several lines.
//! - **Todos** below, starting at whichever is lower: two fifths of the image
//!   height, or 13px below the last timetable line. Each row is indented by
//!   40px per level, dimmed when checked, and struck through when flagged.
//!
//! All offsets are fixed constants in [`Layout`]; nothing is derived from the
//! content except the todo start row and the right alignment of holidays.
//!
//! Placement ([`plan`]) is separated from drawing so it can be inspected
//! without a font or an image.

use std::path::Path;

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_line_segment_mut;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::types::TodoItem;

/// Color of regular text.
pub const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Color of checked todo rows.
pub const DIMMED_COLOR: Rgba<u8> = Rgba([180, 180, 180, 255]);

/// Measures and draws text onto a canvas.
///
/// Implemented by [`crate::font::FontStack`]; tests substitute simpler
/// painters.
pub trait TextPainter: Send + Sync {
    /// Width of `text` in pixels when drawn.
    fn measure(&self, text: &str) -> u32;

    /// Draws `text` with its top-left corner at `(x, y)`.
    fn draw(&self, canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, text: &str);
}

/// Fixed placement constants, in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// Left edge of the timetable block.
    pub timetable_x: i32,
    /// Top of the timetable block.
    pub timetable_y: i32,
    /// Distance between timetable lines.
    pub line_spacing: i32,
    /// Distance between the right image edge and the holiday text.
    pub holidays_right_inset: i32,
    /// Top of the holiday block.
    pub holidays_y: i32,
    /// Extra distance between holiday entries on top of `line_spacing`.
    pub holiday_extra_spacing: i32,
    /// Distance between the lines inside one multi-line entry.
    pub multiline_spacing: i32,
    /// Left edge of top-level todo rows.
    pub todo_x: i32,
    /// Distance between todo rows.
    pub todo_line_spacing: i32,
    /// Horizontal offset per indent level.
    pub indent_width: f32,
    /// Minimum gap between the timetable and the first todo row.
    pub todo_gap: i32,
    /// Vertical offset of the strike line from the row top.
    pub strike_offset: i32,
    /// Thickness of the strike line.
    pub strike_width: i32,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            timetable_x: 850,
            timetable_y: 50,
            line_spacing: 37,
            holidays_right_inset: 50,
            holidays_y: 50,
            holiday_extra_spacing: 20,
            multiline_spacing: 36,
            todo_x: 850,
            todo_line_spacing: 32,
            indent_width: 40.0,
            todo_gap: 13,
            strike_offset: 15,
            strike_width: 2,
        }
    }
}

impl Layout {
    /// Y coordinate of the first todo row.
    ///
    /// `max(2/5 of height, last timetable line + gap)`, where the last line
    /// position is one spacing past the final timetable row.
    #[must_use]
    pub fn todo_start(&self, image_height: u32, timetable_lines: usize) -> i32 {
        let two_fifths = 2 * (image_height as i32 / 5);
        let last_timetable_y = self.timetable_y + timetable_lines as i32 * self.line_spacing;
        two_fifths.max(last_timetable_y + self.todo_gap)
    }
}

/// A horizontal line drawn through a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strike {
    /// Y coordinate of the line.
    pub y: i32,
    /// Length of the line.
    pub width: u32,
}

/// One piece of text placed on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: i32,
    pub y: i32,
    pub text: String,
    pub color: Rgba<u8>,
    pub strike: Option<Strike>,
}

/// Computes the position of every piece of text.
///
/// Runs are returned in drawing order: timetable, todos, holidays.
pub fn plan(
    layout: &Layout,
    image_size: (u32, u32),
    timetable: &[String],
    holidays: &[String],
    todos: &[TodoItem],
    painter: &dyn TextPainter,
) -> Vec<TextRun> {
    let (width, height) = image_size;
    let mut runs = Vec::new();

    for (i, lesson) in timetable.iter().enumerate() {
        let y = layout.timetable_y + i as i32 * layout.line_spacing;
        for (j, line) in lesson.split('\n').enumerate() {
            if line.is_empty() {
                continue;
            }
            runs.push(TextRun {
                x: layout.timetable_x,
                y: y + j as i32 * layout.multiline_spacing,
                text: line.to_string(),
                color: TEXT_COLOR,
                strike: None,
            });
        }
    }

    let todo_start = layout.todo_start(height, timetable.len());
    for (row, item) in todos.iter().enumerate() {
        let x = layout.todo_x + (item.indent * layout.indent_width).round() as i32;
        let y = todo_start + row as i32 * layout.todo_line_spacing;
        let text = item.display_text();
        let strike = item.strikethrough.then(|| Strike {
            y: y + layout.strike_offset,
            width: painter.measure(&text),
        });

        runs.push(TextRun {
            x,
            y,
            text,
            color: if item.checked { DIMMED_COLOR } else { TEXT_COLOR },
            strike,
        });
    }

    let right_edge = width as i32 - layout.holidays_right_inset;
    let entry_spacing = layout.line_spacing + layout.holiday_extra_spacing;
    for (i, entry) in holidays.iter().enumerate() {
        let y = layout.holidays_y + i as i32 * entry_spacing;
        for (j, line) in entry.split('\n').enumerate() {
            if line.is_empty() {
                continue;
            }
            runs.push(TextRun {
                x: right_edge - painter.measure(line) as i32,
                y: y + j as i32 * layout.multiline_spacing,
                text: line.to_string(),
                color: TEXT_COLOR,
                strike: None,
            });
        }
    }

    runs
}

/// Opens the base image as RGBA.
///
/// # Errors
///
/// Returns [`EngineError::AssetMissing`] if the file is missing or cannot be
/// decoded.
pub fn open_base(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path).map_err(|e| EngineError::AssetMissing {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(image.to_rgba8())
}

/// Draws planned runs onto `canvas`.
pub fn draw(canvas: &mut RgbaImage, runs: &[TextRun], layout: &Layout, painter: &dyn TextPainter) {
    for run in runs {
        painter.draw(canvas, run.x, run.y, run.color, &run.text);

        if let Some(strike) = run.strike {
            let start_x = run.x as f32;
            let end_x = (run.x + strike.width as i32) as f32;
            for dy in 0..layout.strike_width.max(1) {
                let y = (strike.y + dy) as f32;
                draw_line_segment_mut(canvas, (start_x, y), (end_x, y), run.color);
            }
        }
    }
}

/// Composes the wallpaper: opens the base image and draws all text onto it.
///
/// # Errors
///
/// Returns [`EngineError::AssetMissing`] if the base image cannot be opened.
pub fn compose(
    layout: &Layout,
    painter: &dyn TextPainter,
    base_path: &Path,
    timetable: &[String],
    holidays: &[String],
    todos: &[TodoItem],
) -> Result<RgbaImage> {
    let mut canvas = open_base(base_path)?;
    let runs = plan(layout, canvas.dimensions(), timetable, holidays, todos, painter);

    debug!(
        width = canvas.width(),
        height = canvas.height(),
        runs = runs.len(),
        "Composing wallpaper"
    );

    draw(&mut canvas, &runs, layout, painter);
    Ok(canvas)
}
