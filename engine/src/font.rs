//! Font loading and text drawing with per-glyph fallback.
//!
//! A single font rarely covers both monospaced text and the emoji that
//! show up in to-do lists. [`FontStack`] holds an ordered list of fonts and
//! draws each character with the first font that has a glyph for it.

use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontVec, GlyphId, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use tracing::{debug, warn};

use crate::error::{EngineError, Result};
use crate::layout::TextPainter;

/// An ordered font fallback chain at a fixed pixel size.
pub struct FontStack {
    fonts: Vec<FontVec>,
    scale: PxScale,
}

impl std::fmt::Debug for FontStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontStack")
            .field("fonts", &self.fonts.len())
            .field("scale", &self.scale)
            .finish()
    }
}

impl FontStack {
    /// Loads every readable font from `paths`, keeping their order.
    ///
    /// Unreadable or invalid fonts are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AssetMissing`] if none of the paths yields a
    /// usable font.
    pub fn load(paths: &[PathBuf], size: f32) -> Result<Self> {
        let fonts: Vec<FontVec> = paths.iter().filter_map(|p| load_font(p)).collect();

        if fonts.is_empty() {
            let tried = paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(EngineError::AssetMissing {
                path: paths.first().cloned().unwrap_or_default(),
                reason: format!("no usable font among [{tried}]"),
            });
        }

        debug!(count = fonts.len(), size, "Loaded font stack");
        Ok(Self::from_fonts(fonts, size))
    }

    /// Builds a stack from already loaded fonts.
    #[must_use]
    pub fn from_fonts(fonts: Vec<FontVec>, size: f32) -> Self {
        Self {
            fonts,
            scale: PxScale::from(size),
        }
    }

    /// Index of the first font with a glyph for `c`, or the primary font.
    fn font_for(&self, c: char) -> usize {
        self.fonts
            .iter()
            .position(|f| f.glyph_id(c) != GlyphId(0))
            .unwrap_or(0)
    }

    /// Splits `text` into maximal runs drawn by the same font.
    fn runs<'t>(&self, text: &'t str) -> Vec<(usize, &'t str)> {
        let mut runs = Vec::new();
        let mut start = 0;
        let mut current = None;

        for (idx, c) in text.char_indices() {
            let font = self.font_for(c);
            match current {
                Some(active) if active == font => {}
                Some(active) => {
                    runs.push((active, &text[start..idx]));
                    start = idx;
                    current = Some(font);
                }
                None => current = Some(font),
            }
        }

        if let Some(active) = current {
            runs.push((active, &text[start..]));
        }
        runs
    }

    /// Horizontal advance of `text` set in a single font.
    fn advance(&self, font_idx: usize, text: &str) -> f32 {
        let font = self.fonts[font_idx].as_scaled(self.scale);
        let mut width = 0.0;
        let mut previous: Option<GlyphId> = None;

        for c in text.chars() {
            let id = font.glyph_id(c);
            if let Some(prev) = previous {
                width += font.kern(prev, id);
            }
            width += font.h_advance(id);
            previous = Some(id);
        }
        width
    }
}

impl TextPainter for FontStack {
    fn measure(&self, text: &str) -> u32 {
        let width: f32 = self
            .runs(text)
            .into_iter()
            .map(|(idx, run)| self.advance(idx, run))
            .sum();
        width.ceil() as u32
    }

    fn draw(&self, canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, text: &str) {
        let mut cursor = x as f32;
        for (idx, run) in self.runs(text) {
            draw_text_mut(canvas, color, cursor.round() as i32, y, self.scale, &self.fonts[idx], run);
            cursor += self.advance(idx, run);
        }
    }
}

fn load_font(path: &Path) -> Option<FontVec> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Font not readable, skipping");
            return None;
        }
    };

    match FontVec::try_from_vec(data) {
        Ok(font) => {
            debug!(path = %path.display(), "Loaded font");
            Some(font)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Invalid font file, skipping");
            None
        }
    }
}
