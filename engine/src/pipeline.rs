//! One render pass, from reading the to-do file to applying the wallpaper.
//!
//! The steps run strictly in sequence:
//!
//! 1. read and parse the to-do file (missing file: empty list)
//! 2. fetch the weather (failure: inline error text)
//! 3. fetch the timetable and fold the weather text into the holiday block
//!    (failure: placeholder block)
//! 4. skip the pass with [`EngineError::NothingToRender`] if nothing is left
//! 5. compose the image and atomically replace the output file
//! 6. hand the file to the wallpaper sink (failure is logged only)

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use image::{ImageFormat, RgbaImage};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::layout::{self, Layout, TextPainter};
use crate::parser::read_todo_file;
use crate::scheduler::Renderer;
use crate::sink::WallpaperSink;
use crate::sources::timetable::{format_blocks, unavailable_block};
use crate::sources::{TimetableSource, WeatherSource};
use crate::types::{RenderJob, TodoItem};

/// Files read and written by a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPaths {
    /// To-do list source.
    pub todo: PathBuf,
    /// Base image.
    pub background: PathBuf,
    /// Finished wallpaper.
    pub output: PathBuf,
}

impl RenderPaths {
    /// Takes the paths from the loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            todo: config.todo_path.clone(),
            background: config.background_path.clone(),
            output: config.output_path.clone(),
        }
    }
}

/// Gathers text, composes the wallpaper and applies it.
pub struct RenderPipeline {
    paths: RenderPaths,
    layout: Layout,
    painter: Arc<dyn TextPainter>,
    weather: Arc<dyn WeatherSource>,
    timetable: Arc<dyn TimetableSource>,
    sink: Arc<dyn WallpaperSink>,
}

impl RenderPipeline {
    /// Creates a pipeline with the default layout.
    pub fn new(
        paths: RenderPaths,
        painter: Arc<dyn TextPainter>,
        weather: Arc<dyn WeatherSource>,
        timetable: Arc<dyn TimetableSource>,
        sink: Arc<dyn WallpaperSink>,
    ) -> Self {
        Self {
            paths,
            layout: Layout::default(),
            painter,
            weather,
            timetable,
            sink,
        }
    }

    /// Replaces the placement constants.
    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Returns the configured paths.
    #[must_use]
    pub fn paths(&self) -> &RenderPaths {
        &self.paths
    }

    /// Reads the to-do file. Any failure yields an empty list.
    #[must_use]
    pub fn read_todos(&self) -> Vec<TodoItem> {
        match read_todo_file(&self.paths.todo) {
            Ok(items) => items,
            Err(EngineError::NotFound(path)) => {
                warn!(path = %path.display(), "To-do file not found, rendering without todos");
                Vec::new()
            }
            Err(e) => {
                error!(path = %self.paths.todo.display(), error = %e, "Failed to read to-do file");
                Vec::new()
            }
        }
    }

    /// Collects all text for the render `id`.
    ///
    /// The job is stamped before anything is read or fetched. Never fails;
    /// collaborator errors become visible placeholder text.
    pub async fn gather(&self, id: Uuid) -> RenderJob {
        let started_at = Local::now();
        let todos = self.read_todos();

        let stamp = started_at.format("%H:%M:%S").to_string();
        let weather = match self.weather.current(&stamp).await {
            Ok(text) => text,
            Err(e) => {
                let text = format!("Error fetching weather data: {e}");
                warn!(error = %EngineError::FetchFailed(e), "Weather fetch failed");
                text
            }
        };

        let today = started_at.date_naive();
        let timetable = match self.timetable.fetch(today).await {
            Ok(data) => format_blocks(&data, &weather, today),
            Err(e) => {
                warn!(error = %EngineError::FetchFailed(e), "Timetable fetch failed");
                unavailable_block(&weather)
            }
        };

        RenderJob::new(id, started_at, todos, timetable)
    }

    /// Composes, persists and applies a gathered job.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NothingToRender`] for an empty job, in which
    /// case the output file is not touched, or the composition or write
    /// error. A failing sink is logged and does not fail the render.
    pub async fn render_job(&self, job: RenderJob) -> Result<PathBuf> {
        if job.is_empty() {
            return Err(EngineError::NothingToRender);
        }

        debug!(
            todos = job.todos.len(),
            lessons = job.timetable.lessons().len(),
            holidays = job.timetable.holidays().len(),
            timetable_available = job.timetable.is_available(),
            "Render job gathered"
        );

        let layout = self.layout.clone();
        let painter = Arc::clone(&self.painter);
        let background = self.paths.background.clone();
        let output = self.paths.output.clone();
        let temp_suffix = job.id.simple().to_string();

        tokio::task::spawn_blocking(move || {
            let image = layout::compose(
                &layout,
                painter.as_ref(),
                &background,
                job.timetable.lessons(),
                job.timetable.holidays(),
                &job.todos,
            )?;
            persist_png(&image, &output, &temp_suffix)
        })
        .await
        .map_err(std::io::Error::other)??;

        info!(path = %self.paths.output.display(), "Wallpaper image written");

        if let Err(e) = self.sink.apply(&self.paths.output).await {
            error!(error = %e, "Failed to apply wallpaper, image kept on disk");
        }

        Ok(self.paths.output.clone())
    }
}

#[async_trait]
impl Renderer for RenderPipeline {
    async fn render(&self, job_id: Uuid) -> Result<PathBuf> {
        let job = self.gather(job_id).await;
        self.render_job(job).await
    }
}

/// Encodes `image` as PNG next to `output` and renames it into place.
///
/// The output directory is created if needed. Readers of `output` never see
/// a partially written file.
///
/// # Errors
///
/// Returns an error if encoding, writing or renaming fails. The temporary
/// file is removed on failure.
pub fn persist_png(image: &RgbaImage, output: &Path, temp_suffix: &str) -> Result<()> {
    let dir = match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let file_name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "wallpaper.png".to_string());
    let temp = dir.join(format!(".{file_name}.{temp_suffix}.tmp"));

    let written = image
        .save_with_format(&temp, ImageFormat::Png)
        .map_err(EngineError::from)
        .and_then(|()| fs::rename(&temp, output).map_err(EngineError::from));

    if written.is_err() {
        let _ = fs::remove_file(&temp);
    }
    written
}
