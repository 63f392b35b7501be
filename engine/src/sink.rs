//! Applying the finished image as desktop background.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{EngineError, Result};

/// Placeholder replaced by the image path in command arguments.
pub const PATH_PLACEHOLDER: &str = "{path}";

/// Makes an image file the desktop background.
#[async_trait]
pub trait WallpaperSink: Send + Sync {
    /// Applies the image at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SinkFailed`] if the platform call fails.
    async fn apply(&self, path: &Path) -> Result<()>;
}

/// Runs an external command to set the wallpaper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSink {
    program: String,
    args: Vec<String>,
}

impl CommandSink {
    /// Creates a sink from a program and argument templates.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parses a whitespace-separated command line.
    ///
    /// Returns `None` for a blank line.
    #[must_use]
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    /// The configured command, or the platform default.
    #[must_use]
    pub fn from_config(command: Option<&str>) -> Self {
        command
            .and_then(Self::from_command_line)
            .unwrap_or_else(Self::platform_default)
    }

    /// The wallpaper command for the current platform.
    #[must_use]
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            Self::new(
                "osascript",
                vec![
                    "-e".to_string(),
                    format!(
                        "tell application \"System Events\" to tell every desktop to set picture to \"{PATH_PLACEHOLDER}\""
                    ),
                ],
            )
        } else if cfg!(target_os = "windows") {
            Self::new(
                "powershell",
                vec![
                    "-NoProfile".to_string(),
                    "-Command".to_string(),
                    format!(
                        "Add-Type -TypeDefinition 'using System.Runtime.InteropServices; public class W {{ [DllImport(\"user32.dll\")] public static extern int SystemParametersInfo(int a, int b, string c, int d); }}'; [W]::SystemParametersInfo(20, 0, '{PATH_PLACEHOLDER}', 3)"
                    ),
                ],
            )
        } else {
            Self::new(
                "gsettings",
                vec![
                    "set".to_string(),
                    "org.gnome.desktop.background".to_string(),
                    "picture-uri".to_string(),
                    format!("file://{PATH_PLACEHOLDER}"),
                ],
            )
        }
    }

    /// Program name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments with the placeholder replaced by `path`.
    #[must_use]
    pub fn args_for(&self, path: &Path) -> Vec<String> {
        let path = path.display().to_string();
        self.args
            .iter()
            .map(|arg| arg.replace(PATH_PLACEHOLDER, &path))
            .collect()
    }
}

#[async_trait]
impl WallpaperSink for CommandSink {
    async fn apply(&self, path: &Path) -> Result<()> {
        let args = self.args_for(path);
        debug!(program = %self.program, ?args, "Running wallpaper command");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| EngineError::SinkFailed(format!("{}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::SinkFailed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        info!(path = %path.display(), "Wallpaper applied");
        Ok(())
    }
}
