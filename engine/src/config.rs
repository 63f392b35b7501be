//! Configuration module for todopaper.
//!
//! This module handles parsing configuration from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `TODOPAPER_HOME` | No | `~/.todopaper` | Base directory for default paths |
//! | `TODOPAPER_TODO_PATH` | No | `$HOME/todo.md` | To-do file to watch |
//! | `TODOPAPER_BACKGROUND_PATH` | No | `$HOME/background/old.png` | Base image |
//! | `TODOPAPER_OUTPUT_PATH` | No | `$HOME/output/background.png` | Rendered image |
//! | `TODOPAPER_LOG_PATH` | No | `$HOME/wallpaper.log` | Log file |
//! | `TODOPAPER_FONT_PATHS` | No | platform fonts | Comma-separated font fallback chain |
//! | `TODOPAPER_FONT_SIZE` | No | 32 | Font pixel size |
//! | `TODOPAPER_TICK_SECS` | No | 240 | Seconds between periodic renders |
//! | `TODOPAPER_DEBOUNCE_MS` | No | 2000 | File-change debounce window |
//! | `TODOPAPER_SINK_COMMAND` | No | platform default | Wallpaper command, `{path}` is substituted |
//! | `TODOPAPER_WEATHER_API_KEY` | No | - | tomorrow.io API key |
//! | `TODOPAPER_WEATHER_LOCATION` | No | - | Location for the weather query |
//! | `TODOPAPER_WEATHER_URL` | No | `https://api.tomorrow.io` | Weather API base URL |
//! | `TODOPAPER_WEBUNTIS_SERVER` | No | - | WebUntis base URL |
//! | `TODOPAPER_WEBUNTIS_SCHOOL` | No | - | WebUntis school name |
//! | `TODOPAPER_WEBUNTIS_USER` | No | - | WebUntis user |
//! | `TODOPAPER_WEBUNTIS_PASSWORD` | No | - | WebUntis password |
//!
//! Missing weather or WebUntis settings are not configuration errors: the
//! corresponding fetch fails at render time and the wallpaper shows a
//! placeholder instead.
//!
//! # Example
//!
//! ```no_run
//! use todopaper_engine::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Watching: {}", config.todo_path.display());
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use directories::BaseDirs;
use thiserror::Error;

use crate::scheduler::DEFAULT_TICK_SECS;
use crate::utils::debounce::DEFAULT_DEBOUNCE_MS;

/// Default data directory name relative to home.
const DEFAULT_HOME_DIR: &str = ".todopaper";

/// Default font pixel size.
const DEFAULT_FONT_SIZE: f32 = 32.0;

/// Default tomorrow.io API base URL.
const DEFAULT_WEATHER_URL: &str = "https://api.tomorrow.io";

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to determine home directory.
    #[error("failed to determine home directory")]
    NoHomeDirectory,
}

/// Settings for the tomorrow.io weather client.
#[derive(Debug, Clone, Default)]
pub struct WeatherConfig {
    /// API base URL.
    pub base_url: String,

    /// API key. Fetching fails without it.
    pub api_key: Option<String>,

    /// Location query, e.g. a city name.
    pub location: Option<String>,
}

/// Settings for the WebUntis timetable client.
#[derive(Debug, Clone, Default)]
pub struct WebUntisConfig {
    /// Server base URL, e.g. `https://neilo.webuntis.com`.
    pub server: Option<String>,

    /// School name as used in the login URL.
    pub school: Option<String>,

    /// Login name.
    pub user: Option<String>,

    /// Login password.
    pub password: Option<String>,
}

/// Configuration for todopaper.
#[derive(Debug, Clone)]
pub struct Config {
    /// To-do file that is watched and parsed.
    pub todo_path: PathBuf,

    /// Base image the text is drawn onto.
    pub background_path: PathBuf,

    /// Where the finished image is written.
    pub output_path: PathBuf,

    /// Log file path.
    pub log_path: PathBuf,

    /// Fonts to try, in order. Glyphs missing from one font fall back to the next.
    pub font_paths: Vec<PathBuf>,

    /// Font pixel size.
    pub font_size: f32,

    /// Interval between periodic renders.
    pub tick_interval: Duration,

    /// Minimum spacing between accepted file-change events.
    pub debounce_window: Duration,

    /// Command that applies the wallpaper. `None` selects the platform default.
    pub sink_command: Option<String>,

    /// Weather client settings.
    pub weather: WeatherConfig,

    /// Timetable client settings.
    pub webuntis: WebUntisConfig,
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - A numeric variable is set but cannot be parsed or is zero
    /// - The home directory cannot be determined and `TODOPAPER_HOME` is unset
    pub fn from_env() -> Result<Self, ConfigError> {
        let home = match env::var("TODOPAPER_HOME") {
            Ok(path) => PathBuf::from(path),
            Err(_) => {
                let base_dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDirectory)?;
                base_dirs.home_dir().join(DEFAULT_HOME_DIR)
            }
        };

        let todo_path = path_var("TODOPAPER_TODO_PATH").unwrap_or_else(|| home.join("todo.md"));
        let background_path = path_var("TODOPAPER_BACKGROUND_PATH")
            .unwrap_or_else(|| home.join("background").join("old.png"));
        let output_path = path_var("TODOPAPER_OUTPUT_PATH")
            .unwrap_or_else(|| home.join("output").join("background.png"));
        let log_path = path_var("TODOPAPER_LOG_PATH").unwrap_or_else(|| home.join("wallpaper.log"));

        let font_paths = match env::var("TODOPAPER_FONT_PATHS") {
            Ok(val) => val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect(),
            Err(_) => default_font_paths(),
        };

        let font_size = match env::var("TODOPAPER_FONT_SIZE") {
            Ok(val) => {
                let size = val.parse::<f32>().map_err(|_| ConfigError::InvalidValue {
                    key: "TODOPAPER_FONT_SIZE".to_string(),
                    message: format!("expected positive number, got '{val}'"),
                })?;
                if !(size > 0.0) {
                    return Err(ConfigError::InvalidValue {
                        key: "TODOPAPER_FONT_SIZE".to_string(),
                        message: "font size must be greater than 0".to_string(),
                    });
                }
                size
            }
            Err(_) => DEFAULT_FONT_SIZE,
        };

        let tick_secs = positive_u64_var("TODOPAPER_TICK_SECS", DEFAULT_TICK_SECS)?;

        // Zero is allowed here and disables debouncing.
        let debounce_ms = match env::var("TODOPAPER_DEBOUNCE_MS") {
            Ok(val) => val.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: "TODOPAPER_DEBOUNCE_MS".to_string(),
                message: format!("expected non-negative integer, got '{val}'"),
            })?,
            Err(_) => DEFAULT_DEBOUNCE_MS,
        };

        let weather = WeatherConfig {
            base_url: env::var("TODOPAPER_WEATHER_URL")
                .unwrap_or_else(|_| DEFAULT_WEATHER_URL.to_string()),
            api_key: non_empty_var("TODOPAPER_WEATHER_API_KEY"),
            location: non_empty_var("TODOPAPER_WEATHER_LOCATION"),
        };

        let webuntis = WebUntisConfig {
            server: non_empty_var("TODOPAPER_WEBUNTIS_SERVER"),
            school: non_empty_var("TODOPAPER_WEBUNTIS_SCHOOL"),
            user: non_empty_var("TODOPAPER_WEBUNTIS_USER"),
            password: non_empty_var("TODOPAPER_WEBUNTIS_PASSWORD"),
        };

        Ok(Self {
            todo_path,
            background_path,
            output_path,
            log_path,
            font_paths,
            font_size,
            tick_interval: Duration::from_secs(tick_secs),
            debounce_window: Duration::from_millis(debounce_ms),
            sink_command: non_empty_var("TODOPAPER_SINK_COMMAND"),
            weather,
            webuntis,
        })
    }
}

fn path_var(key: &str) -> Option<PathBuf> {
    non_empty_var(key).map(PathBuf::from)
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn positive_u64_var(key: &str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(val) => {
            let parsed = val.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected positive integer, got '{val}'"),
            })?;
            if parsed == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "value must be greater than 0".to_string(),
                });
            }
            Ok(parsed)
        }
        Err(_) => Ok(default),
    }
}

/// Fonts tried when `TODOPAPER_FONT_PATHS` is not set.
fn default_font_paths() -> Vec<PathBuf> {
    let candidates: &[&str] = if cfg!(target_os = "windows") {
        &[
            "C:\\Windows\\Fonts\\consola.ttf",
            "C:\\Windows\\Fonts\\seguiemj.ttf",
            "C:\\Windows\\Fonts\\seguisym.ttf",
        ]
    } else if cfg!(target_os = "macos") {
        &[
            "/System/Library/Fonts/Menlo.ttc",
            "/System/Library/Fonts/Apple Symbols.ttf",
        ]
    } else {
        &[
            "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
            "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
            "/usr/share/fonts/truetype/noto/NotoEmoji-Regular.ttf",
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        ]
    };
    candidates.iter().map(PathBuf::from).collect()
}
