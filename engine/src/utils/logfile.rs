//! Log file maintenance.
//!
//! The daemon appends to a single log file forever. [`trim_log_file`] caps
//! it by dropping the oldest lines once it grows past a threshold.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info};

/// Line count above which the log file is trimmed.
pub const MAX_LOG_LINES: usize = 5000;

/// Number of oldest lines removed per trim.
pub const TRIM_LOG_LINES: usize = 1000;

/// Removes the first `drop_lines` lines of `path` if it has more than
/// `max_lines` lines.
///
/// The file is rewritten in place so an open append-mode handle (the log
/// writer) keeps writing to the same file. Returns `true` if the file was
/// trimmed. A missing file is not an error.
///
/// # Errors
///
/// Returns an I/O error if the file exists but cannot be read or rewritten.
pub fn trim_log_file(path: &Path, max_lines: usize, drop_lines: usize) -> io::Result<bool> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    let line_count = contents.lines().count();
    if line_count <= max_lines {
        debug!(path = %path.display(), line_count, "Log file within limit");
        return Ok(false);
    }

    let kept: String = contents.split_inclusive('\n').skip(drop_lines).collect();
    fs::write(path, kept)?;

    info!(
        path = %path.display(),
        removed = drop_lines.min(line_count),
        "Trimmed log file"
    );
    Ok(true)
}
