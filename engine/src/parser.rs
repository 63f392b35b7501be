//! To-do file parser.
//!
//! Turns the raw lines of a tab-indented to-do file into the flat sequence of
//! [`TodoItem`] rows the compositor draws. Parsing never fails: anything that
//! is not a recognised list item is passed through as plain text.
//!
//! # Line Format
//!
//! | Source line | Prefix | Checked |
//! |-------------|--------|---------|
//! | `- [x] task` | `-` | yes |
//! | `- [ ] task` | `-` | no |
//! | `- note` | `-` | no |
//! | `anything else` | (none) | no |
//!
//! Leading tab characters give the nesting depth.
//!
//! # Completion Propagation
//!
//! Checking an item completes its whole subtree visually: every following
//! row that is indented deeper than the checked item is forced to
//! `checked` and struck through, whatever its own checkbox says. The first
//! row at the same depth or shallower that is not itself checked ends the
//! propagation. Top-level checked items are dimmed but not struck through.
//!
//! # Wrapping
//!
//! A row whose rendered form `"{prefix} {text}"` is longer than
//! [`WRAP_THRESHOLD`] columns (tabs count as four) is split at the first
//! space at or after column [`WRAP_SEARCH_START`] of the text. The remainder
//! becomes a continuation row with no prefix and an extra indent of
//! [`CONTINUATION_INDENT`]. A text with no such space is cut to
//! [`TRUNCATE_LEN`] characters instead.
//!
//! # Example
//!
//! ```
//! use todopaper_engine::parser::parse;
//!
//! let items = parse(["- [x] groceries", "\t- [ ] milk", "- [ ] homework"]);
//!
//! assert!(items[0].checked && !items[0].strikethrough);
//! assert!(items[1].checked && items[1].strikethrough);
//! assert!(!items[2].checked);
//! ```

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{EngineError, Result};
use crate::types::{TodoItem, CONTINUATION_INDENT};
use crate::utils::emoji::emojize;

/// Rendered width above which a row is wrapped.
pub const WRAP_THRESHOLD: usize = 55;

/// Text column from which a wrap point is searched.
pub const WRAP_SEARCH_START: usize = 50;

/// Length a text is cut to when it has no wrap point.
pub const TRUNCATE_LEN: usize = 55;

/// Extra columns a tab occupies beyond its own character.
const TAB_EXTRA_WIDTH: usize = 3;

const CHECKED_MARKER: &str = "- [x]";
const UNCHECKED_MARKER: &str = "- [ ]";

/// Completion propagation state carried from one line to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Propagation {
    Normal,
    Propagating { at_indent: usize },
}

/// A source line split into its parts, before propagation is applied.
#[derive(Debug, PartialEq, Eq)]
struct RawLine<'a> {
    indent: usize,
    prefix: &'a str,
    text: &'a str,
    checked: bool,
}

/// Parses raw to-do lines into display rows, preserving source order.
///
/// Lines are expected to have emoji aliases expanded already (see
/// [`read_todo_file`]).
pub fn parse<I, S>(lines: I) -> Vec<TodoItem>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut items = Vec::new();
    let mut state = Propagation::Normal;

    for line in lines {
        let raw = line.as_ref();
        let indent = count_indent(raw);
        let stripped = &raw[indent..];

        let normalized;
        let (checked_marker, body) = if let Some(rest) = stripped.strip_prefix(CHECKED_MARKER) {
            normalized = format!("-{rest}");
            (true, normalized.trim())
        } else if let Some(rest) = stripped.strip_prefix(UNCHECKED_MARKER) {
            normalized = format!("-{rest}");
            (false, normalized.trim())
        } else {
            (false, stripped.trim())
        };

        let (prefix, text) = split_prefix(body);
        let parsed = RawLine {
            indent,
            prefix,
            text,
            checked: checked_marker,
        };

        state = push_line(&mut items, &parsed, state);
    }

    items
}

/// Reads the to-do file, expands emoji aliases and parses it.
///
/// Invalid UTF-8 is replaced rather than rejected.
///
/// # Errors
///
/// Returns [`EngineError::NotFound`] if the file does not exist and
/// [`EngineError::Io`] for any other read failure.
pub fn read_todo_file(path: &Path) -> Result<Vec<TodoItem>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(EngineError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let contents = String::from_utf8_lossy(&bytes);
    if matches!(contents, std::borrow::Cow::Owned(_)) {
        warn!(path = %path.display(), "To-do file is not valid UTF-8, replacing bad bytes");
    }

    let items = parse(contents.lines().map(|l| emojize(l.trim_end()).into_owned()));
    debug!(path = %path.display(), rows = items.len(), "Parsed to-do file");
    Ok(items)
}

/// Applies propagation and wrapping to one line and returns the next state.
fn push_line(items: &mut Vec<TodoItem>, line: &RawLine<'_>, state: Propagation) -> Propagation {
    let mut state = state;
    let mut checked = line.checked;
    let mut strikethrough = false;

    if line.checked {
        let restart = match state {
            Propagation::Normal => true,
            Propagation::Propagating { at_indent } => line.indent <= at_indent,
        };
        if restart {
            state = Propagation::Propagating {
                at_indent: line.indent,
            };
            strikethrough = line.indent > 0;
        }
    }

    if let Propagation::Propagating { at_indent } = state {
        if line.indent > at_indent {
            checked = true;
            strikethrough = true;
        }
    }

    let indent = line.indent as f32;
    let (text, continuation) = fit_width(line.prefix, line.text);

    items.push(TodoItem {
        prefix: line.prefix.to_string(),
        text,
        checked,
        indent,
        strikethrough,
    });

    if let Some(rest) = continuation {
        items.push(TodoItem {
            prefix: String::new(),
            text: rest,
            checked,
            indent: indent + CONTINUATION_INDENT,
            strikethrough,
        });
    }

    if checked {
        state
    } else {
        Propagation::Normal
    }
}

/// Number of leading tab characters.
fn count_indent(line: &str) -> usize {
    line.bytes().take_while(|&b| b == b'\t').count()
}

/// Splits a bullet line into its marker and the text after the first space.
fn split_prefix(body: &str) -> (&str, &str) {
    if !body.starts_with('-') {
        return ("", body);
    }
    body.split_once(' ').unwrap_or((body, ""))
}

/// Rendered width of `"{prefix} {text}"`.
fn rendered_width(prefix: &str, text: &str) -> usize {
    let chars = prefix.chars().count() + 1 + text.chars().count();
    let tabs = prefix.matches('\t').count() + text.matches('\t').count();
    chars + tabs * TAB_EXTRA_WIDTH
}

/// Fits a text to the render width.
///
/// Returns the text for the row itself and, when wrapped, the remainder for
/// a continuation row. The split keeps the space at the start of the
/// remainder so both parts concatenate back to the input.
fn fit_width(prefix: &str, text: &str) -> (String, Option<String>) {
    if rendered_width(prefix, text) <= WRAP_THRESHOLD {
        return (text.to_string(), None);
    }

    let wrap_at = text
        .char_indices()
        .skip(WRAP_SEARCH_START)
        .find(|&(_, c)| c == ' ')
        .map(|(byte_idx, _)| byte_idx);

    match wrap_at {
        Some(idx) => (text[..idx].to_string(), Some(text[idx..].to_string())),
        None => (text.chars().take(TRUNCATE_LEN).collect(), None),
    }
}
