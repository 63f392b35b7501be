//! Emoji alias expansion.
//!
//! Replaces `:shortcode:` tokens (GitHub gemoji aliases such as `:tada:` or
//! `:white_check_mark:`) with the emoji they name. Unknown shortcodes and
//! stray colons are left as written.

use std::borrow::Cow;

/// Expands every known `:shortcode:` in `line`.
///
/// Returns the input unchanged (borrowed) when it contains no colon.
///
/// # Example
///
/// ```
/// use todopaper_engine::utils::emoji::emojize;
///
/// assert_eq!(emojize("- [ ] party :tada:"), "- [ ] party 🎉");
/// assert_eq!(emojize("10:30 meeting"), "10:30 meeting");
/// ```
#[must_use]
pub fn emojize(line: &str) -> Cow<'_, str> {
    if !line.contains(':') {
        return Cow::Borrowed(line);
    }

    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(open) = rest.find(':') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        let Some(close) = after_open.find(':') else {
            out.push_str(&rest[open..]);
            return Cow::Owned(out);
        };

        let candidate = &after_open[..close];
        match lookup(candidate) {
            Some(glyph) => {
                out.push_str(glyph);
                rest = &after_open[close + 1..];
            }
            None => {
                // The closing colon may open the next shortcode.
                out.push(':');
                rest = after_open;
            }
        }
    }

    out.push_str(rest);
    Cow::Owned(out)
}

fn lookup(shortcode: &str) -> Option<&'static str> {
    if shortcode.is_empty() || !shortcode.chars().all(is_shortcode_char) {
        return None;
    }
    emojis::get_by_shortcode(shortcode).map(emojis::Emoji::as_str)
}

fn is_shortcode_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-')
}
