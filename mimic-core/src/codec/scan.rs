//! Depth-aware scanning of encoded values
//!
//! Collections and maps can nest strings, brackets, braces and reference
//! tokens, so separators only count at depth zero and outside quotes.

use crate::error::{MimicError, Result};

/// Byte offsets of top-level characters accepted by `is_separator`.
///
/// `is_separator` receives the full text, the offset and the character.
/// Fails if quotes or delimiters are unbalanced.
pub(crate) fn top_level_positions<F>(text: &str, mut is_separator: F) -> Result<Vec<usize>>
where
    F: FnMut(&str, usize, char) -> bool,
{
    let mut positions = Vec::new();
    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escape_next {
                escape_next = false;
            } else if c == '\\' {
                escape_next = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '[' => closers.push(']'),
            '{' => closers.push('}'),
            '<' => closers.push('>'),
            ']' | '}' | '>' => match closers.pop() {
                Some(expected) if expected == c => {}
                Some(expected) => {
                    return Err(MimicError::malformed(
                        text,
                        format!("expected '{}' but found '{}' at offset {}", expected, c, i),
                    ));
                }
                None => {
                    return Err(MimicError::malformed(
                        text,
                        format!("unbalanced '{}' at offset {}", c, i),
                    ));
                }
            },
            _ if closers.is_empty() && is_separator(text, i, c) => positions.push(i),
            _ => {}
        }
    }

    if in_string {
        return Err(MimicError::malformed(text, "unterminated string"));
    }
    if let Some(expected) = closers.last() {
        return Err(MimicError::malformed(
            text,
            format!("missing closing '{}'", expected),
        ));
    }

    Ok(positions)
}

/// Split at top-level commas. An empty body yields no items.
pub(crate) fn split_items(body: &str) -> Result<Vec<&str>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let positions = top_level_positions(body, |_, _, c| c == ',')?;
    let mut items = Vec::with_capacity(positions.len() + 1);
    let mut start = 0;
    for pos in positions.into_iter().chain(std::iter::once(body.len())) {
        let item = body[start..pos].trim();
        if item.is_empty() {
            return Err(MimicError::malformed(body, "empty element"));
        }
        items.push(item);
        start = pos + 1;
    }
    Ok(items)
}

/// Split a map entry at the first top-level `:` followed by whitespace.
///
/// A colon inside a date/time key (`10:00:00`) is not a separator.
pub(crate) fn split_entry(entry: &str) -> Result<(&str, &str)> {
    let positions = top_level_positions(entry, |text, i, c| {
        c == ':'
            && text[i + 1..]
                .chars()
                .next()
                .is_some_and(char::is_whitespace)
    })?;

    let Some(&pos) = positions.first() else {
        return Err(MimicError::malformed(entry, "map entry is missing ': ' separator"));
    };

    let key = entry[..pos].trim();
    let value = entry[pos + 1..].trim();
    if key.is_empty() || value.is_empty() {
        return Err(MimicError::malformed(entry, "map entry needs both a key and a value"));
    }
    Ok((key, value))
}
