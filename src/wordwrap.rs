use unicode_width::UnicodeWidthChar;

/// Cut one display line of at most `width` columns from the front of
/// `text`.
///
/// Returns the line and the rest of the paragraph, or `None` once the whole
/// text has been consumed. A `\n` always ends a line; otherwise the break
/// happens at the last space that fits, or mid-word when a single word is
/// wider than the line.
pub fn wrap(text: &str, width: usize) -> (&str, Option<&str>) {
    let width = width.max(1);
    let mut used = 0;
    let mut last_space: Option<usize> = None;

    for (idx, c) in text.char_indices() {
        if c == '\n' {
            return (&text[..idx], Some(&text[idx + 1..]));
        }
        if c == ' ' {
            last_space = Some(idx);
        }
        let w = c.width().unwrap_or(0);
        if used + w > width {
            return match last_space {
                Some(space) if space > 0 => {
                    let rest = text[space..].trim_start_matches(' ');
                    (&text[..space], non_empty(rest))
                }
                _ => {
                    let cut = if idx == 0 { c.len_utf8() } else { idx };
                    (&text[..cut], non_empty(&text[cut..]))
                }
            };
        }
        used += w;
    }
    (text, None)
}

fn non_empty(rest: &str) -> Option<&str> {
    if rest.is_empty() { None } else { Some(rest) }
}

/// Wrap a whole text into display lines.
pub fn wrap_all(text: &str, width: usize) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut cursor = Some(text);
    while let Some(rest) = cursor {
        let (line, next) = wrap(rest, width);
        lines.push(line);
        cursor = next;
    }
    lines
}
