//! Text documents (item types `0` and `h`) prepared for display.

use crate::constants::TAB_WIDTH;
use crate::models::ItemType;
use crate::renderer::html_to_text;

/// Make raw text safe to print: tabs expand to spaces, other control
/// characters vanish, and the `.` line that ends a Gopher text is dropped.
pub fn sanitize_text(raw: &[u8], max_len: usize) -> String {
    let source = String::from_utf8_lossy(raw);
    let mut out = String::with_capacity(source.len().min(max_len));
    for c in source.chars() {
        if out.len() + TAB_WIDTH >= max_len {
            break;
        }
        match c {
            '\t' => out.extend(std::iter::repeat_n(' ', TAB_WIDTH)),
            '\n' => out.push('\n'),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    if out == ".\n" || out.ends_with("\n.\n") {
        let len = out.len() - 2;
        out.truncate(len);
    }
    out
}

/// Display text for a cached page of `item_type`.
pub fn prepare(item_type: ItemType, raw: &[u8], max_len: usize) -> String {
    if item_type == ItemType::HTML {
        html_to_text(raw, max_len)
    } else {
        sanitize_text(raw, max_len)
    }
}
