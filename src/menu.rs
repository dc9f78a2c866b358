//! Gopher menu tokenizer.
//!
//! A menu is a sequence of `\n`-terminated records of the form
//! `<type><description>\t<selector>\t<host>\t<port>`. Each record becomes one
//! or more [`MenuLine`]s after word wrapping; the extra lines are flagged as
//! continuations and can never be selected.

use std::borrow::Cow;

use crate::constants::{GOPHER_DEFAULT_PORT, MENU_PREFIX_WIDTH};
use crate::models::{ItemType, Location};
use crate::wordwrap::wrap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuLine<'a> {
    pub item_type: ItemType,
    pub continuation: bool,
    pub text: &'a str,
    pub selector: Option<&'a str>,
    pub host: Option<&'a str>,
    pub port: u16,
}

impl MenuLine<'_> {
    pub fn is_selectable(&self) -> bool {
        !self.continuation && self.item_type.is_selectable()
    }

    pub fn is_downloadable(&self) -> bool {
        !self.continuation && self.item_type.is_downloadable()
    }

    /// Gopher location this line links to, if it names a host.
    pub fn location(&self) -> Option<Location> {
        let host = self.host?;
        Some(Location::gopher(
            host,
            self.port,
            self.item_type,
            self.selector.unwrap_or(""),
        ))
    }
}

#[derive(Debug, Default)]
pub struct MenuPage<'a> {
    pub lines: Vec<MenuLine<'a>>,
    pub first_link: Option<usize>,
    pub last_link: Option<usize>,
    /// Set when the line limit cut the menu short.
    pub truncated: bool,
}

impl MenuPage<'_> {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_selectable(&self, idx: usize) -> bool {
        self.lines.get(idx).is_some_and(MenuLine::is_selectable)
    }

    /// Next selectable line strictly after `idx`.
    pub fn next_link(&self, idx: usize) -> Option<usize> {
        (idx + 1..self.lines.len()).find(|&i| self.is_selectable(i))
    }

    /// Previous selectable line strictly before `idx`.
    pub fn prev_link(&self, idx: usize) -> Option<usize> {
        (0..idx.min(self.lines.len())).rev().find(|&i| self.is_selectable(i))
    }
}

/// Decode raw menu bytes. Invalid UTF-8 is replaced rather than rejected.
pub fn decode(raw: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(raw)
}

/// Split `text` into display lines no wider than `width`, keeping at most
/// `max_lines` of them.
pub fn explode(text: &str, width: usize, max_lines: usize) -> MenuPage<'_> {
    let mut page = MenuPage::default();
    let mut records = text.split('\n').peekable();

    while let Some(raw) = records.next() {
        if raw.is_empty() && records.peek().is_none() {
            break; // text ended with a newline
        }
        let record = raw.strip_suffix('\r').unwrap_or(raw);
        if record == "." {
            continue;
        }
        if page.lines.len() >= max_lines {
            page.truncated = true;
            break;
        }

        let (item_type, rest) = split_item_type(record);
        let mut fields = rest.split('\t');
        let description = fields.next().unwrap_or("");
        let selector = fields.next();
        let host = fields.next();
        let port = fields.next().map_or(GOPHER_DEFAULT_PORT, parse_port);

        let wrap_width = if item_type == ItemType::INFO {
            width
        } else {
            width.saturating_sub(MENU_PREFIX_WIDTH)
        };

        let first_idx = page.lines.len();
        let mut cursor = Some(description);
        while let Some(rest) = cursor {
            if page.lines.len() >= max_lines {
                page.truncated = true;
                break;
            }
            let (line, next) = wrap(rest, wrap_width);
            page.lines.push(MenuLine {
                item_type,
                continuation: page.lines.len() > first_idx,
                text: line,
                selector,
                host,
                port,
            });
            cursor = next;
        }
        if item_type.is_selectable() {
            page.first_link.get_or_insert(first_idx);
            page.last_link = Some(first_idx);
        }
        if page.truncated {
            break;
        }
    }

    while page
        .lines
        .last()
        .is_some_and(|l| l.item_type == ItemType::INFO && l.text.trim().is_empty())
    {
        page.lines.pop();
    }
    page
}

/// First byte is the item type; an empty record is an info line. A
/// non-ASCII first character is consumed whole, so the description starts
/// after it and its trailing UTF-8 bytes are dropped.
fn split_item_type(record: &str) -> (ItemType, &str) {
    let mut chars = record.chars();
    match chars.next() {
        None => (ItemType::INFO, ""),
        Some(c) if c.is_ascii() => (ItemType(c as u8), chars.as_str()),
        Some(_) => (ItemType(record.as_bytes()[0]), chars.as_str()),
    }
}

/// Leading decimal digits of a port field; anything else means port 70.
pub(crate) fn parse_port(field: &str) -> u16 {
    let digits_end = field
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(field.len());
    match field[..digits_end].parse::<u16>() {
        Ok(port) if port > 0 => port,
        _ => GOPHER_DEFAULT_PORT,
    }
}
