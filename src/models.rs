use crate::constants::{
    BUILTIN_HOST_PREFIX, GOPHER_DEFAULT_PORT, HTTP_DEFAULT_PORT, TELNET_DEFAULT_PORT,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Gopher,
    Http,
    Telnet,
}

impl Protocol {
    /// Matches a URL scheme, ignoring case.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        if scheme.eq_ignore_ascii_case("gopher") {
            Some(Protocol::Gopher)
        } else if scheme.eq_ignore_ascii_case("http") {
            Some(Protocol::Http)
        } else if scheme.eq_ignore_ascii_case("telnet") {
            Some(Protocol::Telnet)
        } else {
            None
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Protocol::Gopher => GOPHER_DEFAULT_PORT,
            Protocol::Http => HTTP_DEFAULT_PORT,
            Protocol::Telnet => TELNET_DEFAULT_PORT,
        }
    }

    pub fn default_item_type(self) -> ItemType {
        match self {
            Protocol::Gopher => ItemType::DIRECTORY,
            Protocol::Http => ItemType::HTML,
            Protocol::Telnet => ItemType::TELNET,
        }
    }
}

/// Single-byte Gopher item type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ItemType(pub u8);

impl ItemType {
    pub const TEXT: ItemType = ItemType(b'0');
    pub const DIRECTORY: ItemType = ItemType(b'1');
    pub const ERROR: ItemType = ItemType(b'3');
    pub const DOS_BINARY: ItemType = ItemType(b'5');
    pub const QUERY: ItemType = ItemType(b'7');
    pub const TELNET: ItemType = ItemType(b'8');
    pub const BINARY: ItemType = ItemType(b'9');
    pub const GIF: ItemType = ItemType(b'g');
    pub const IMAGE: ItemType = ItemType(b'I');
    pub const HTML: ItemType = ItemType(b'h');
    pub const INFO: ItemType = ItemType(b'i');
    pub const PDF: ItemType = ItemType(b'P');
    pub const DOCUMENT: ItemType = ItemType(b'd');
    pub const END_MARKER: ItemType = ItemType(b'.');

    pub fn as_char(self) -> char {
        self.0 as char
    }

    /// Whether a menu line of this type can be followed.
    pub fn is_selectable(self) -> bool {
        !matches!(self, ItemType::INFO | ItemType::ERROR | ItemType::END_MARKER)
    }

    /// Whether the linked resource can be saved to disk.
    pub fn is_downloadable(self) -> bool {
        self.is_selectable() && self != ItemType::TELNET
    }

    /// Whether the client renders this type itself instead of offering a download.
    pub fn is_displayable(self) -> bool {
        matches!(
            self,
            ItemType::TEXT | ItemType::DIRECTORY | ItemType::QUERY | ItemType::HTML
        )
    }

    pub fn is_menu(self) -> bool {
        matches!(self, ItemType::DIRECTORY | ItemType::QUERY)
    }

    /// Three-letter tag shown in front of menu entries.
    pub fn label(self) -> Option<&'static str> {
        match self {
            ItemType::INFO => None,
            ItemType::HTML => Some("HTM"),
            ItemType::TEXT => Some("TXT"),
            ItemType::DIRECTORY => Some("DIR"),
            ItemType::ERROR => Some("ERR"),
            ItemType::DOS_BINARY | ItemType::BINARY => Some("BIN"),
            ItemType::QUERY => Some("ASK"),
            ItemType::IMAGE | ItemType::GIF => Some("IMG"),
            ItemType::PDF | ItemType::DOCUMENT => Some("PDF"),
            ItemType::TELNET => Some("TEL"),
            _ => Some("UNK"),
        }
    }
}

/// A navigable resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
    pub item_type: ItemType,
    pub selector: String,
}

impl Location {
    pub fn new(
        protocol: Protocol,
        host: impl Into<String>,
        port: u16,
        item_type: ItemType,
        selector: impl Into<String>,
    ) -> Self {
        Self {
            protocol,
            host: host.into(),
            port,
            item_type,
            selector: selector.into(),
        }
    }

    pub fn gopher(
        host: impl Into<String>,
        port: u16,
        item_type: ItemType,
        selector: impl Into<String>,
    ) -> Self {
        Self::new(Protocol::Gopher, host, port, item_type, selector)
    }

    pub fn welcome() -> Self {
        Self::gopher(crate::constants::WELCOME_HOST, GOPHER_DEFAULT_PORT, ItemType::DIRECTORY, "")
    }

    pub fn manual() -> Self {
        Self::gopher(crate::constants::MANUAL_HOST, GOPHER_DEFAULT_PORT, ItemType::TEXT, "")
    }

    /// Built-in pages are addressed with a `#`-prefixed host.
    pub fn is_builtin(&self) -> bool {
        self.host.starts_with(BUILTIN_HOST_PREFIX)
    }

    /// Location identity: host ignores case, everything else is exact.
    pub fn is_same(&self, other: &Location) -> bool {
        self.protocol == other.protocol
            && self.port == other.port
            && self.item_type == other.item_type
            && self.host.eq_ignore_ascii_case(&other.host)
            && self.selector == other.selector
    }

    pub fn with_item_type(&self, item_type: ItemType) -> Self {
        Self {
            item_type,
            ..self.clone()
        }
    }
}

/// Per-page view state; `selected_line` is `None` until a view computes it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewMemory {
    pub selected_line: Option<usize>,
    pub scroll_offset: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputMode {
    Normal,
    EditingUrl,
    Query,
    SaveAs,
    ConfirmQuit,
}

/// What a key press asks the navigation loop to do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayOrder {
    None,
    Back,
    Refresh,
    Quit,
}

/// Single-line text input used by the URL bar and the prompts.
#[derive(Clone, Debug, Default)]
pub struct LineEditor {
    pub text: String,
    pub cursor: usize,
    pub max_len: usize,
}

impl LineEditor {
    pub fn new(text: impl Into<String>, max_len: usize) -> Self {
        let text: String = text.into();
        let cursor = text.chars().count();
        Self {
            text,
            cursor,
            max_len,
        }
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map(|(idx, _)| idx)
            .unwrap_or(self.text.len())
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn insert(&mut self, c: char) {
        if self.len() + 1 >= self.max_len || c.is_control() {
            return;
        }
        let idx = self.byte_index(self.cursor);
        self.text.insert(idx, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, s: &str) {
        for c in s.chars() {
            self.insert(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let idx = self.byte_index(self.cursor);
            self.text.remove(idx);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.len() {
            let idx = self.byte_index(self.cursor);
            self.text.remove(idx);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.len());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.len();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    /// Leftmost visible char so the cursor stays inside `width` columns.
    pub fn display_offset(&self, width: usize) -> usize {
        let len = self.len();
        let mut offset = len.saturating_sub(width.saturating_sub(1));
        if offset + 8 > self.cursor {
            offset = self.cursor.saturating_sub(8);
        }
        offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_location_ignores_host_case_only() {
        let a = Location::gopher("Gopher.Example.com", 70, ItemType::DIRECTORY, "/a");
        let b = Location::gopher("gopher.example.COM", 70, ItemType::DIRECTORY, "/a");
        let c = Location::gopher("gopher.example.com", 70, ItemType::DIRECTORY, "/A");
        assert!(a.is_same(&b));
        assert!(!a.is_same(&c));
        assert!(!a.is_same(&b.with_item_type(ItemType::TEXT)));
    }

    #[test]
    fn selectability_rules() {
        assert!(ItemType::DIRECTORY.is_selectable());
        assert!(ItemType::TELNET.is_selectable());
        assert!(!ItemType::TELNET.is_downloadable());
        assert!(!ItemType::INFO.is_selectable());
        assert!(!ItemType::ERROR.is_selectable());
        assert!(!ItemType::END_MARKER.is_selectable());
        assert!(ItemType::BINARY.is_downloadable());
    }

    #[test]
    fn line_editor_inserts_at_cursor() {
        let mut ed = LineEditor::new("gophr", 32);
        ed.left();
        ed.insert('e');
        assert_eq!(ed.text, "gopher");
        ed.home();
        ed.delete();
        assert_eq!(ed.text, "opher");
        ed.end();
        ed.backspace();
        assert_eq!(ed.text, "ophe");
    }

    #[test]
    fn line_editor_respects_max_len() {
        let mut ed = LineEditor::new("", 4);
        ed.insert_str("abcdef");
        assert_eq!(ed.text, "abc");
    }
}
