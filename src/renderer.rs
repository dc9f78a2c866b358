use scraper::{Html, Node};

/// Flattens an HTML document into wrapped-later plain text: body content
/// only, whitespace collapsed, a line break after paragraphs and table rows.
pub struct TextRenderer {
    out: String,
    max_len: usize,
    pending_space: bool,
}

impl TextRenderer {
    pub fn new(max_len: usize) -> Self {
        Self {
            out: String::new(),
            max_len,
            pending_space: false,
        }
    }

    pub fn render(mut self, document: &Html) -> String {
        for node in document.tree.root().children() {
            self.walk(node);
        }
        let trimmed = self.out.trim_end().len();
        self.out.truncate(trimmed);
        self.out
    }

    fn is_full(&self) -> bool {
        self.out.len() >= self.max_len
    }

    fn line_break(&mut self) {
        if self.is_full() {
            return;
        }
        self.out.push('\n');
        self.pending_space = false;
    }

    fn push_text(&mut self, text: &str) {
        for c in text.chars() {
            if c.is_whitespace() {
                self.pending_space = true;
                continue;
            }
            if c.is_control() {
                continue;
            }
            if self.out.len() + c.len_utf8() + 1 > self.max_len {
                return;
            }
            if self.pending_space && !self.out.is_empty() && !self.out.ends_with('\n') {
                self.out.push(' ');
            }
            self.pending_space = false;
            self.out.push(c);
        }
    }

    fn walk(&mut self, node: ego_tree::NodeRef<Node>) {
        match node.value() {
            Node::Text(text) => self.push_text(&text.text),
            Node::Element(elem) => {
                let tag = elem.name();
                if matches!(tag, "head" | "script" | "style" | "template" | "noscript") {
                    return;
                }
                if tag == "br" {
                    self.line_break();
                    return;
                }
                if matches!(tag, "td" | "th") {
                    self.pending_space = true;
                }

                for child in node.children() {
                    self.walk(child);
                }

                if matches!(tag, "p" | "tr" | "title" | "div" | "li" | "h1" | "h2" | "h3") {
                    self.line_break();
                }
            }
            _ => {}
        }
    }
}

/// Convert raw HTML bytes to display text of at most `max_len` bytes.
pub fn html_to_text(raw: &[u8], max_len: usize) -> String {
    let source = String::from_utf8_lossy(raw);
    let document = Html::parse_document(&source);
    TextRenderer::new(max_len).render(&document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_body_text_only() {
        let html = b"<html><head><title>T</title><style>p{}</style></head>\
                     <body><p>Hello   <b>gopher</b>\n world</p><script>var x;</script><p>Bye</p></body></html>";
        assert_eq!(html_to_text(html, 1024), "Hello gopher world\nBye");
    }

    #[test]
    fn breaks_at_br_and_table_rows() {
        let html = b"<body>one<br>two<br><table><tr><td>a</td><td>b</td></tr><tr><td>c</td></tr></table></body>";
        assert_eq!(html_to_text(html, 1024), "one\ntwo\na b\nc");
    }

    #[test]
    fn entities_are_decoded() {
        let html = b"<body>fish &amp; chips&nbsp;today</body>";
        assert_eq!(html_to_text(html, 1024), "fish & chips today");
    }

    #[test]
    fn output_is_bounded() {
        let html = format!("<body>{}</body>", "word ".repeat(100));
        assert!(html_to_text(html.as_bytes(), 50).len() <= 50);
    }
}
