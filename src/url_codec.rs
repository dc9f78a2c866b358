//! Conversion between URL strings and [`Location`]s.
//!
//! The accepted grammar is `[scheme://]host[:port][/<itemtype><selector>]`.
//! Parsing is deliberately lenient about ports: anything that is not a
//! positive decimal number means "protocol default".

use crate::constants::{
    GOPHER_DEFAULT_PORT, HTTP_DEFAULT_PORT, MAX_HOST_LEN, MAX_SELECTOR_LEN, MAX_URL_LEN,
};
use crate::error::UrlError;
use crate::models::{ItemType, Location, Protocol};

/// Field length maxima enforced by [`parse_with`].
#[derive(Clone, Copy, Debug)]
pub struct UrlLimits {
    pub max_host_len: usize,
    pub max_selector_len: usize,
}

impl Default for UrlLimits {
    fn default() -> Self {
        Self {
            max_host_len: MAX_HOST_LEN,
            max_selector_len: MAX_SELECTOR_LEN,
        }
    }
}

pub fn parse(url: &str) -> Result<Location, UrlError> {
    parse_with(url, &UrlLimits::default())
}

pub fn parse_with(url: &str, limits: &UrlLimits) -> Result<Location, UrlError> {
    let (scheme, rest) = split_scheme(url);
    let protocol = match scheme {
        None => Some(Protocol::Gopher),
        Some(s) => Protocol::from_scheme(s),
    };
    // Unknown schemes are read like any non-Gopher URL so the caller can
    // still report what was asked for.
    let effective = protocol.unwrap_or(Protocol::Http);

    let host_end = rest.find([':', '/']).unwrap_or(rest.len());
    let host = &rest[..host_end];
    if host.len() > limits.max_host_len {
        return Err(UrlError::HostTooLong);
    }

    let mut port = effective.default_port();
    let mut after_host = &rest[host_end..];
    if let Some(port_part) = after_host.strip_prefix(':') {
        let port_end = port_part.find('/').unwrap_or(port_part.len());
        if let Some(p) = parse_port(&port_part[..port_end]) {
            port = p;
        }
        after_host = &port_part[port_end..];
    }

    let mut item_type = effective.default_item_type();
    let mut selector = "";
    if let Some(path) = after_host.strip_prefix('/') {
        if effective == Protocol::Gopher {
            // Selectors are text, so a non-ASCII type character is consumed
            // whole: its lead byte becomes the item type and its trailing
            // UTF-8 bytes are lost rather than left as a broken selector.
            let mut chars = path.chars();
            if let Some(c) = chars.next() {
                item_type = if c.is_ascii() {
                    ItemType(c as u8)
                } else {
                    ItemType(path.as_bytes()[0])
                };
                selector = chars.as_str();
            }
        } else {
            selector = path;
        }
    }
    if selector.len() > limits.max_selector_len {
        return Err(UrlError::SelectorTooLong);
    }

    match protocol {
        Some(protocol) => Ok(Location::new(protocol, host, port, item_type, selector)),
        None => Err(UrlError::UnknownProtocol {
            scheme: scheme.unwrap_or_default().to_string(),
            host: host.to_string(),
            selector: selector.to_string(),
        }),
    }
}

/// Splits off `scheme://` when present. A colon that is not followed by
/// `//` belongs to `host:port`.
fn split_scheme(url: &str) -> (Option<&str>, &str) {
    for (idx, b) in url.bytes().enumerate() {
        match b {
            b'/' => break,
            b':' => {
                if url[idx + 1..].starts_with("//") {
                    return (Some(&url[..idx]), &url[idx + 3..]);
                }
                break;
            }
            _ => {}
        }
    }
    (None, url)
}

/// Leading decimal digits, like `atoi`. Zero or garbage yields `None`.
fn parse_port(text: &str) -> Option<u16> {
    let digits_end = text
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(text.len());
    match text[..digits_end].parse::<u16>() {
        Ok(0) | Err(_) => None,
        Ok(port) => Some(port),
    }
}

pub fn build(location: &Location) -> String {
    build_bounded(location, MAX_URL_LEN)
}

/// Serialize `location`, never exceeding `max_len` bytes.
pub fn build_bounded(location: &Location, max_len: usize) -> String {
    let mut out = UrlWriter::new(max_len);

    if location.protocol == Protocol::Http {
        out.push_str("http://");
        out.push_str(&location.host);
        if location.port != HTTP_DEFAULT_PORT {
            out.push_str(&format!(":{}", location.port));
        }
        out.push_str("/");
        out.push_str(&location.selector);
        return out.finish();
    }

    if location.item_type == ItemType::HTML {
        if let Some(embedded) = hurl_target(&location.selector) {
            out.push_str(embedded);
            return out.finish();
        }
    }

    if location.protocol == Protocol::Telnet || location.item_type == ItemType::TELNET {
        out.push_str(&format!("telnet://{}:{}", location.host, location.port));
        return out.finish();
    }

    out.push_str("gopher://");
    out.push_str(&location.host);
    if location.host.is_empty() {
        return out.finish();
    }
    if location.port != GOPHER_DEFAULT_PORT {
        out.push_str(&format!(":{}", location.port));
    }
    if location.item_type == ItemType::DIRECTORY && location.selector.is_empty() {
        return out.finish();
    }
    out.push_str("/");
    out.push_byte(location.item_type.0);
    for &b in location.selector.as_bytes() {
        if b <= 0x1F || b >= 0x80 {
            if !out.push_whole(&format!("%{:02X}", b)) {
                break;
            }
        } else if !out.push_byte(b) {
            break;
        }
    }
    out.finish()
}

/// The URL embedded in an hURL selector (`URL:...` or `/URL:...`).
pub fn hurl_target(selector: &str) -> Option<&str> {
    selector
        .strip_prefix("URL:")
        .or_else(|| selector.strip_prefix("/URL:"))
}

/// Byte-bounded output that only ever accepts whole pieces.
struct UrlWriter {
    buf: Vec<u8>,
    max_len: usize,
}

impl UrlWriter {
    fn new(max_len: usize) -> Self {
        Self {
            buf: Vec::with_capacity(max_len.min(256)),
            max_len,
        }
    }

    fn push_byte(&mut self, b: u8) -> bool {
        if self.buf.len() + 1 > self.max_len {
            return false;
        }
        self.buf.push(b);
        true
    }

    /// Appends `s` only if it fits entirely.
    fn push_whole(&mut self, s: &str) -> bool {
        if self.buf.len() + s.len() > self.max_len {
            return false;
        }
        self.buf.extend_from_slice(s.as_bytes());
        true
    }

    /// Appends as many whole chars of `s` as fit.
    fn push_str(&mut self, s: &str) -> bool {
        if self.push_whole(s) {
            return true;
        }
        for c in s.chars() {
            let mut tmp = [0u8; 4];
            let encoded = c.encode_utf8(&mut tmp);
            if self.buf.len() + encoded.len() > self.max_len {
                break;
            }
            self.buf.extend_from_slice(encoded.as_bytes());
        }
        false
    }

    fn finish(self) -> String {
        // Item type bytes may be arbitrary; keep the output valid UTF-8.
        String::from_utf8_lossy(&self.buf).into_owned()
    }
}
