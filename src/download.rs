//! Saving resources to disk.

use std::path::PathBuf;

use crate::models::Location;

/// A fetch-to-file waiting for the navigation loop to run it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingDownload {
    pub location: Location,
    pub path: PathBuf,
}

impl PendingDownload {
    pub fn new(location: Location, path: impl Into<PathBuf>) -> Self {
        Self {
            location,
            path: path.into(),
        }
    }
}

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_-@$().!&".contains(c)
}

/// File name for saving `selector`, at most `max_len` chars.
///
/// Uses the last `/` component. The stem is shortened to make room for the
/// extension and anything outside a small safe set becomes `_`. Returns an
/// empty string when no usable stem is left.
pub fn suggest_filename(selector: &str, max_len: usize) -> String {
    let name = selector.rsplit('/').next().unwrap_or(selector);
    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() => (&name[..dot], &name[dot..]),
        Some(dot) => (&name[..dot], ""),
        None => (name, ""),
    };
    let ext_len = ext.chars().count();
    let stem_len = stem.chars().count().min(max_len.saturating_sub(ext_len));
    if stem_len == 0 {
        return String::new();
    }
    stem.chars()
        .take(stem_len)
        .chain(ext.chars())
        .map(|c| if is_safe_char(c) { c } else { '_' })
        .collect()
}
