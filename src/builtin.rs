//! Pages served locally for `#`-prefixed hosts.

use tracing::warn;

use crate::bookmarks::BookmarkStore;
use crate::constants::BUILTIN_HOST_PREFIX;

const WELCOME_PAGE: &str = include_str!("../assets/welcome.gph");
const MANUAL_PAGE: &str = include_str!("../assets/manual.txt");

/// Content of the built-in page named by `host`, at most `max` bytes.
///
/// `#manual` (anything starting with `m`) is the help text; every other
/// token is the welcome menu followed by the bookmark records.
pub fn load(host: &str, bookmarks: &BookmarkStore, max: usize) -> Vec<u8> {
    let token = host.strip_prefix(BUILTIN_HOST_PREFIX).unwrap_or(host);
    let mut page = if token.starts_with('m') {
        MANUAL_PAGE.as_bytes().to_vec()
    } else {
        let mut page = WELCOME_PAGE.as_bytes().to_vec();
        match bookmarks.read_all() {
            Ok(records) => page.extend_from_slice(&records),
            Err(e) => warn!(path = %bookmarks.path().display(), error = %e, "cannot read bookmarks"),
        }
        page
    };
    page.truncate(max);
    page
}
