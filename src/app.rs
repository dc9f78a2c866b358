use std::collections::TryReserveError;
use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::bookmarks::{AddOutcome, BookmarkStore};
use crate::config::{ColorScheme, Config, LimitsConfig};
use crate::constants::{MAX_FILENAME_LEN, MAX_QUERY_LEN};
use crate::document;
use crate::download::{PendingDownload, suggest_filename};
use crate::error::{FetchError, UrlError};
use crate::fetch::{FetchMonitor, Fetcher};
use crate::history::{HistoryNode, HistoryStack};
use crate::menu::{self, MenuLine};
use crate::models::{DisplayOrder, InputMode, ItemType, LineEditor, Location, Protocol, ViewMemory};
use crate::status::StatusChannel;
use crate::transport::{SystemResolver, TcpTransport};
use crate::url_codec::{self, UrlLimits};
use crate::view::{self, ScrollKey};
use crate::wordwrap::wrap_all;

pub const QUIT_WARNING: &str =
    "!YOU ARE ABOUT TO QUIT. PRESS ESC TO CONFIRM, OR ANY OTHER KEY TO ABORT.";
pub const DOWNLOAD_PROMPT: &str = "Download as: ";
pub const QUERY_PROMPT: &str = "Enter a query: ";
pub const MENU_TRUNCATED: &str = "!ERROR: Too many lines, the document has been truncated.";

/// Allocate the page buffer up front so a failure can be reported cleanly.
pub fn page_buffer(size: usize) -> Result<Vec<u8>, TryReserveError> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(size)?;
    buffer.resize(size, 0);
    Ok(buffer)
}

pub struct App {
    pub history: HistoryStack,
    pub status: StatusChannel,
    /// Message shown in the status bar until the next key press.
    pub status_line: String,
    pub input_mode: InputMode,
    pub editor: LineEditor,
    pub colors: ColorScheme,
    pub limits: LimitsConfig,
    pub cols: u16,
    pub rows: u16,
    pub should_quit: bool,
    pub clipboard: Option<arboard::Clipboard>,
    fetcher: Fetcher,
    bookmarks: BookmarkStore,
    url_limits: UrlLimits,
    buffer: Vec<u8>,
    /// Location a query or "save as" prompt applies to.
    prompt_target: Option<Location>,
    downloads: VecDeque<PendingDownload>,
    /// Depth and location of the menu last brought on screen.
    displayed_menu: Option<(usize, Location)>,
}

impl App {
    pub fn new(config: &Config, fetcher: Fetcher) -> Result<Self, TryReserveError> {
        let buffer = page_buffer(config.limits.page_buffer_size)?;
        let mut history = HistoryStack::new();
        history.push(Location::welcome());
        Ok(Self {
            history,
            status: StatusChannel::new(),
            status_line: String::new(),
            input_mode: InputMode::Normal,
            editor: LineEditor::default(),
            colors: config.color_scheme(),
            limits: config.limits.clone(),
            cols: 80,
            rows: 25,
            should_quit: false,
            clipboard: None,
            fetcher,
            bookmarks: BookmarkStore::new(config.bookmarks_path()),
            url_limits: config.url_limits(),
            buffer,
            prompt_target: None,
            downloads: VecDeque::new(),
            displayed_menu: None,
        })
    }

    /// App talking to the real network.
    pub fn from_config(config: &Config) -> Result<Self, TryReserveError> {
        let fetcher = Fetcher::new(
            Box::new(TcpTransport),
            Box::new(SystemResolver),
            config.dns_cache(),
            BookmarkStore::new(config.bookmarks_path()),
            config.fetch_settings(),
        );
        Self::new(config, fetcher)
    }

    pub fn bookmarks(&self) -> &BookmarkStore {
        &self.bookmarks
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols.max(1);
        self.rows = rows;
    }

    /// Rows between the URL bar and the status bar.
    pub fn content_rows(&self) -> usize {
        usize::from(self.rows.saturating_sub(2)).max(1)
    }

    pub fn current(&self) -> Option<&HistoryNode> {
        self.history.top()
    }

    pub fn current_url(&self) -> String {
        self.current()
            .map(|node| url_codec::build_bounded(&node.location, self.limits.max_url_len))
            .unwrap_or_default()
    }

    pub fn open(&mut self, location: Location) {
        debug!(url = %url_codec::build(&location), "open");
        self.history.push(location);
    }

    /// Move a pending status message into the status bar.
    pub fn take_status(&mut self) {
        if let Some(msg) = self.status.take() {
            self.status_line = msg;
        }
    }

    pub fn pending_downloads(&self) -> usize {
        self.downloads.len()
    }

    /// Bring the top of the history into a displayable state: run queued
    /// downloads, fetch missing content, and drop locations that cannot be
    /// shown. Returns once the top page is ready or waits for user input.
    pub async fn pump(&mut self, monitor: &mut dyn FetchMonitor) {
        self.run_downloads(monitor).await;

        loop {
            let Some(top) = self.history.top() else {
                self.history.push(Location::welcome());
                continue;
            };
            let location = top.location.clone();
            if location.protocol == Protocol::Telnet || location.item_type == ItemType::TELNET {
                self.status.post(FetchError::Unsupported.status_message());
                self.history.pop();
                continue;
            }
            if !location.item_type.is_displayable() {
                if self.input_mode != InputMode::SaveAs {
                    self.begin_save_as(location);
                }
                return;
            }
            if top.cache.is_some() {
                self.check_displayed_menu();
                return;
            }

            let result = self
                .fetcher
                .fetch(&location, &mut self.buffer, None, &mut self.status, monitor)
                .await;
            match result {
                Ok(outcome) => {
                    let len = outcome.len();
                    self.history.cleanup_cache(self.limits.max_cache_size);
                    if let Some(top) = self.history.top_mut() {
                        top.cache = Some(self.buffer[..len].to_vec());
                    }
                    if !location.item_type.is_menu() {
                        self.status.post(format!("file loaded ({len} bytes)"));
                    }
                }
                Err(e) => {
                    if !e.is_user_abort() {
                        warn!(url = %url_codec::build(&location), error = %e, "fetch failed");
                    }
                    self.status.post(e.status_message());
                    self.history.pop();
                }
            }
        }
    }

    async fn run_downloads(&mut self, monitor: &mut dyn FetchMonitor) {
        while let Some(download) = self.downloads.pop_front() {
            let result = self
                .fetcher
                .fetch(
                    &download.location,
                    &mut self.buffer,
                    Some(&download.path),
                    &mut self.status,
                    monitor,
                )
                .await;
            match result {
                Ok(outcome) => {
                    info!(path = %download.path.display(), bytes = outcome.len(), "download saved");
                }
                Err(e) => {
                    warn!(path = %download.path.display(), error = %e, "download failed");
                    self.status.post(e.status_message());
                }
            }
        }
    }

    pub fn apply(&mut self, order: DisplayOrder) {
        match order {
            DisplayOrder::None => {}
            DisplayOrder::Back => self.go_back(),
            DisplayOrder::Refresh => self.refresh(),
            DisplayOrder::Quit => self.should_quit = true,
        }
    }

    /// Return to the previous page. The first page has nowhere to go back to.
    pub fn go_back(&mut self) {
        if self.history.depth() > 1 {
            self.history.pop();
        }
    }

    /// Drop the current page's content and view so it is fetched again.
    pub fn refresh(&mut self) {
        self.displayed_menu = None;
        if let Some(top) = self.history.top_mut() {
            top.invalidate();
        }
    }

    pub fn open_home(&mut self) {
        self.open(Location::welcome());
    }

    pub fn open_manual(&mut self) {
        self.open(Location::manual());
    }

    /// Warn once each time a menu comes on screen cut short by the line limit.
    fn check_displayed_menu(&mut self) {
        let Some(node) = self.current().filter(|n| n.location.item_type.is_menu()) else {
            self.displayed_menu = None;
            return;
        };
        let key = (self.history.depth(), node.location.clone());
        if self.displayed_menu.as_ref() == Some(&key) {
            return;
        }
        let truncated = self.with_menu(|page, _| page.truncated).unwrap_or(false);
        if truncated {
            warn!(url = %url_codec::build(&key.1), lines = self.limits.max_menu_lines, "menu truncated");
            self.status.post(MENU_TRUNCATED);
        }
        self.displayed_menu = Some(key);
    }

    fn is_menu_page(&self) -> bool {
        self.current().is_some_and(|n| n.location.item_type.is_menu())
    }

    /// Run `f` over the current menu with its effective view.
    fn with_menu<R>(&self, f: impl FnOnce(&menu::MenuPage<'_>, ViewMemory) -> R) -> Option<R> {
        let node = self.current().filter(|n| n.location.item_type.is_menu())?;
        let text = menu::decode(node.cache.as_deref().unwrap_or_default());
        let page = menu::explode(&text, usize::from(self.cols), self.limits.max_menu_lines);
        Some(f(&page, view::menu_view(&page, node.view)))
    }

    /// Wrapped lines of the current text document.
    pub fn text_lines(&self) -> Vec<String> {
        let Some(node) = self.current() else {
            return Vec::new();
        };
        let body = document::prepare(
            node.location.item_type,
            node.cache.as_deref().unwrap_or_default(),
            self.limits.page_buffer_size,
        );
        wrap_all(&body, usize::from(self.cols))
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn selected_line<R>(&self, f: impl FnOnce(&MenuLine<'_>) -> R) -> Option<R> {
        self.with_menu(|page, view| {
            view.selected_line
                .and_then(|idx| page.lines.get(idx))
                .map(f)
        })
        .flatten()
    }

    /// Where the selected menu entry leads.
    pub fn selected_location(&self) -> Option<Location> {
        self.selected_line(|line| line.location()).flatten()
    }

    pub fn scroll(&mut self, key: ScrollKey) {
        self.check_displayed_menu();
        let visible = self.content_rows();
        let new_view = if self.is_menu_page() {
            self.with_menu(|page, view| view::navigate_menu(page, view, key, visible))
        } else {
            let lines = self.text_lines().len();
            let scrolled = self
                .current()
                .map(|node| view::scroll_text(lines, node.view, key, visible));
            scrolled.map(|(view, notice)| {
                if let Some(notice) = notice {
                    self.status.post(notice);
                }
                view
            })
        };
        if let (Some(view), Some(top)) = (new_view, self.history.top_mut()) {
            top.view = view;
        }
    }

    /// Follow the selected menu entry. Query entries ask for search terms
    /// first; with `as_binary` the target is saved to disk instead.
    pub fn activate_selected(&mut self, as_binary: bool) {
        if let Some(view) = self.with_menu(|_, view| view) {
            if let Some(top) = self.history.top_mut() {
                top.view = view;
            }
        }
        let Some(target) = self.selected_location() else {
            return;
        };
        if target.item_type == ItemType::QUERY && !as_binary {
            self.begin_query(target);
            return;
        }
        match url_codec::parse_with(&url_codec::build(&target), &self.url_limits) {
            Ok(location) if as_binary => self.open(location.with_item_type(ItemType::BINARY)),
            Ok(location) => self.open(location),
            Err(e) => {
                debug!(error = %e, "selected entry has no usable URL");
                self.status.post("!Bad URL");
            }
        }
    }

    /// Save the document being viewed as a binary file.
    pub fn save_current_as_binary(&mut self) {
        if let Some(node) = self.current() {
            let location = node.location.with_item_type(ItemType::BINARY);
            self.open(location);
        }
    }

    pub fn bookmark_current(&mut self) {
        let Some(node) = self.current() else {
            return;
        };
        match self.bookmarks.add_if_absent(&node.location) {
            Ok(AddOutcome::Added) => self.status.post("Bookmark saved"),
            Ok(AddOutcome::AlreadyPresent) => self.status.post("!This location is already bookmarked"),
            Err(e) => {
                warn!(path = %self.bookmarks.path().display(), error = %e, "cannot save bookmark");
                self.status.post("!Bookmarks file access error");
            }
        }
    }

    /// On the welcome page, forget the selected bookmark.
    pub fn delete_selected_bookmark(&mut self) -> DisplayOrder {
        let on_welcome = self
            .current()
            .is_some_and(|n| n.location.host.starts_with("#w"));
        if !on_welcome {
            return DisplayOrder::None;
        }
        let key = self.selected_line(|line| {
            (
                line.host.map(str::to_string),
                line.port,
                line.selector.map(str::to_string),
            )
        });
        let Some((host, port, selector)) = key else {
            return DisplayOrder::None;
        };
        if let Err(e) = self
            .bookmarks
            .remove(host.as_deref(), port, selector.as_deref())
        {
            warn!(path = %self.bookmarks.path().display(), error = %e, "cannot delete bookmark");
            self.status.post("!Bookmarks file access error");
        }
        DisplayOrder::Refresh
    }

    /// Queue every downloadable entry of the current menu.
    pub fn download_all(&mut self) {
        let entries = self
            .with_menu(|page, _| {
                page.lines
                    .iter()
                    .filter(|line| line.is_downloadable())
                    .filter_map(|line| {
                        let location = line.location()?;
                        let name = suggest_filename(line.selector.unwrap_or(""), MAX_FILENAME_LEN);
                        (!name.is_empty()).then(|| PendingDownload::new(location, name))
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        info!(count = entries.len(), "queued menu download");
        self.downloads.extend(entries);
    }

    pub fn begin_url_edit(&mut self) {
        self.editor = LineEditor::new(self.current_url(), self.limits.max_url_len);
        self.input_mode = InputMode::EditingUrl;
    }

    fn begin_query(&mut self, target: Location) {
        self.editor = LineEditor::new("", MAX_QUERY_LEN);
        self.prompt_target = Some(target);
        self.input_mode = InputMode::Query;
    }

    fn begin_save_as(&mut self, target: Location) {
        let name = suggest_filename(&target.selector, MAX_FILENAME_LEN);
        self.editor = LineEditor::new(name, MAX_FILENAME_LEN + 1);
        self.prompt_target = Some(target);
        self.status.clear();
        self.status_line.clear();
        self.input_mode = InputMode::SaveAs;
    }

    pub fn ask_quit(&mut self) {
        self.status.post_override(QUIT_WARNING);
        self.input_mode = InputMode::ConfirmQuit;
    }

    /// Accept whatever the line editor holds for the active prompt.
    pub fn submit_input(&mut self) {
        let text = std::mem::take(&mut self.editor.text);
        let target = self.prompt_target.take();
        let mode = std::mem::replace(&mut self.input_mode, InputMode::Normal);
        match mode {
            InputMode::EditingUrl => self.submit_url(&text),
            InputMode::Query => {
                if let Some(target) = target {
                    let selector = format!("{}\t{}", target.selector, text);
                    self.open(Location { selector, ..target });
                }
            }
            InputMode::SaveAs => {
                if let Some(target) = target {
                    if !text.is_empty() {
                        self.downloads.push_back(PendingDownload::new(target, text));
                    }
                }
                self.history.pop();
            }
            InputMode::Normal | InputMode::ConfirmQuit => {}
        }
        self.editor.clear();
    }

    /// Leave the active prompt without acting on it.
    pub fn cancel_input(&mut self) {
        if self.input_mode == InputMode::SaveAs {
            self.history.pop();
        }
        self.input_mode = InputMode::Normal;
        self.prompt_target = None;
        self.editor.clear();
    }

    fn submit_url(&mut self, url: &str) {
        match url_codec::parse_with(url, &self.url_limits) {
            Ok(location) => self.open(location),
            Err(UrlError::UnknownProtocol { scheme, .. }) => {
                debug!(scheme, "unsupported protocol");
                self.status.post("!Unsupported protocol");
            }
            Err(e) => {
                debug!(error = %e, "rejected URL");
                self.status.post("!Bad URL");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::SilentMonitor;
    use tempfile::TempDir;

    fn test_app(dir: &TempDir) -> App {
        let config = Config {
            bookmarks_file: Some(dir.path().join("bookmarks")),
            ..Config::default()
        };
        let mut app = App::from_config(&config).unwrap();
        app.resize(80, 12);
        app
    }

    fn show_menu(app: &mut App, location: Location, body: &str) {
        app.open(location);
        app.history.top_mut().unwrap().cache = Some(body.as_bytes().to_vec());
    }

    const MENU: &str = "iHello\n\
                        0Readme\t/readme.txt\texample.org\t70\n\
                        7Search\t/search\texample.org\t70\n\
                        9Tarball\t/files/pkg.tar.gz\texample.org\t70\n\
                        8Chat\t\tbbs.example.org\t23\n";

    fn example_dir() -> Location {
        Location::gopher("example.org", 70, ItemType::DIRECTORY, "/")
    }

    #[test]
    fn starts_on_welcome_page() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir);
        assert_eq!(app.history.depth(), 1);
        assert!(app.current().unwrap().location.is_same(&Location::welcome()));
        assert_eq!(app.current_url(), "gopher://#welcome");
    }

    #[tokio::test]
    async fn pump_loads_builtin_welcome_page() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.pump(&mut SilentMonitor).await;
        let cache = app.current().unwrap().cache.clone().unwrap();
        assert!(!cache.is_empty());
    }

    #[test]
    fn selection_starts_on_first_link() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        show_menu(&mut app, example_dir(), MENU);
        let selected = app.selected_location().unwrap();
        assert_eq!(selected.selector, "/readme.txt");
        app.scroll(ScrollKey::Down);
        assert_eq!(app.selected_location().unwrap().item_type, ItemType::QUERY);
    }

    #[test]
    fn enter_on_query_prompts_then_pushes_search() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        show_menu(&mut app, example_dir(), MENU);
        app.scroll(ScrollKey::Down);
        app.activate_selected(false);
        assert_eq!(app.input_mode, InputMode::Query);
        app.editor.insert_str("rust");
        app.submit_input();
        assert_eq!(app.input_mode, InputMode::Normal);
        let top = &app.current().unwrap().location;
        assert_eq!(top.selector, "/search\trust");
        assert_eq!(top.item_type, ItemType::QUERY);
    }

    #[tokio::test]
    async fn binary_entry_asks_where_to_save() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        show_menu(&mut app, example_dir(), MENU);
        app.scroll(ScrollKey::Down);
        app.scroll(ScrollKey::Down);
        app.activate_selected(false);
        assert_eq!(app.history.depth(), 3);
        app.pump(&mut SilentMonitor).await;
        assert_eq!(app.input_mode, InputMode::SaveAs);
        assert_eq!(app.editor.text, "pkg.tar.gz");
        app.cancel_input();
        assert_eq!(app.history.depth(), 2);
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[tokio::test]
    async fn telnet_entries_are_refused() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        show_menu(&mut app, example_dir(), MENU);
        app.scroll(ScrollKey::End);
        app.activate_selected(false);
        app.pump(&mut SilentMonitor).await;
        assert_eq!(app.history.depth(), 2);
        app.take_status();
        assert_eq!(app.status_line, "!Telnet sessions are not supported");
    }

    #[test]
    fn bookmarking_twice_warns() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        show_menu(&mut app, example_dir(), MENU);
        app.bookmark_current();
        app.take_status();
        assert_eq!(app.status_line, "Bookmark saved");
        app.bookmark_current();
        app.take_status();
        assert_eq!(app.status_line, "!This location is already bookmarked");
    }

    #[tokio::test]
    async fn delete_on_welcome_removes_bookmark() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        show_menu(&mut app, example_dir(), MENU);
        app.bookmark_current();
        app.go_back();
        app.pump(&mut SilentMonitor).await;
        assert!(app.bookmarks().contains(&example_dir()).unwrap());

        app.scroll(ScrollKey::End);
        let order = app.delete_selected_bookmark();
        assert_eq!(order, DisplayOrder::Refresh);
        assert!(!app.bookmarks().contains(&example_dir()).unwrap());
    }

    #[test]
    fn url_bar_rejects_unknown_protocol() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.begin_url_edit();
        app.editor.clear();
        app.editor.insert_str("ftp://ftp.example.org/");
        app.submit_input();
        app.take_status();
        assert_eq!(app.status_line, "!Unsupported protocol");
        assert_eq!(app.history.depth(), 1);

        app.begin_url_edit();
        app.editor.clear();
        app.editor.insert_str("gopher.example.org:7070/0/about");
        app.submit_input();
        let top = &app.current().unwrap().location;
        assert_eq!(top.port, 7070);
        assert_eq!(top.item_type, ItemType::TEXT);
    }

    #[test]
    fn download_all_queues_downloadable_entries() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        show_menu(&mut app, example_dir(), MENU);
        app.download_all();
        // readme, search and tarball; telnet and info lines are skipped
        assert_eq!(app.pending_downloads(), 3);
    }

    #[test]
    fn text_scrolling_posts_edge_notices() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        let doc = Location::gopher("example.org", 70, ItemType::TEXT, "/doc");
        show_menu(&mut app, doc, "line\n");
        app.scroll(ScrollKey::Up);
        app.take_status();
        assert_eq!(app.status_line, view::TOP_OF_FILE);
    }

    #[tokio::test]
    async fn oversized_menu_warns_once() {
        let dir = TempDir::new().unwrap();
        let mut config = Config {
            bookmarks_file: Some(dir.path().join("bookmarks")),
            ..Config::default()
        };
        config.limits.max_menu_lines = 3;
        let mut app = App::from_config(&config).unwrap();
        app.resize(80, 12);
        let body: String = (0..10).map(|i| format!("iline {i}\n")).collect();
        show_menu(&mut app, example_dir(), &body);

        app.pump(&mut SilentMonitor).await;
        app.take_status();
        assert_eq!(app.status_line, MENU_TRUNCATED);

        app.status_line.clear();
        app.scroll(ScrollKey::Down);
        app.pump(&mut SilentMonitor).await;
        app.take_status();
        assert_eq!(app.status_line, "");
    }

    #[test]
    fn scrolling_an_injected_oversized_menu_warns() {
        let dir = TempDir::new().unwrap();
        let mut config = Config {
            bookmarks_file: Some(dir.path().join("bookmarks")),
            ..Config::default()
        };
        config.limits.max_menu_lines = 3;
        let mut app = App::from_config(&config).unwrap();
        let body: String = (0..10).map(|i| format!("0item {i}\t/{i}\texample.org\t70\n")).collect();
        show_menu(&mut app, example_dir(), &body);
        app.scroll(ScrollKey::Down);
        app.take_status();
        assert_eq!(app.status_line, MENU_TRUNCATED);
    }

    #[test]
    fn back_never_empties_history() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.apply(DisplayOrder::Back);
        assert_eq!(app.history.depth(), 1);
        app.apply(DisplayOrder::Quit);
        assert!(app.should_quit);
    }
}
