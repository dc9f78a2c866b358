// User Agent constants
pub const USER_AGENT: &str = "RynxGopher/0.1.0";

// Default ports per protocol
pub const GOPHER_DEFAULT_PORT: u16 = 70;
pub const HTTP_DEFAULT_PORT: u16 = 80;
pub const TELNET_DEFAULT_PORT: u16 = 23;

// Field length limits
pub const MAX_HOST_LEN: usize = 64;
pub const MAX_SELECTOR_LEN: usize = 1024;
pub const MAX_URL_LEN: usize = 1280;
pub const MAX_QUERY_LEN: usize = 256;
pub const MAX_FILENAME_LEN: usize = 63;

// Page and cache limits
pub const PAGE_BUFFER_SIZE: usize = 1024 * 1024; // 1MB
pub const MAX_CACHE_SIZE: usize = 2 * 1024 * 1024; // 2MB
pub const MAX_MENU_LINES: usize = 4096;

// DNS cache
pub const DNS_MAX_ENTRIES: usize = 16;
pub const DNS_MAX_HOST_LEN: usize = 31;
pub const DNS_CACHE_TTL_SECS: u64 = 120;

// Network timing
pub const IDLE_TIMEOUT_SECS: u64 = 20;
pub const HTTP_HEADER_TIMEOUT_SECS: u64 = 2;
pub const CONNECT_POLL_MS: u64 = 8;
pub const RECV_WAIT_MS: u64 = 20;

// Event polling
pub const EVENT_POLL_TIMEOUT_MS: u64 = 10;

// UI layout constants
pub const URL_BAR_HEIGHT: u16 = 1;
pub const STATUS_BAR_HEIGHT: u16 = 1;
pub const MENU_PREFIX_WIDTH: usize = 4;
pub const TAB_WIDTH: usize = 8;
pub const STATUS_MAX_LEN: usize = 80;

// Built-in pages
pub const BUILTIN_HOST_PREFIX: char = '#';
pub const WELCOME_HOST: &str = "#welcome";
pub const MANUAL_HOST: &str = "#manual";

// Default color scheme: nine fg/bg attribute pairs
pub const DEFAULT_COLOR_SCHEME: &str = "177047707818141220";
pub const COLOR_ENV_VAR: &str = "RYNX_GOPHER_COLOR";

pub const QUERY_NOT_CACHED_PAGE: &str = "3Query not in cache\ni\niThis location is not available in the local cache. Queries are not reissued automatically. If you wish to force a reload, press F5.\n";

// Seeded on first run
pub const DEFAULT_BOOKMARKS: &[(&str, &str, u16)] = &[
    ("gopher.floodgap.com", "", 70),
    ("gopherpedia.com", "", 70),
    ("sdf.org", "", 70),
    ("bitreich.org", "", 70),
];
