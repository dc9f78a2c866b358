//! User configuration from `config.toml` in the platform config directory.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use directories::ProjectDirs;
use ratatui::style::{Color, Style};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::constants::{
    COLOR_ENV_VAR, CONNECT_POLL_MS, DEFAULT_COLOR_SCHEME, DNS_CACHE_TTL_SECS, DNS_MAX_ENTRIES,
    DNS_MAX_HOST_LEN, HTTP_HEADER_TIMEOUT_SECS, IDLE_TIMEOUT_SECS, MAX_CACHE_SIZE,
    MAX_HOST_LEN, MAX_MENU_LINES, MAX_SELECTOR_LEN, MAX_URL_LEN, PAGE_BUFFER_SIZE, RECV_WAIT_MS,
};
use crate::dns_cache::DnsCache;
use crate::error::ConfigError;
use crate::fetch::FetchSettings;
use crate::url_codec::UrlLimits;

const CONFIG_FILE: &str = "config.toml";
const BOOKMARKS_FILE: &str = "bookmarks";
const LOG_FILE: &str = "rynx_gopher.log";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    pub page_buffer_size: usize,
    pub max_cache_size: usize,
    pub max_menu_lines: usize,
    pub max_host_len: usize,
    pub max_selector_len: usize,
    pub max_url_len: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            page_buffer_size: PAGE_BUFFER_SIZE,
            max_cache_size: MAX_CACHE_SIZE,
            max_menu_lines: MAX_MENU_LINES,
            max_host_len: MAX_HOST_LEN,
            max_selector_len: MAX_SELECTOR_LEN,
            max_url_len: MAX_URL_LEN,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DnsConfig {
    pub entries: usize,
    pub ttl_secs: u64,
    pub max_host_len: usize,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            entries: DNS_MAX_ENTRIES,
            ttl_secs: DNS_CACHE_TTL_SECS,
            max_host_len: DNS_MAX_HOST_LEN,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub idle_secs: u64,
    pub http_header_secs: u64,
    pub connect_poll_ms: u64,
    pub recv_wait_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            idle_secs: IDLE_TIMEOUT_SECS,
            http_header_secs: HTTP_HEADER_TIMEOUT_SECS,
            connect_poll_ms: CONNECT_POLL_MS,
            recv_wait_ms: RECV_WAIT_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ColorsConfig {
    pub scheme: String,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_COLOR_SCHEME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub limits: LimitsConfig,
    pub dns: DnsConfig,
    pub timeouts: TimeoutsConfig,
    pub colors: ColorsConfig,
    pub bookmarks_file: Option<PathBuf>,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "rynx", "rynx_gopher")
}

/// Directory for the bookmarks file and the log.
pub fn data_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
}

pub fn log_file_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join(LOG_FILE))
}

impl Config {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Load the user's config file. A missing file means defaults; a broken
    /// one is logged and ignored.
    pub fn load() -> Self {
        let Some(dirs) = project_dirs() else {
            debug!("no config directory available, using defaults");
            return Self::default();
        };
        let path = dirs.config_dir().join(CONFIG_FILE);
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => {
                debug!(path = %path.display(), "loaded config");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                Self::default()
            }
        }
    }

    pub fn bookmarks_path(&self) -> PathBuf {
        if let Some(path) = &self.bookmarks_file {
            return path.clone();
        }
        data_dir()
            .map(|dir| dir.join(BOOKMARKS_FILE))
            .unwrap_or_else(|| PathBuf::from(BOOKMARKS_FILE))
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            idle_timeout: Duration::from_secs(self.timeouts.idle_secs),
            http_header_timeout: Duration::from_secs(self.timeouts.http_header_secs),
            connect_poll: Duration::from_millis(self.timeouts.connect_poll_ms.max(1)),
            recv_wait: Duration::from_millis(self.timeouts.recv_wait_ms.max(1)),
        }
    }

    pub fn dns_cache(&self) -> DnsCache {
        DnsCache::new(
            self.dns.entries,
            Duration::from_secs(self.dns.ttl_secs),
            self.dns.max_host_len,
        )
    }

    pub fn url_limits(&self) -> UrlLimits {
        UrlLimits {
            max_host_len: self.limits.max_host_len,
            max_selector_len: self.limits.max_selector_len,
        }
    }

    /// Colors from the environment if set and valid, else from the file,
    /// else the built-in scheme.
    pub fn color_scheme(&self) -> ColorScheme {
        let env = std::env::var(COLOR_ENV_VAR).ok();
        self.color_scheme_with(env.as_deref())
    }

    pub fn color_scheme_with(&self, env_override: Option<&str>) -> ColorScheme {
        env_override
            .and_then(ColorScheme::parse)
            .or_else(|| ColorScheme::parse(&self.colors.scheme))
            .unwrap_or_default()
    }
}

/// Screen colors: nine background/foreground pairs, one per screen element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorScheme {
    pub text: Style,
    pub status_info: Style,
    pub status_warn: Style,
    pub url_bar: Style,
    pub url_bar_deco: Style,
    pub menu_type: Style,
    pub menu_error: Style,
    pub menu_selectable: Style,
    pub menu_current: Style,
}

fn is_valid_scheme(scheme: &str) -> bool {
    static SCHEME: OnceLock<Option<Regex>> = OnceLock::new();
    SCHEME
        .get_or_init(|| Regex::new(r"^[0-9A-Fa-f]{18}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(scheme))
}

/// The sixteen classic text-mode colors.
fn palette(idx: u8) -> Color {
    match idx & 0x0F {
        0 => Color::Black,
        1 => Color::Blue,
        2 => Color::Green,
        3 => Color::Cyan,
        4 => Color::Red,
        5 => Color::Magenta,
        6 => Color::Yellow,
        7 => Color::Gray,
        8 => Color::DarkGray,
        9 => Color::LightBlue,
        10 => Color::LightGreen,
        11 => Color::LightCyan,
        12 => Color::LightRed,
        13 => Color::LightMagenta,
        14 => Color::LightYellow,
        _ => Color::White,
    }
}

impl ColorScheme {
    /// Parse an 18-hex-digit scheme; anything else is rejected.
    pub fn parse(scheme: &str) -> Option<Self> {
        if !is_valid_scheme(scheme) {
            return None;
        }
        let digits: Vec<u8> = scheme
            .chars()
            .filter_map(|c| c.to_digit(16))
            .map(|d| d as u8)
            .collect();
        let pair = |i: usize| Style::default().bg(palette(digits[2 * i])).fg(palette(digits[2 * i + 1]));
        Some(Self {
            text: pair(0),
            status_info: pair(1),
            status_warn: pair(2),
            url_bar: pair(3),
            url_bar_deco: pair(4),
            menu_type: pair(5),
            menu_error: pair(6),
            menu_selectable: pair(7),
            menu_current: pair(8),
        })
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::parse(DEFAULT_COLOR_SCHEME).unwrap_or(Self {
            text: Style::new(),
            status_info: Style::new(),
            status_warn: Style::new(),
            url_bar: Style::new(),
            url_bar_deco: Style::new(),
            menu_type: Style::new(),
            menu_error: Style::new(),
            menu_selectable: Style::new(),
            menu_current: Style::new(),
        })
    }
}
