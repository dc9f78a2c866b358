//! Resource fetching: DNS cache, connect, request, and streaming the answer
//! into memory or to a file.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::bookmarks::BookmarkStore;
use crate::builtin;
use crate::constants::{
    CONNECT_POLL_MS, HTTP_DEFAULT_PORT, HTTP_HEADER_TIMEOUT_SECS, IDLE_TIMEOUT_SECS,
    RECV_WAIT_MS, USER_AGENT,
};
use crate::dns_cache::DnsCache;
use crate::error::FetchError;
use crate::models::{Location, Protocol};
use crate::status::StatusChannel;
use crate::transport::{ConnectState, Connection, Received, Resolver, Transport};

const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Receives progress while a fetch runs and decides whether to stop it.
pub trait FetchMonitor {
    /// Called once before any network activity.
    fn started(&mut self, _location: &Location) {}

    /// A status message may be pending; show it.
    fn progress(&mut self, status: &mut StatusChannel);

    /// Polled between network waits.
    fn cancel_requested(&mut self) -> bool;
}

/// Monitor that never cancels and discards progress.
#[derive(Debug, Default)]
pub struct SilentMonitor;

impl FetchMonitor for SilentMonitor {
    fn progress(&mut self, status: &mut StatusChannel) {
        status.clear();
    }

    fn cancel_requested(&mut self) -> bool {
        false
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    Complete(usize),
    /// The memory buffer filled up before the server finished.
    Truncated(usize),
}

impl FetchOutcome {
    pub fn len(self) -> usize {
        match self {
            FetchOutcome::Complete(n) | FetchOutcome::Truncated(n) => n,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FetchSettings {
    pub idle_timeout: Duration,
    pub http_header_timeout: Duration,
    pub connect_poll: Duration,
    pub recv_wait: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(IDLE_TIMEOUT_SECS),
            http_header_timeout: Duration::from_secs(HTTP_HEADER_TIMEOUT_SECS),
            connect_poll: Duration::from_millis(CONNECT_POLL_MS),
            recv_wait: Duration::from_millis(RECV_WAIT_MS),
        }
    }
}

/// Aborts the connection unless it was closed gracefully.
struct ConnectionGuard {
    conn: Box<dyn Connection>,
    done: bool,
}

impl ConnectionGuard {
    fn new(conn: Box<dyn Connection>) -> Self {
        Self { conn, done: false }
    }

    async fn close(mut self) {
        self.done = true;
        self.conn.close().await;
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if !self.done {
            self.conn.abort();
        }
    }
}

/// Output file that is deleted again unless committed.
struct PartialFile {
    file: Option<File>,
    path: PathBuf,
    written: u64,
}

impl PartialFile {
    async fn create(path: &Path) -> Result<Self, FetchError> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => FetchError::FileExists(path.to_path_buf()),
                _ => FetchError::FileCreate(e),
            })?;
        Ok(Self {
            file: Some(file),
            path: path.to_path_buf(),
            written: 0,
        })
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), FetchError> {
        if let Some(file) = self.file.as_mut() {
            file.write_all(data).await.map_err(FetchError::FileWrite)?;
            self.written += data.len() as u64;
        }
        Ok(())
    }

    async fn commit(mut self) -> Result<u64, FetchError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await.map_err(FetchError::FileWrite)?;
        }
        Ok(self.written)
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            drop(file);
            match std::fs::remove_file(&self.path) {
                Ok(()) => debug!(path = %self.path.display(), "removed partial file"),
                Err(e) => warn!(path = %self.path.display(), error = %e, "cannot remove partial file"),
            }
        }
    }
}

/// Offset of the payload after an HTTP header block, if the block is complete.
fn header_end(buf: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i < buf.len() {
        if buf[i] == b'\n' {
            let mut j = i + 1;
            if buf.get(j) == Some(&b'\r') {
                j += 1;
            }
            if buf.get(j) == Some(&b'\n') {
                return Some(j + 1);
            }
        }
        i += 1;
    }
    None
}

fn request_line(location: &Location) -> String {
    match location.protocol {
        Protocol::Http => {
            let host = if location.port == HTTP_DEFAULT_PORT {
                location.host.clone()
            } else {
                format!("{}:{}", location.host, location.port)
            };
            format!(
                "GET /{} HTTP/1.0\r\nHost: {}\r\nUser-Agent: {}\r\n\r\n",
                location.selector, host, USER_AGENT
            )
        }
        _ => format!("{}\r\n", location.selector),
    }
}

fn report(status: &mut StatusChannel, monitor: &mut dyn FetchMonitor, msg: impl AsRef<str>) {
    status.post(msg);
    monitor.progress(status);
}

pub struct Fetcher {
    transport: Box<dyn Transport>,
    resolver: Box<dyn Resolver>,
    dns: DnsCache,
    bookmarks: BookmarkStore,
    settings: FetchSettings,
}

impl Fetcher {
    pub fn new(
        transport: Box<dyn Transport>,
        resolver: Box<dyn Resolver>,
        dns: DnsCache,
        bookmarks: BookmarkStore,
        settings: FetchSettings,
    ) -> Self {
        Self {
            transport,
            resolver,
            dns,
            bookmarks,
            settings,
        }
    }

    /// Fetch `location` into `buffer`, or into a new file at `output`.
    ///
    /// With an output file the buffer only stages data, so the size of the
    /// download is not limited by it. Without one, an answer larger than the
    /// buffer is cut short and reported as [`FetchOutcome::Truncated`].
    pub async fn fetch(
        &mut self,
        location: &Location,
        buffer: &mut [u8],
        output: Option<&Path>,
        status: &mut StatusChannel,
        monitor: &mut dyn FetchMonitor,
    ) -> Result<FetchOutcome, FetchError> {
        if location.protocol == Protocol::Telnet {
            return Err(FetchError::Unsupported);
        }
        monitor.started(location);
        if location.is_builtin() {
            return self.fetch_builtin(location, buffer, output, status).await;
        }

        let mut file = match output {
            Some(path) => Some(PartialFile::create(path).await?),
            None => None,
        };

        let address = self.resolve(&location.host, status, monitor).await?;
        report(status, monitor, format!("Connecting to {address}..."));

        let conn = self
            .transport
            .connect(&address, location.port)
            .map_err(|e| {
                debug!(%address, error = %e, "socket creation failed");
                FetchError::Connect
            })?;
        let mut conn = ConnectionGuard::new(conn);
        loop {
            match conn.conn.poll_connected(self.settings.connect_poll).await {
                ConnectState::Ready => break,
                ConnectState::Failed => return Err(FetchError::Connect),
                ConnectState::Pending => {}
            }
            if monitor.cancel_requested() {
                return Err(FetchError::Aborted);
            }
        }

        let request = request_line(location);
        match conn.conn.send(request.as_bytes()).await {
            Ok(n) if n == request.len() => {}
            Ok(n) => {
                debug!(sent = n, expected = request.len(), "short write");
                return Err(FetchError::Send);
            }
            Err(e) => {
                debug!(error = %e, "send failed");
                return Err(FetchError::Send);
            }
        }

        let is_http = location.protocol == Protocol::Http;
        let started = Instant::now();
        let header_deadline = started + self.settings.http_header_timeout;
        let mut last_activity = started;
        let mut last_progress: Option<Instant> = None;
        let mut headers_done = !is_http;
        let mut filled = 0usize;
        let mut truncated = false;

        loop {
            // A full buffer counts as truncated even if the server would have
            // closed right after: a page must leave at least one byte free.
            if filled == buffer.len() {
                truncated = true;
                break;
            }
            let got = conn
                .conn
                .recv(&mut buffer[filled..], self.settings.recv_wait)
                .await
                .map_err(FetchError::Receive)?;
            let now = Instant::now();
            if got == Received::Closed {
                break;
            }
            if monitor.cancel_requested() {
                return Err(FetchError::Aborted);
            }
            let Received::Data(n) = got else {
                if !headers_done && now >= header_deadline {
                    return Err(FetchError::Timeout);
                }
                if now.duration_since(last_activity) >= self.settings.idle_timeout {
                    return Err(FetchError::Timeout);
                }
                continue;
            };

            last_activity = now;
            filled += n;
            if !headers_done {
                match header_end(&buffer[..filled]) {
                    Some(start) => {
                        buffer.copy_within(start..filled, 0);
                        filled -= start;
                        headers_done = true;
                    }
                    None if now >= header_deadline => return Err(FetchError::Timeout),
                    None => continue,
                }
            }

            let total = file.as_ref().map_or(0, |f| f.written as usize) + filled;
            if last_progress.is_none_or(|t| now.duration_since(t) >= PROGRESS_INTERVAL) {
                last_progress = Some(now);
                report(status, monitor, format!("Downloading... [{total} bytes]"));
            }
            if let Some(file) = file.as_mut() {
                if filled > buffer.len() / 2 {
                    file.write(&buffer[..filled]).await?;
                    filled = 0;
                }
            }
        }

        if truncated {
            warn!(host = %location.host, bytes = filled, "answer truncated");
            status.post("!Error: Server's answer is too long! (truncated)");
            return Ok(FetchOutcome::Truncated(filled));
        }

        let total = match file.take() {
            Some(mut file) => {
                file.write(&buffer[..filled]).await?;
                if file.written == 0 {
                    return Err(FetchError::EmptyResponse);
                }
                let saved = file.commit().await?;
                status.post(format!("Saved {saved} bytes on disk"));
                saved as usize
            }
            None if filled == 0 => return Err(FetchError::EmptyResponse),
            None => filled,
        };
        conn.close().await;
        info!(host = %location.host, port = location.port, bytes = total, "fetch complete");
        Ok(FetchOutcome::Complete(total))
    }

    async fn resolve(
        &mut self,
        host: &str,
        status: &mut StatusChannel,
        monitor: &mut dyn FetchMonitor,
    ) -> Result<String, FetchError> {
        if let Some(address) = self.dns.lookup(host) {
            return Ok(address.to_string());
        }
        report(status, monitor, format!("Resolving '{host}'..."));

        let poll = self.settings.connect_poll;
        let cancelled = async {
            loop {
                if monitor.cancel_requested() {
                    break;
                }
                tokio::time::sleep(poll).await;
            }
        };
        let address = tokio::select! {
            res = self.resolver.resolve(host) => res.map_err(|e| {
                debug!(host, error = %e, "resolution failed");
                FetchError::Resolve
            })?,
            _ = cancelled => return Err(FetchError::Aborted),
        };
        self.dns.insert(host, &address);
        Ok(address)
    }

    async fn fetch_builtin(
        &self,
        location: &Location,
        buffer: &mut [u8],
        output: Option<&Path>,
        status: &mut StatusChannel,
    ) -> Result<FetchOutcome, FetchError> {
        let page = builtin::load(&location.host, &self.bookmarks, buffer.len());
        buffer[..page.len()].copy_from_slice(&page);
        if let Some(path) = output {
            let mut file = PartialFile::create(path).await?;
            file.write(&page).await?;
            let saved = file.commit().await?;
            status.post(format!("Saved {saved} bytes on disk"));
        }
        Ok(FetchOutcome::Complete(page.len()))
    }
}
