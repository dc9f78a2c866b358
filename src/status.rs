use crate::constants::STATUS_MAX_LEN;

/// Single pending status-bar message. The first message posted wins until
/// it is taken; a leading `!` marks a warning.
#[derive(Debug, Default)]
pub struct StatusChannel {
    pending: Option<String>,
}

impl StatusChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `msg` unless a message is already pending.
    pub fn post(&mut self, msg: impl AsRef<str>) {
        if self.pending.is_some() {
            return;
        }
        let msg: String = msg.as_ref().chars().take(STATUS_MAX_LEN + 1).collect();
        if !msg.is_empty() {
            self.pending = Some(msg);
        }
    }

    /// Replace whatever is pending.
    pub fn post_override(&mut self, msg: impl AsRef<str>) {
        self.pending = None;
        self.post(msg);
    }

    pub fn peek(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn take(&mut self) -> Option<String> {
        self.pending.take()
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}

/// Split a status message into its text and warning flag.
pub fn split_warning(msg: &str) -> (&str, bool) {
    match msg.strip_prefix('!') {
        Some(rest) => (rest, true),
        None => (msg, false),
    }
}
