//! Error types shared by the URL codec, the fetch orchestrator and config loading.

use std::io;
use std::path::PathBuf;

/// Why a URL string could not become a [`crate::models::Location`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("host name too long")]
    HostTooLong,

    #[error("selector too long")]
    SelectorTooLong,

    /// Scheme not understood; host and selector are still reported.
    #[error("unsupported protocol '{scheme}'")]
    UnknownProtocol {
        scheme: String,
        host: String,
        selector: String,
    },
}

/// Terminal outcome of a failed fetch.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Bad URL: {0}")]
    Input(#[from] UrlError),

    #[error("DNS resolution failed!")]
    Resolve,

    #[error("Connection error!")]
    Connect,

    #[error("send() error!")]
    Send,

    #[error("Connection error: {0}")]
    Receive(io::Error),

    #[error("Timeout while waiting for data!")]
    Timeout,

    #[error("Connection aborted by the user.")]
    Aborted,

    #[error("File already exists! Operation aborted.")]
    FileExists(PathBuf),

    #[error("Error: could not create the file on disk!")]
    FileCreate(io::Error),

    #[error("Error: could not write to the file on disk!")]
    FileWrite(io::Error),

    #[error("The selector does not exist or the server returned nothing")]
    EmptyResponse,

    #[error("Telnet sessions are not supported")]
    Unsupported,
}

impl FetchError {
    /// Text for the status bar; everything but a user abort is a warning.
    pub fn status_message(&self) -> String {
        match self {
            FetchError::Aborted => self.to_string(),
            _ => format!("!{}", self),
        }
    }

    pub fn is_user_abort(&self) -> bool {
        matches!(self, FetchError::Aborted)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}
