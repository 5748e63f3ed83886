use thiserror::Error;

/// Errors surfaced by the FTP session engine.
///
/// All failures are ordinary return values; nothing here aborts the process.
/// A `ServerRejected` reply has already dropped the session's connected flag
/// by the time the error reaches the caller, so follow-up commands fail fast
/// with `NotConnected` instead of reading stale replies off the wire.
#[derive(Error, Debug)]
pub enum FtpError {
    #[error("session is not connected")]
    NotConnected,

    #[error("timed out waiting for a server reply")]
    Timeout,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("server rejected command with {code}: {message}")]
    ServerRejected { code: u16, message: String },

    #[error("connection to {host} failed: {reason}")]
    ConnectionFailed { host: String, reason: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, FtpError>;
