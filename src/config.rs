//! Session configuration types.

use std::time::Duration;

/// Default FTP control port.
pub const DEFAULT_FTP_PORT: u16 = 21;

/// Default per-operation timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Representation used for file data on the wire.
///
/// Selected per session and sent as a `TYPE` command during every
/// passive-mode negotiation, since servers reset the type per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Line-oriented text with server-side line-ending translation.
    Ascii,
    /// Verbatim bytes. The right choice for anything that is not text.
    Binary,
}

impl TransferMode {
    /// The wire command selecting this mode.
    pub fn type_command(&self) -> &'static str {
        match self {
            TransferMode::Ascii => "TYPE A",
            TransferMode::Binary => "TYPE I",
        }
    }
}

/// Connection parameters for one FTP session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server host name or address for the control connection.
    pub host: String,
    /// Control connection port.
    pub port: u16,
    /// Login user name.
    pub user: String,
    /// Login password.
    pub password: String,
    /// Deadline applied to every blocking wait (reply reads, first data
    /// bytes, completion detection). Also bounds the PASV re-issue loop.
    pub timeout: Duration,
    /// Initial transfer mode; changeable later via the session.
    pub transfer_mode: TransferMode,
}

impl SessionConfig {
    /// Config for `user`@`host` with default port, timeout, and binary mode.
    pub fn new(host: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        SessionConfig {
            host: host.into(),
            port: DEFAULT_FTP_PORT,
            user: user.into(),
            password: password.into(),
            timeout: DEFAULT_TIMEOUT,
            transfer_mode: TransferMode::Binary,
        }
    }

    /// Override the control port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Override the per-operation timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_ftp_port_and_binary_mode() {
        let config = SessionConfig::new("ftp.example.net", "anonymous", "guest");
        assert_eq!(config.port, DEFAULT_FTP_PORT);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.transfer_mode, TransferMode::Binary);
    }

    #[test]
    fn builder_overrides_apply() {
        let config = SessionConfig::new("h", "u", "p")
            .port(2121)
            .timeout(Duration::from_millis(250));
        assert_eq!(config.port, 2121);
        assert_eq!(config.timeout, Duration::from_millis(250));
    }

    #[test]
    fn type_command_matches_mode() {
        assert_eq!(TransferMode::Ascii.type_command(), "TYPE A");
        assert_eq!(TransferMode::Binary.type_command(), "TYPE I");
    }
}
