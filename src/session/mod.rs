//! The FTP session: channel ownership, liveness state, command surface.
//!
//! One session exclusively owns its control and data channels for its whole
//! lifetime. Exactly one command is in flight on the control channel at any
//! time, and every reply is fully consumed before the next command goes out.
//! Every command method follows the same template: refuse immediately when
//! the session is down, write `VERB arg\r\n`, read one reply, and map its
//! status range -- [100,399] succeeds, 4xx/5xx is a rejection that also drops
//! the session so later calls fail fast instead of reading stale replies.

mod passive;
mod transfer;

use std::time::Duration;

use crate::config::{SessionConfig, TransferMode};
use crate::error::{FtpError, Result};
use crate::net::{Channel, Deadline};
use crate::protocol::reply::{Reply, ReplyReader};

/// Fixed capacity of the session's staging buffer for data transfers.
pub(crate) const TRANSFER_BUFFER_SIZE: usize = 1500;

/// Sleep between checks while waiting for a control reply.
const REPLY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Sleep between checks on the data channel during transfers.
pub(crate) const DATA_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Sleep between dual-signal checks after a transfer.
pub(crate) const COMPLETION_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Pause before re-issuing PASV to a server that has not entered passive
/// mode yet.
pub(crate) const PASV_RETRY_INTERVAL: Duration = Duration::from_millis(1000);

/// A client session against one FTP server, generic over the transport.
///
/// Construct with [`FtpSession::new`], then [`open`](FtpSession::open) to
/// connect and log in. All operations are synchronous and may block up to
/// the configured timeout. The only way to cancel a blocked operation is to
/// close the underlying channel out-of-band; the next read observes the
/// disconnect.
pub struct FtpSession<C: Channel> {
    config: SessionConfig,
    control: C,
    data: C,
    connected: bool,
    reply_reader: ReplyReader,
    transfer_buf: [u8; TRANSFER_BUFFER_SIZE],
}

impl<C: Channel> FtpSession<C> {
    /// Wrap the two channels. Nothing touches the wire until `open`.
    pub fn new(config: SessionConfig, control: C, data: C) -> Self {
        FtpSession {
            config,
            control,
            data,
            connected: false,
            reply_reader: ReplyReader::new(),
            transfer_buf: [0; TRANSFER_BUFFER_SIZE],
        }
    }

    /// Connect the control channel, consume the greeting, and log in.
    pub fn open(&mut self) -> Result<()> {
        let host = self.config.host.clone();
        let port = self.config.port;
        self.control
            .connect(&host, port)
            .map_err(|e| FtpError::ConnectionFailed {
                host: format!("{host}:{port}"),
                reason: e.to_string(),
            })?;
        tracing::debug!(%host, port, "control connection established");

        let greeting = self.read_reply();
        Self::check(greeting)?;

        let user = self.config.user.clone();
        let password = self.config.password.clone();
        self.command("USER", &user)?;
        self.command("PASS", &password)?;
        tracing::debug!(%user, "login complete");
        Ok(())
    }

    /// Send `QUIT` and tear down both channels. Does not wait for the
    /// goodbye reply; safe to call in any state.
    pub fn close(&mut self) {
        let _ = self.send_line("QUIT");
        self.control.close();
        self.data.close();
        self.connected = false;
        tracing::debug!("session closed");
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn transfer_mode(&self) -> TransferMode {
        self.config.transfer_mode
    }

    /// Takes effect at the next passive negotiation.
    pub fn set_transfer_mode(&mut self, mode: TransferMode) {
        self.config.transfer_mode = mode;
    }

    pub fn change_directory(&mut self, dir: &str) -> Result<()> {
        self.command("CWD", dir).map(drop)
    }

    pub fn make_directory(&mut self, dir: &str) -> Result<()> {
        self.command("MKD", dir).map(drop)
    }

    pub fn remove_directory(&mut self, dir: &str) -> Result<()> {
        self.command("RMD", dir).map(drop)
    }

    pub fn delete_file(&mut self, path: &str) -> Result<()> {
        self.command("DELE", path).map(drop)
    }

    /// Two-step rename; a failed `RNFR` leaves the target untouched.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        self.command("RNFR", from)?;
        self.command("RNTO", to).map(drop)
    }

    /// Remote file size via `SIZE`. A reply body that does not parse as a
    /// number yields 0.
    pub fn file_size(&mut self, path: &str) -> Result<u32> {
        let reply = self.command("SIZE", path)?;
        Ok(reply.message.trim().parse().unwrap_or(0))
    }

    /// Remote modification timestamp via `MDTM`, as the server sent it
    /// (conventionally `YYYYMMDDhhmmss`).
    pub fn modified_time(&mut self, path: &str) -> Result<String> {
        let reply = self.command("MDTM", path)?;
        Ok(reply.message)
    }

    pub(crate) fn ensure_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(FtpError::NotConnected)
        }
    }

    /// One full command round trip under the session template.
    pub(crate) fn command(&mut self, verb: &str, arg: &str) -> Result<Reply> {
        self.ensure_connected()?;
        let line = if arg.is_empty() {
            verb.to_string()
        } else {
            format!("{verb} {arg}")
        };
        tracing::debug!(%verb, "sending command");
        self.send_line(&line)?;
        let reply = self.read_reply();
        Self::check(reply)
    }

    pub(crate) fn send_line(&mut self, line: &str) -> Result<()> {
        let mut wire = String::with_capacity(line.len() + 2);
        wire.push_str(line);
        wire.push_str("\r\n");
        self.control.write_all(wire.as_bytes())?;
        Ok(())
    }

    /// Map a reply to the command outcome. The 4xx/5xx disconnect side
    /// effect has already been applied by the read path.
    pub(crate) fn check(reply: Reply) -> Result<Reply> {
        if reply.code == 0 {
            return Err(FtpError::Timeout);
        }
        if reply.is_positive() {
            Ok(reply)
        } else {
            Err(FtpError::ServerRejected {
                code: reply.code,
                message: reply.message,
            })
        }
    }

    /// Blocking reply read; updates session liveness on every outcome.
    pub(crate) fn read_reply(&mut self) -> Reply {
        let deadline = Deadline::after(self.config.timeout);
        let reply = self
            .reply_reader
            .read_reply(&mut self.control, deadline, REPLY_POLL_INTERVAL);
        self.apply_liveness(&reply);
        reply
    }

    /// Non-blocking reply read; updates session liveness when a reply is
    /// actually present.
    pub(crate) fn try_read_reply(&mut self) -> Option<Reply> {
        let reply = self.reply_reader.try_read_reply(&mut self.control)?;
        self.apply_liveness(&reply);
        Some(reply)
    }

    fn apply_liveness(&mut self, reply: &Reply) {
        if reply.drops_session() {
            if self.connected {
                tracing::debug!(code = reply.code, "reply dropped the session");
            }
            self.connected = false;
        } else {
            self.connected = true;
        }
    }
}
