//! Passive-mode negotiation: PASV, dual-encoding address parsing, data
//! channel binding, transfer type selection.
//!
//! Servers disagree on how the 227 reply encodes the data endpoint. The
//! common form is six dotted octets `(a,b,c,d,hi,lo)`; a family of embedded
//! servers instead emits one packed integer plus a separate `port N` field.
//! The two are told apart by the magnitude of the first token -- a dotted
//! octet can never exceed 255. A packed encoding whose first token happens
//! to be 255 or less would be misread as dotted; the protocol offers no way
//! to disambiguate, so none is invented here.

use std::net::{Ipv4Addr, SocketAddrV4};

use crate::error::{FtpError, Result};
use crate::net::{Channel, Deadline};
use crate::protocol::status;
use crate::session::{FtpSession, PASV_RETRY_INTERVAL};

impl<C: Channel> FtpSession<C> {
    /// Negotiate a passive data connection and select the transfer type.
    ///
    /// On success the data channel is connected to the returned endpoint and
    /// the server has acknowledged `TYPE`. The endpoint is never reused
    /// across transfers; servers may rebind per PASV.
    pub(crate) fn negotiate_passive(&mut self) -> Result<SocketAddrV4> {
        let deadline = Deadline::after(self.config.timeout);

        let mut reply = self.command("PASV", "")?;
        while reply.code != status::ENTERING_PASSIVE_MODE {
            // some servers need the command re-issued before they comply
            if deadline.expired() {
                tracing::debug!(code = reply.code, "server never entered passive mode");
                return Err(FtpError::Timeout);
            }
            deadline.sleep(PASV_RETRY_INTERVAL);
            reply = self.command("PASV", "")?;
        }

        let endpoint = match parse_passive_reply(&reply.message) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                // the control stream is unrecoverable past a malformed 227
                tracing::debug!(message = %reply.message, "malformed passive reply");
                self.close();
                return Err(e);
            }
        };
        tracing::debug!(%endpoint, "resolved passive data endpoint");

        self.data
            .connect(&endpoint.ip().to_string(), endpoint.port())
            .map_err(|e| FtpError::ConnectionFailed {
                host: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        let type_command = self.config.transfer_mode.type_command();
        self.command(type_command, "")?;
        Ok(endpoint)
    }
}

/// Decode the endpoint from a 227 reply body, auto-detecting the encoding.
pub(crate) fn parse_passive_reply(message: &str) -> Result<SocketAddrV4> {
    let open = message
        .find('(')
        .ok_or_else(|| FtpError::Protocol(format!("passive reply without payload: {message}")))?;
    let payload = &message[open + 1..];

    let first_token = payload.split([',', ')']).next().unwrap_or("").trim();
    let first: u64 = first_token
        .parse()
        .map_err(|_| FtpError::Protocol(format!("non-numeric passive payload: {payload}")))?;

    if first <= 255 {
        parse_dotted(payload)
    } else {
        parse_packed(first, payload)
    }
}

/// `(a,b,c,d,hi,lo)` -- address from the first four octets, port `(hi<<8)|lo`.
fn parse_dotted(payload: &str) -> Result<SocketAddrV4> {
    let mut tokens = payload.split(',');
    let mut fields = [0u8; 6];
    for field in fields.iter_mut() {
        let token = tokens
            .next()
            .ok_or_else(|| FtpError::Protocol(format!("short passive payload: {payload}")))?
            .trim_end_matches(')')
            .trim();
        *field = token
            .parse()
            .map_err(|_| FtpError::Protocol(format!("bad passive octet {token:?}")))?;
    }
    let addr = Ipv4Addr::new(fields[0], fields[1], fields[2], fields[3]);
    let port = u16::from(fields[4]) << 8 | u16::from(fields[5]);
    Ok(SocketAddrV4::new(addr, port))
}

/// `(N, port P)` -- N packs the address with the first octet in the low byte.
fn parse_packed(packed: u64, payload: &str) -> Result<SocketAddrV4> {
    let packed = u32::try_from(packed)
        .map_err(|_| FtpError::Protocol(format!("packed address out of range: {packed}")))?;
    let addr = Ipv4Addr::from(packed.to_le_bytes());

    let port_at = payload
        .find("port")
        .ok_or_else(|| FtpError::Protocol(format!("packed passive reply without port field: {payload}")))?;
    let digits: String = payload[port_at + 4..]
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let port: u16 = digits
        .parse()
        .map_err(|_| FtpError::Protocol(format!("bad passive port field: {payload}")))?;
    Ok(SocketAddrV4::new(addr, port))
}
