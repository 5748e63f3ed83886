//! Control-channel reply reading and parsing.
//!
//! A reply is one line of the form `<3-digit-code><spaces><text>`. The reader
//! owns a fixed 128-byte line buffer reused across calls; bytes of an
//! oversized line past the buffer are consumed and dropped up to the line
//! terminator so the following read starts cleanly on the next line.

use std::time::Duration;

use crate::net::{Channel, Deadline};

/// Fixed capacity of the reply line buffer.
pub(crate) const REPLY_BUFFER_SIZE: usize = 128;

/// One parsed server reply.
///
/// `code` 0 means the line carried no leading digits -- or, from the blocking
/// read path, that no reply arrived before the deadline.
#[derive(Debug, Clone)]
pub struct Reply {
    pub code: u16,
    pub message: String,
    /// First content byte was `'4'` or `'5'` (or the read timed out):
    /// observing this reply drops the session.
    drops_session: bool,
}

impl Reply {
    pub(crate) fn timed_out() -> Self {
        Reply {
            code: 0,
            message: String::new(),
            drops_session: true,
        }
    }

    /// Provisional and completion replies; everything the engine treats as
    /// command success.
    pub fn is_positive(&self) -> bool {
        (100..400).contains(&self.code)
    }

    pub(crate) fn drops_session(&self) -> bool {
        self.drops_session
    }
}

/// Reads single reply lines off the control channel.
#[derive(Debug)]
pub(crate) struct ReplyReader {
    line: [u8; REPLY_BUFFER_SIZE],
    len: usize,
}

impl ReplyReader {
    pub fn new() -> Self {
        ReplyReader {
            line: [0; REPLY_BUFFER_SIZE],
            len: 0,
        }
    }

    /// Wait for a reply line until `deadline`, sleeping `poll` between
    /// checks. Returns a code-0 reply when nothing arrives in time.
    pub fn read_reply<C: Channel>(&mut self, channel: &mut C, deadline: Deadline, poll: Duration) -> Reply {
        loop {
            if channel.available() > 0 {
                break;
            }
            if deadline.expired() {
                tracing::debug!("no reply before deadline");
                return Reply::timed_out();
            }
            deadline.sleep(poll);
        }
        self.collect_line(channel, Some(&deadline), poll)
            .unwrap_or_else(Reply::timed_out)
    }

    /// Non-blocking variant: parse whatever is buffered right now, or report
    /// that no content bytes are available.
    pub fn try_read_reply<C: Channel>(&mut self, channel: &mut C) -> Option<Reply> {
        if channel.available() == 0 {
            return None;
        }
        self.collect_line(channel, None, Duration::ZERO)
    }

    /// Consume one line into the fixed buffer. With a deadline, waits for the
    /// terminator when the channel runs momentarily dry; without one, stops
    /// as soon as the buffered bytes are drained.
    fn collect_line<C: Channel>(&mut self, channel: &mut C, deadline: Option<&Deadline>, poll: Duration) -> Option<Reply> {
        self.len = 0;
        loop {
            let Some(byte) = channel.read_byte() else {
                match deadline {
                    Some(d) if !d.expired() && channel.is_connected() => {
                        d.sleep(poll);
                        continue;
                    }
                    _ => break,
                }
            };
            // stray whitespace left over from a prior exchange
            if self.len == 0 && matches!(byte, b' ' | b'\r' | b'\n') {
                continue;
            }
            if byte == b'\n' {
                break;
            }
            if self.len < REPLY_BUFFER_SIZE {
                self.line[self.len] = byte;
                self.len += 1;
            }
            // overflow bytes fall through: read and dropped, never stored
        }
        if self.len == 0 {
            return None;
        }
        Some(self.parse())
    }

    fn parse(&self) -> Reply {
        let mut raw = &self.line[..self.len];
        if raw.last() == Some(&b'\r') {
            raw = &raw[..raw.len() - 1];
        }
        let drops_session = matches!(raw.first(), Some(b'4') | Some(b'5'));
        let text = String::from_utf8_lossy(raw);
        let text = text.as_ref();
        let digits = text.bytes().take_while(|b| b.is_ascii_digit()).count();
        let code = text[..digits].parse::<u16>().unwrap_or(0);
        let message = text[digits..].trim_start_matches(' ');
        Reply {
            code,
            message: message.to_string(),
            drops_session,
        }
    }
}
