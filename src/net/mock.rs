//! Scripted in-memory [`Channel`] for unit tests.

use std::collections::VecDeque;
use std::io;

use crate::net::Channel;

/// A channel whose inbound bytes are preloaded by the test and whose
/// outbound bytes are captured for assertions.
#[derive(Debug, Default)]
pub(crate) struct ScriptedChannel {
    incoming: VecDeque<u8>,
    pub written: Vec<u8>,
    pub connected: bool,
    /// When false, `connect` reports refusal instead of succeeding.
    pub accept_connects: bool,
    /// Host/port of the most recent `connect` call.
    pub connected_to: Option<(String, u16)>,
}

impl ScriptedChannel {
    /// A channel that is already connected, as if the host handed it over.
    pub fn connected() -> Self {
        ScriptedChannel {
            connected: true,
            accept_connects: true,
            ..ScriptedChannel::default()
        }
    }

    /// A channel that starts disconnected but will accept `connect`.
    pub fn idle() -> Self {
        ScriptedChannel {
            accept_connects: true,
            ..ScriptedChannel::default()
        }
    }

    /// Queue bytes the "server" will have sent.
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes);
    }

    /// Simulate the remote end closing; queued bytes stay readable.
    pub fn close_remote(&mut self) {
        self.connected = false;
    }

    /// Everything the engine wrote, as text.
    pub fn written_text(&self) -> String {
        String::from_utf8_lossy(&self.written).into_owned()
    }
}

impl Channel for ScriptedChannel {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        self.connected_to = Some((host.to_string(), port));
        if self.accept_connects {
            self.connected = true;
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, "scripted refusal"))
        }
    }

    fn is_connected(&self) -> bool {
        self.connected || !self.incoming.is_empty()
    }

    fn available(&self) -> usize {
        self.incoming.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.incoming.pop_front()
    }

    fn read_some(&mut self, buf: &mut [u8]) -> usize {
        let mut count = 0;
        while count < buf.len() {
            match self.incoming.pop_front() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        if !self.connected {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "scripted channel closed"));
        }
        self.written.extend_from_slice(data);
        Ok(())
    }

    fn close(&mut self) {
        self.connected = false;
        self.incoming.clear();
    }
}
