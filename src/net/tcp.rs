//! TCP-backed [`Channel`] implementation.
//!
//! The stream runs in non-blocking mode so that `available`/`read_byte`
//! return immediately; the session layers its own deadline-bounded waits on
//! top. Peer-close detection piggybacks on `peek`: a zero-byte peek result
//! on a readable socket means the remote end sent FIN and the buffer is
//! drained.

use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use crate::net::Channel;

/// Pause between retries of a short write on a full socket buffer.
const WRITE_RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// A reconnectable TCP channel.
///
/// Starts disconnected; `connect` may be called again after `close` (the
/// data channel is rebound once per passive negotiation this way).
#[derive(Debug, Default)]
pub struct TcpChannel {
    stream: Option<TcpStream>,
}

impl TcpChannel {
    pub fn new() -> Self {
        TcpChannel { stream: None }
    }
}

impl Channel for TcpChannel {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        self.close();
        let stream = TcpStream::connect((host, port))?;
        stream.set_nonblocking(true)?;
        self.stream = Some(stream);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        let Some(stream) = &self.stream else {
            return false;
        };
        let mut probe = [0u8; 1];
        match stream.peek(&mut probe) {
            Ok(0) => false,
            Ok(_) => true,
            Err(e) if e.kind() == ErrorKind::WouldBlock => true,
            Err(_) => false,
        }
    }

    fn available(&self) -> usize {
        let Some(stream) = &self.stream else {
            return 0;
        };
        let mut probe = [0u8; 1];
        match stream.peek(&mut probe) {
            Ok(n) => n,
            Err(_) => 0,
        }
    }

    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.read_some(&mut byte) {
            1 => Some(byte[0]),
            _ => None,
        }
    }

    fn read_some(&mut self, buf: &mut [u8]) -> usize {
        let Some(stream) = &mut self.stream else {
            return 0;
        };
        match stream.read(buf) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::WouldBlock => 0,
            Err(_) => 0,
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let Some(stream) = &mut self.stream else {
            return Err(io::Error::new(ErrorKind::NotConnected, "channel is not connected"));
        };
        let mut written = 0;
        while written < data.len() {
            match stream.write(&data[written..]) {
                Ok(0) => {
                    return Err(io::Error::new(ErrorKind::WriteZero, "connection closed mid-write"));
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    std::thread::sleep(WRITE_RETRY_INTERVAL);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}
