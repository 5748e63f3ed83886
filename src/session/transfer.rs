//! Data-channel transfers: upload staging, streaming and bounded downloads,
//! listing retrieval, and transfer-completion detection.
//!
//! The end of a transfer announces itself twice -- the server closes the data
//! socket and sends `226` on the control channel -- and the two signals
//! arrive in either order or together, depending on the peer's stack. The
//! completion detector polls both under one deadline and consumes the `226`
//! so the control channel stays in sync for the next command.

use crate::error::Result;
use crate::net::{Channel, Deadline};
use crate::protocol::listing::{parse_list_line, ListEntry, ListMode};
use crate::protocol::status;
use crate::session::{
    FtpSession, COMPLETION_POLL_INTERVAL, DATA_POLL_INTERVAL, TRANSFER_BUFFER_SIZE,
};

impl<C: Channel> FtpSession<C> {
    /// Negotiate the data channel and announce an upload with `STOR` (or
    /// `APPE` when `append`). Follow with [`write_bytes`](Self::write_bytes)
    /// / [`write_text`](Self::write_text), then
    /// [`close_transfer`](Self::close_transfer).
    pub fn begin_upload(&mut self, path: &str, append: bool) -> Result<()> {
        self.negotiate_passive()?;
        let verb = if append { "APPE" } else { "STOR" };
        if let Err(e) = self.command(verb, path) {
            self.data.close();
            return Err(e);
        }
        tracing::debug!(%path, append, "upload started");
        Ok(())
    }

    /// Write file data to the bound data channel, staged through the
    /// session's fixed transfer buffer in full chunks.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_connected()?;
        for chunk in data.chunks(TRANSFER_BUFFER_SIZE) {
            let staged = &mut self.transfer_buf[..chunk.len()];
            staged.copy_from_slice(chunk);
            self.data.write_all(staged)?;
        }
        tracing::trace!(len = data.len(), "data bytes written");
        Ok(())
    }

    /// Text convenience over [`write_bytes`](Self::write_bytes).
    pub fn write_text(&mut self, text: &str) -> Result<()> {
        self.write_bytes(text.as_bytes())
    }

    /// Close the data channel and wait for the server to confirm the
    /// transfer. Returns false when the deadline elapses with no completion
    /// signal -- a possible stall, not a completed transfer.
    pub fn close_transfer(&mut self) -> Result<bool> {
        self.data.close();
        self.ensure_connected()?;
        Ok(self.wait_transfer_complete(Deadline::after(self.config.timeout)))
    }

    /// Poll "data channel closed" and "control reply received" until both
    /// have been observed or the deadline elapses. Either signal alone makes
    /// the transfer count as ended; polling continues for the other so its
    /// timing lands in the logs.
    pub(crate) fn wait_transfer_complete(&mut self, deadline: Deadline) -> bool {
        let mut data_closed = false;
        let mut reply_seen = false;
        let mut finished = false;
        loop {
            if !data_closed && !self.data.is_connected() {
                tracing::debug!("data channel closed by peer");
                data_closed = true;
                finished = true;
            }
            if let Some(reply) = self.try_read_reply() {
                if !reply_seen {
                    tracing::debug!(code = reply.code, "control reply during transfer wind-down");
                }
                reply_seen = true;
                if reply.code == status::TRANSFER_COMPLETE {
                    finished = true;
                }
            }
            if (data_closed && reply_seen) || deadline.expired() {
                break;
            }
            deadline.sleep(COMPLETION_POLL_INTERVAL);
        }
        if !finished {
            tracing::warn!("transfer wind-down deadline elapsed with no completion signal");
        }
        finished
    }

    /// Download `path` into `buf`. Returns the byte count stored; data past
    /// the buffer's capacity is drained off the channel and dropped.
    pub fn download_to_buffer(&mut self, path: &str, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        self.download_streaming(path, |_, chunk| {
            let take = chunk.len().min(buf.len() - filled);
            buf[filled..filled + take].copy_from_slice(&chunk[..take]);
            filled += take;
        })?;
        Ok(filled)
    }

    /// Download `path` into an owned string, lossily decoding UTF-8.
    pub fn download_to_string(&mut self, path: &str) -> Result<String> {
        let mut out = String::new();
        self.download_streaming(path, |_, chunk| {
            out.push_str(&String::from_utf8_lossy(chunk));
        })?;
        Ok(out)
    }

    /// Download `path`, handing each received chunk to `on_chunk(path,
    /// chunk)` as it arrives. The chunk slice borrows the session's transfer
    /// buffer and is only valid for the duration of the callback. Every
    /// received chunk resets the idle deadline; the download ends when the
    /// server closes the data channel or the idle window passes.
    pub fn download_streaming<F>(&mut self, path: &str, mut on_chunk: F) -> Result<u64>
    where
        F: FnMut(&str, &[u8]),
    {
        self.begin_download(path)?;
        let mut total: u64 = 0;
        let mut idle = Deadline::after(self.config.timeout);
        loop {
            let count = self.data.read_some(&mut self.transfer_buf);
            if count > 0 {
                on_chunk(path, &self.transfer_buf[..count]);
                total += count as u64;
                idle = Deadline::after(self.config.timeout);
                continue;
            }
            if !self.data.is_connected() || idle.expired() {
                break;
            }
            idle.sleep(DATA_POLL_INTERVAL);
        }
        tracing::debug!(%path, total, "download drained");
        self.wait_transfer_complete(Deadline::after(self.config.timeout));
        Ok(total)
    }

    fn begin_download(&mut self, path: &str) -> Result<()> {
        self.negotiate_passive()?;
        if let Err(e) = self.command("RETR", path) {
            self.data.close();
            return Err(e);
        }
        tracing::debug!(%path, "download started");
        Ok(())
    }

    /// Retrieve a directory listing. `Standard` issues `MLSD` and returns
    /// lines as raw names; `WithFacts` issues `LIST` and parses every line.
    /// At most `max_entries` entries are kept -- further lines are read off
    /// the channel and discarded.
    pub fn list_directory(&mut self, dir: &str, mode: ListMode, max_entries: usize) -> Result<Vec<ListEntry>> {
        let verb = match mode {
            ListMode::Standard => "MLSD",
            ListMode::WithFacts => "LIST",
        };
        self.negotiate_passive()?;
        if let Err(e) = self.command(verb, dir) {
            self.data.close();
            return Err(e);
        }

        let mut entries = Vec::new();
        let mut dropped = 0usize;
        let mut idle = Deadline::after(self.config.timeout);
        while let Some(line) = self.read_data_line(&mut idle) {
            if entries.len() < max_entries {
                let entry = match mode {
                    ListMode::Standard => ListEntry {
                        name: line.strip_suffix('\r').unwrap_or(&line).to_string(),
                        is_directory: false,
                        size: 0,
                    },
                    ListMode::WithFacts => parse_list_line(&line),
                };
                entries.push(entry);
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            tracing::debug!(dropped, "listing lines past capacity discarded");
        }
        self.wait_transfer_complete(Deadline::after(self.config.timeout));
        Ok(entries)
    }

    /// One `\n`-terminated line off the data channel, or whatever remains
    /// when the channel closes. None once the listing is exhausted.
    fn read_data_line(&mut self, idle: &mut Deadline) -> Option<String> {
        let mut line = Vec::new();
        loop {
            match self.data.read_byte() {
                Some(b'\n') => break,
                Some(byte) => {
                    line.push(byte);
                    *idle = Deadline::after(self.config.timeout);
                }
                None => {
                    if !self.data.is_connected() || idle.expired() {
                        break;
                    }
                    idle.sleep(DATA_POLL_INTERVAL);
                }
            }
        }
        if line.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&line).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::error::FtpError;
    use crate::net::mock::ScriptedChannel;
    use std::time::Duration;

    const PASV_PREAMBLE: &[u8] = b"227 Entering Passive Mode (127,0,0,1,0,100)\r\n200 type set\r\n";

    fn quick_config() -> SessionConfig {
        SessionConfig::new("ftp.example.net", "alice", "secret").timeout(Duration::from_millis(40))
    }

    fn transfer_session(control_input: &[u8], data: ScriptedChannel) -> FtpSession<ScriptedChannel> {
        let mut control = ScriptedChannel::connected();
        control.push_input(PASV_PREAMBLE);
        control.push_input(control_input);
        let mut session = FtpSession::new(quick_config(), control, data);
        session.connected = true;
        session
    }

    #[test]
    fn upload_negotiates_sends_stor_and_stages_data() {
        let mut session = transfer_session(b"150 ok to send\r\n226 stored\r\n", ScriptedChannel::idle());

        session.begin_upload("up.txt", false).unwrap();
        session.write_bytes(b"file body").unwrap();
        let done = session.close_transfer().unwrap();

        assert!(done);
        assert_eq!(
            session.control.written_text(),
            "PASV\r\nTYPE I\r\nSTOR up.txt\r\n"
        );
        assert_eq!(session.data.written, b"file body");
    }

    #[test]
    fn append_uses_appe() {
        let mut session = transfer_session(b"150 ok\r\n", ScriptedChannel::idle());
        session.begin_upload("log.txt", true).unwrap();
        assert!(session.control.written_text().ends_with("APPE log.txt\r\n"));
    }

    #[test]
    fn write_bytes_stages_payloads_larger_than_the_buffer() {
        let mut session = transfer_session(b"150 ok\r\n", ScriptedChannel::idle());
        session.begin_upload("big.bin", false).unwrap();

        let payload: Vec<u8> = (0..4000u32).map(|i| (i % 251) as u8).collect();
        session.write_bytes(&payload).unwrap();
        assert_eq!(session.data.written, payload);
    }

    #[test]
    fn rejected_stor_closes_the_data_channel() {
        let mut session = transfer_session(b"550 denied\r\n", ScriptedChannel::idle());
        let err = session.begin_upload("up.txt", false).unwrap_err();
        assert!(matches!(err, FtpError::ServerRejected { code: 550, .. }));
        assert!(!session.data.connected);
    }

    #[test]
    fn streaming_download_delivers_chunks_and_counts_bytes() {
        let mut data = ScriptedChannel::idle();
        data.push_input(b"HELLO WORLD");
        data.close_remote();
        let mut session = transfer_session(b"150 opening\r\n226 done\r\n", data);

        let mut received = Vec::new();
        let total = session
            .download_streaming("greeting.txt", |name, chunk| {
                assert_eq!(name, "greeting.txt");
                received.extend_from_slice(chunk);
            })
            .unwrap();

        assert_eq!(received, b"HELLO WORLD");
        assert_eq!(total, 11);
        assert!(session.control.written_text().ends_with("RETR greeting.txt\r\n"));
    }

    #[test]
    fn download_to_buffer_fills_and_drains_the_overflow() {
        let mut data = ScriptedChannel::idle();
        data.push_input(b"HELLOWORLD");
        data.close_remote();
        let mut session = transfer_session(b"150 opening\r\n226 done\r\n", data);

        let mut buf = [0u8; 5];
        let stored = session.download_to_buffer("f.bin", &mut buf).unwrap();
        assert_eq!(stored, 5);
        assert_eq!(&buf, b"HELLO");
        // overflow was consumed off the channel, not left behind
        assert_eq!(session.data.available(), 0);
    }

    #[test]
    fn download_to_string_collects_text() {
        let mut data = ScriptedChannel::idle();
        data.push_input(b"line one\nline two\n");
        data.close_remote();
        let mut session = transfer_session(b"150 opening\r\n226 done\r\n", data);

        let text = session.download_to_string("notes.txt").unwrap();
        assert_eq!(text, "line one\nline two\n");
    }

    #[test]
    fn rejected_retr_closes_the_data_channel() {
        let mut session = transfer_session(b"550 no such file\r\n", ScriptedChannel::idle());
        let err = session.download_to_string("missing.txt").unwrap_err();
        assert!(matches!(err, FtpError::ServerRejected { code: 550, .. }));
        assert!(!session.data.connected);
    }

    #[test]
    fn list_with_facts_parses_each_line() {
        let mut data = ScriptedChannel::idle();
        data.push_input(b"type=dir;modify=20220514; docs\r\ntype=file;size=42; a.txt\r\n-rw-r--r-- 1 u g 7 Jan 1 00:00 b.txt\r\n");
        data.close_remote();
        let mut session = transfer_session(b"150 here it comes\r\n226 done\r\n", data);

        let entries = session.list_directory("/", ListMode::WithFacts, 16).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_directory);
        assert_eq!(entries[0].name, "docs");
        assert_eq!(entries[1].size, 42);
        assert_eq!(entries[2].name, "b.txt");
        assert!(session.control.written_text().contains("LIST /\r\n"));
    }

    #[test]
    fn standard_listing_returns_raw_lines_as_names() {
        let mut data = ScriptedChannel::idle();
        data.push_input(b"type=file;size=42; a.txt\r\n");
        data.close_remote();
        let mut session = transfer_session(b"150 listing\r\n226 done\r\n", data);

        let entries = session.list_directory("/", ListMode::Standard, 16).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "type=file;size=42; a.txt");
        assert!(!entries[0].is_directory);
        assert!(session.control.written_text().contains("MLSD /\r\n"));
    }

    #[test]
    fn listing_past_capacity_is_discarded_not_buffered() {
        let mut data = ScriptedChannel::idle();
        data.push_input(b"type=file;size=1; a\r\ntype=file;size=2; b\r\ntype=file;size=3; c\r\n");
        data.close_remote();
        let mut session = transfer_session(b"150 listing\r\n226 done\r\n", data);

        let entries = session.list_directory("/", ListMode::WithFacts, 1).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a");
        // the channel was drained all the way regardless
        assert_eq!(session.data.available(), 0);
    }

    fn bare_session(data: ScriptedChannel) -> FtpSession<ScriptedChannel> {
        let mut session = FtpSession::new(quick_config(), ScriptedChannel::connected(), data);
        session.connected = true;
        session
    }

    #[test]
    fn completion_detector_accepts_close_without_reply() {
        let mut session = bare_session(ScriptedChannel::idle());
        assert!(session.wait_transfer_complete(Deadline::after(Duration::from_millis(30))));
    }

    #[test]
    fn completion_detector_accepts_reply_while_data_stays_open() {
        let mut session = bare_session(ScriptedChannel::connected());
        session.control.push_input(b"226 transfer complete\r\n");
        assert!(session.wait_transfer_complete(Deadline::after(Duration::from_millis(30))));
    }

    #[test]
    fn completion_detector_consumes_both_signals_in_either_order() {
        let mut session = bare_session(ScriptedChannel::idle());
        session.control.push_input(b"226 transfer complete\r\n");
        assert!(session.wait_transfer_complete(Deadline::after(Duration::from_millis(30))));
        // the 226 was consumed; the control channel is clean for the next command
        assert_eq!(session.control.available(), 0);
    }

    #[test]
    fn completion_detector_times_out_with_neither_signal() {
        let mut session = bare_session(ScriptedChannel::connected());
        assert!(!session.wait_transfer_complete(Deadline::after(Duration::from_millis(30))));
    }

    #[test]
    fn write_bytes_on_down_session_is_refused() {
        let mut session = bare_session(ScriptedChannel::idle());
        session.connected = false;
        assert!(matches!(session.write_bytes(b"x").unwrap_err(), FtpError::NotConnected));
    }
}
