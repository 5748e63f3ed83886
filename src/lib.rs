//! Client-side FTP protocol engine.
//!
//! Drives the FTP command/reply exchange over a caller-supplied byte-stream
//! transport: login, directory operations, passive-mode data-channel
//! negotiation (tolerating both 227 payload encodings found in the wild),
//! buffered uploads/downloads with racing completion detection, and
//! directory-listing parsing (MLSx facts plus the classic `ls -l` heuristic).
//!
//! The engine is synchronous and single-threaded by design: each operation
//! blocks its caller up to the configured timeout, and a session exclusively
//! owns its two channels. Transport concerns beyond the byte stream -- TLS,
//! DNS policy, active mode, credential storage -- stay with the host
//! application.
//!
//! ```no_run
//! use ftpwire::{FtpSession, ListMode, SessionConfig, TcpChannel};
//!
//! fn main() -> ftpwire::Result<()> {
//!     let config = SessionConfig::new("ftp.example.net", "demo", "password");
//!     let mut session = FtpSession::new(config, TcpChannel::new(), TcpChannel::new());
//!     session.open()?;
//!
//!     session.change_directory("/pub")?;
//!     for entry in session.list_directory(".", ListMode::WithFacts, 64)? {
//!         println!("{} {}", if entry.is_directory { "d" } else { "-" }, entry.name);
//!     }
//!
//!     session.begin_upload("hello.txt", false)?;
//!     session.write_text("hello over ftp\n")?;
//!     session.close_transfer()?;
//!
//!     session.close();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod net;
pub mod protocol;
pub mod session;

pub use config::{SessionConfig, TransferMode};
pub use error::{FtpError, Result};
pub use net::{Channel, TcpChannel};
pub use protocol::listing::{ListEntry, ListMode};
pub use protocol::reply::Reply;
pub use session::FtpSession;
