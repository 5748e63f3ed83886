//! FTP reply codes (RFC 959), the subset this engine cares about.
//!
//! The engine classifies mostly by range -- [100,399] is success, 4xx/5xx is
//! rejection -- so only the codes it matches literally plus the ones scripted
//! servers commonly emit are named here.

pub const OPENING_DATA_CONNECTION: u16 = 150;

pub const COMMAND_OK: u16 = 200;
pub const FILE_STATUS: u16 = 213;
pub const SERVICE_READY: u16 = 220;
pub const SERVICE_CLOSING: u16 = 221;
pub const TRANSFER_COMPLETE: u16 = 226;
pub const ENTERING_PASSIVE_MODE: u16 = 227;
pub const LOGGED_IN: u16 = 230;
pub const FILE_ACTION_OK: u16 = 250;
pub const PATH_CREATED: u16 = 257;

pub const NEED_PASSWORD: u16 = 331;
pub const FILE_ACTION_PENDING: u16 = 350;

pub const SERVICE_NOT_AVAILABLE: u16 = 421;
pub const CANNOT_OPEN_DATA_CONNECTION: u16 = 425;

pub const NOT_LOGGED_IN: u16 = 530;
pub const FILE_NOT_AVAILABLE: u16 = 550;
