//! Protocol definitions for `RadioRA` communication.
//!
//! This module contains the low-level protocol types including:
//! - Line framing
//! - The login handshake
//! - Command encoding
//! - Status line parsing

pub mod command;
pub mod line;
pub mod login;
pub mod parser;

pub use command::{OutputCommand, normalize_line};
pub use line::{LINE_TERMINATOR, LineDecoder, MAX_LINE_LEN};
pub use login::{LoginState, LoginStep};
pub use parser::parse_status;
