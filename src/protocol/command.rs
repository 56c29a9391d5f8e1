//! Outbound commands for the `RadioRA` integration protocol.
//!
//! Commands are single text lines. `#` sets, `?` queries:
//! ```text
//! #OUTPUT,<id>,1,<level>[,<fade>[,<delay>]]
//! ?OUTPUT,<id>
//! ```

use std::fmt::Write as _;

use crate::protocol::line::LINE_TERMINATOR;
use crate::types::{OutputId, SetLevel};

/// Output action number for "level".
pub const ACTION_LEVEL: u32 = 1;

/// Commands understood by the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputCommand {
    /// Set an output level.
    SetLevel { id: OutputId, params: SetLevel },
    /// Ask for the current output level.
    QueryLevel { id: OutputId },
}

impl OutputCommand {
    /// Encodes the command as a terminated wire line.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut line = match self {
            Self::SetLevel { id, params } => {
                let mut line = format!("#OUTPUT,{id},{ACTION_LEVEL},{}", params.level);
                if let Some(fade) = params.fade {
                    let _ = write!(line, ",{fade}");
                    if let Some(delay) = params.delay {
                        let _ = write!(line, ",{delay}");
                    }
                }
                line
            }
            Self::QueryLevel { id } => format!("?OUTPUT,{id}"),
        };
        line.push_str(LINE_TERMINATOR);
        line
    }
}

/// Makes a raw command end with exactly one line terminator.
#[must_use]
pub fn normalize_line(text: &str) -> String {
    let mut line = text.trim_end_matches(['\r', '\n']).to_owned();
    line.push_str(LINE_TERMINATOR);
    line
}
