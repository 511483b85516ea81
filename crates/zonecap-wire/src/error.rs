use thiserror::Error;

/// Decode-fatal outcomes per §7: any of these abandons the whole capture, never just the packet.
#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum DecodeError {
    #[error("packet body too short: needed {needed} more byte(s), {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("packet body has {remaining} unconsumed trailing byte(s)")]
    TrailingBytes { remaining: usize },

    #[error("unknown opcode {0:#06x}")]
    UnknownOpcode(u16),

    #[error("{opcode:?} body length {actual} does not match the wire format (expected {expected})")]
    BadLength {
        opcode: &'static str,
        expected: String,
        actual: usize,
    },

    #[error("choice count {0} would overflow the prompt body size")]
    BadChoiceCount(i32),

    #[error("io error reading capture frame: {0}")]
    Io(String),
}

impl From<std::io::Error> for DecodeError {
    fn from(e: std::io::Error) -> Self {
        DecodeError::Io(e.to_string())
    }
}
