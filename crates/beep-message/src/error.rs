use std::fmt;

/// Everything that can go wrong assembling frames into messages. Fatal at the
/// session level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    /// A `NUL` frame (or other frame kind with no business continuing) arrived with `more = true`.
    UnexpectedContinuation { channel: u32, message: u32 },
    /// The frame's (channel, msgno, frame-type[, ansno]) key conflicted with an
    /// in-progress assembly in a way that can't be resolved by appending.
    FramingError { channel: u32, message: u32, detail: String },
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::UnexpectedContinuation { channel, message } => write!(
                f,
                "frame on channel {channel} msgno {message} set more=true where none is permitted"
            ),
            MessageError::FramingError { channel, message, detail } => {
                write!(f, "framing error on channel {channel} msgno {message}: {detail}")
            }
        }
    }
}

impl std::error::Error for MessageError {}
