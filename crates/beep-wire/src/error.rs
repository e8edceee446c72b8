use std::fmt;

/// Everything that can go wrong parsing or validating one frame.
///
/// All variants are fatal at the session level: a frame that fails to decode
/// tears down the session rather than being recovered from in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The header line could not be split into the expected keyword/fields,
    /// or the keyword was not one of MSG/RPY/ANS/ERR/NUL/SEQ.
    MalformedHeader(String),
    /// The `more` field was neither `*` nor `.`.
    InvalidContinuationSymbol(String),
    /// A numeric field parsed but fell outside its wire range.
    OutOfRange {
        /// Name of the offending field, e.g. `"channel"`, `"size"`.
        field: &'static str,
        /// The raw text that failed to validate.
        value: String,
    },
    /// The payload was not followed by the literal `END\r\n` trailer.
    MissingTrailer,
    /// The declared `size` did not match the number of payload octets available
    /// once the full frame could be delimited (reserved for decoders that
    /// validate against an independently-known length; the streaming decoder
    /// in this crate cannot observe this case directly, but encoders that are
    /// handed a pre-built header and a mismatched payload return it).
    SizeMismatch { declared: u32, actual: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::MalformedHeader(detail) => write!(f, "malformed frame header: {detail}"),
            FrameError::InvalidContinuationSymbol(sym) => {
                write!(f, "invalid continuation symbol: {sym:?} (expected '*' or '.')")
            }
            FrameError::OutOfRange { field, value } => {
                write!(f, "field {field} out of range: {value:?}")
            }
            FrameError::MissingTrailer => write!(f, "frame payload not followed by END\\r\\n trailer"),
            FrameError::SizeMismatch { declared, actual } => write!(
                f,
                "declared payload size {declared} does not match actual length {actual}"
            ),
        }
    }
}

impl std::error::Error for FrameError {}
