use std::fmt;

/// Everything that can go wrong turning channel-zero payload bytes into a
/// [`crate::CmpNode`]. Both variants are fatal at the session level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmpError {
    /// The outermost element was not one of the six recognized tags.
    UnknownElement(String),
    /// The payload was not well-formed enough to tokenize: unterminated tag,
    /// unterminated attribute value, mismatched end tag, missing required
    /// attribute, or a value that failed to parse as its declared type.
    Syntax(String),
}

impl fmt::Display for CmpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CmpError::UnknownElement(tag) => write!(f, "unrecognized channel management element: {tag:?}"),
            CmpError::Syntax(detail) => write!(f, "channel management XML syntax error: {detail}"),
        }
    }
}

impl std::error::Error for CmpError {}
