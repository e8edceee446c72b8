use std::fmt;

use beep_cmp::CmpError;
use beep_message::MessageError;
use beep_wire::FrameError;

use crate::reply_code::ReplyCode;
use crate::transport::TransportError;

/// A non-fatal protocol violation: something the peer asked for that this
/// core declines, expressed as the BEEP reply code and diagnostic text that
/// go out in the answering `error` CMP element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError {
    pub code: ReplyCode,
    pub diagnostic: String,
}

impl ProtocolError {
    pub fn new(code: ReplyCode, diagnostic: impl Into<String>) -> Self {
        Self { code, diagnostic: diagnostic.into() }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "protocol error {}: {}", self.code, self.diagnostic)
    }
}

impl std::error::Error for ProtocolError {}

/// Local-side rejection of `async_add_channel` before anything touches the
/// wire: the requested profile was never installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProfile(pub String);

impl fmt::Display for UnknownProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no local handler installed for profile {:?}", self.0)
    }
}

impl std::error::Error for UnknownProfile {}

/// The top-level error type for a session. Everything that is not a
/// [`ProtocolError`] is fatal: it tears the session down.
#[derive(Debug)]
pub enum SessionError {
    Frame(FrameError),
    Cmp(CmpError),
    Message(MessageError),
    Io(std::io::Error),
    /// Surfaced to a single pending callback; never tears down the session.
    Protocol(ProtocolError),
    /// The transport reported `Closed` with no underlying I/O error.
    TransportClosed,
}

impl SessionError {
    /// Whether this error disconnects the session: wire/transport errors
    /// are fatal, protocol errors are not.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SessionError::Protocol(_))
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Frame(e) => write!(f, "frame error: {e}"),
            SessionError::Cmp(e) => write!(f, "channel management XML error: {e}"),
            SessionError::Message(e) => write!(f, "message assembly error: {e}"),
            SessionError::Io(e) => write!(f, "transport I/O error: {e}"),
            SessionError::Protocol(e) => write!(f, "{e}"),
            SessionError::TransportClosed => write!(f, "transport closed"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Frame(e) => Some(e),
            SessionError::Cmp(e) => Some(e),
            SessionError::Message(e) => Some(e),
            SessionError::Io(e) => Some(e),
            SessionError::Protocol(e) => Some(e),
            SessionError::TransportClosed => None,
        }
    }
}

impl From<FrameError> for SessionError {
    fn from(e: FrameError) -> Self {
        SessionError::Frame(e)
    }
}

impl From<CmpError> for SessionError {
    fn from(e: CmpError) -> Self {
        SessionError::Cmp(e)
    }
}

impl From<MessageError> for SessionError {
    fn from(e: MessageError) -> Self {
        SessionError::Message(e)
    }
}

impl From<std::io::Error> for SessionError {
    fn from(e: std::io::Error) -> Self {
        SessionError::Io(e)
    }
}

impl From<ProtocolError> for SessionError {
    fn from(e: ProtocolError) -> Self {
        SessionError::Protocol(e)
    }
}

impl From<TransportError> for SessionError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Closed => SessionError::TransportClosed,
            TransportError::Io(e) => SessionError::Io(e),
        }
    }
}
