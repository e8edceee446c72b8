//! The byte-stream transport collaborator.
//!
//! Sessions are `!Send`: transports are handed around as `Rc`, not `Arc`,
//! and never need to cross an executor thread.

pub mod mem;
pub mod tcp;

use std::fmt;
use std::rc::Rc;

/// Everything a transport can fail with.
#[derive(Debug)]
pub enum TransportError {
    /// The peer end went away or `close()` was called locally.
    Closed,
    Io(std::io::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Closed => write!(f, "transport closed"),
            TransportError::Io(e) => write!(f, "transport I/O error: {e}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Closed => None,
            TransportError::Io(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e)
    }
}

/// A duplex byte stream: `read`, `write_all`, and `close`. No endian
/// conversion is required since BEEP is decimal ASCII on the wire.
pub trait Transport {
    /// Reads at least one byte into `buf`, returning the number of bytes
    /// read. Returns `Err(TransportError::Closed)` at end of stream.
    async fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Writes the entirety of `bytes`, blocking only on transport
    /// backpressure.
    async fn write_all(&self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Initiates shutdown; subsequent reads/writes fail with `Closed`.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// Lets an `Rc`-wrapped transport (as `TcpTransport::new`/`connect` hand back)
/// stand in directly wherever `T: Transport` is required.
impl<T: Transport + ?Sized> Transport for Rc<T> {
    async fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        (**self).read(buf).await
    }

    async fn write_all(&self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write_all(bytes).await
    }

    fn close(&self) {
        (**self).close()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}
