use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bytes::{Buf, Bytes, BytesMut};
use tokio::sync::mpsc;

use super::{Transport, TransportError};

const CHANNEL_CAPACITY: usize = 64;

/// An in-process transport backed by a paired `tokio::sync::mpsc` channel.
///
/// A send/recv channel pair wrapping a shared inner struct, `Rc`+`RefCell`
/// (`!Send`) rather than `Arc`+`Mutex`, carrying raw bytes with a residual
/// buffer rather than whole typed frames, since BEEP is a byte-stream
/// protocol.
#[derive(Clone)]
pub struct MemTransport {
    inner: Rc<Inner>,
}

struct Inner {
    tx: mpsc::UnboundedSender<Bytes>,
    rx: RefCell<mpsc::UnboundedReceiver<Bytes>>,
    residual: RefCell<BytesMut>,
    closed: Cell<bool>,
}

impl MemTransport {
    /// Builds a connected pair: bytes written to one side are read from the other.
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();
        let a = Self {
            inner: Rc::new(Inner { tx: tx_b, rx: RefCell::new(rx_a), residual: RefCell::new(BytesMut::new()), closed: Cell::new(false) }),
        };
        let b = Self {
            inner: Rc::new(Inner { tx: tx_a, rx: RefCell::new(rx_b), residual: RefCell::new(BytesMut::new()), closed: Cell::new(false) }),
        };
        (a, b)
    }
}

impl Transport for MemTransport {
    async fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if self.inner.closed.get() {
            return Err(TransportError::Closed);
        }
        loop {
            {
                let mut residual = self.inner.residual.borrow_mut();
                if !residual.is_empty() {
                    let n = residual.len().min(buf.len());
                    buf[..n].copy_from_slice(&residual[..n]);
                    residual.advance(n);
                    return Ok(n);
                }
            }
            let next = { self.inner.rx.borrow_mut().recv().await };
            match next {
                Some(chunk) => self.inner.residual.borrow_mut().extend_from_slice(&chunk),
                None => return Err(TransportError::Closed),
            }
        }
    }

    async fn write_all(&self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.inner.closed.get() {
            return Err(TransportError::Closed);
        }
        self.inner.tx.send(Bytes::copy_from_slice(bytes)).map_err(|_| TransportError::Closed)
    }

    fn close(&self) {
        self.inner.closed.set(true);
    }

    fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }
}
