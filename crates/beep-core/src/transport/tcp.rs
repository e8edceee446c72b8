use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use super::{Transport, TransportError};

const READ_CHUNK: usize = 4096;

/// Wraps a `tokio::net::TcpStream` behind the [`Transport`] trait.
///
/// A buffered wrapper over the socket (a `BytesMut` read buffer, plus a
/// double-buffered write discipline): outgoing bytes land in a background
/// accumulation buffer; whichever caller finds it empty becomes the drainer
/// and swaps it out for a foreground buffer to write, looping until the
/// background is empty again. This lets several concurrent `write_all` calls
/// queue onto one socket without interleaving a torn write.
pub struct TcpTransport {
    read_half: RefCell<OwnedReadHalf>,
    read_buf: RefCell<BytesMut>,
    write_half: RefCell<OwnedWriteHalf>,
    background: RefCell<BytesMut>,
    draining: Cell<bool>,
    closed: Cell<bool>,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Rc<Self> {
        let _ = stream.set_nodelay(true);
        let (read_half, write_half) = stream.into_split();
        Rc::new(Self {
            read_half: RefCell::new(read_half),
            read_buf: RefCell::new(BytesMut::with_capacity(READ_CHUNK)),
            write_half: RefCell::new(write_half),
            background: RefCell::new(BytesMut::new()),
            draining: Cell::new(false),
            closed: Cell::new(false),
        })
    }

    pub async fn connect(addr: impl tokio::net::ToSocketAddrs) -> std::io::Result<Rc<Self>> {
        Ok(Self::new(TcpStream::connect(addr).await?))
    }
}

impl Transport for TcpTransport {
    async fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if self.closed.get() {
            return Err(TransportError::Closed);
        }
        {
            let mut residual = self.read_buf.borrow_mut();
            if !residual.is_empty() {
                let n = residual.len().min(buf.len());
                buf[..n].copy_from_slice(&residual[..n]);
                let remainder = residual.split_off(n);
                *residual = remainder;
                return Ok(n);
            }
        }
        let n = self.read_half.borrow_mut().read(buf).await?;
        if n == 0 {
            self.closed.set(true);
            return Err(TransportError::Closed);
        }
        Ok(n)
    }

    async fn write_all(&self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.closed.get() {
            return Err(TransportError::Closed);
        }
        self.background.borrow_mut().extend_from_slice(bytes);
        if self.draining.replace(true) {
            // Another in-flight write_all owns the drain loop below and will
            // flush the bytes we just appended before it finishes.
            return Ok(());
        }
        loop {
            let chunk = {
                let mut bg = self.background.borrow_mut();
                if bg.is_empty() {
                    break;
                }
                std::mem::take(&mut *bg).freeze()
            };
            if let Err(e) = self.write_half.borrow_mut().write_all(&chunk).await {
                self.closed.set(true);
                self.draining.set(false);
                return Err(TransportError::Io(e));
            }
        }
        self.draining.set(false);
        Ok(())
    }

    fn close(&self) {
        self.closed.set(true);
    }

    fn is_closed(&self) -> bool {
        self.closed.get()
    }
}
