//! Incremental frame decoder and pure frame encoder.
//!
//! The decoder owns a single residual byte buffer that it consumes and
//! repacks as it is fed arbitrary byte chunks from the transport; it has no
//! opinion about where those chunks come from.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::FrameError;
use crate::frame::{AnsFrame, DataFrame, Frame, SeqFrame};
use crate::limits::{check_u31, check_u32};

const TRAILER: &[u8] = b"END\r\n";

/// Buffers partial frames until enough bytes have arrived to decode one.
///
/// `feed` appends bytes as they arrive from the transport; `decode_next`
/// attempts to pull one complete frame out of the buffer, returning `Ok(None)`
/// ("need more bytes", non-fatal) rather than blocking. Call `decode_next` in
/// a loop after each `feed` until it returns `Ok(None)`.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self { buf: BytesMut::new() }
    }

    /// Appends newly-read transport bytes to the residual buffer.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of bytes currently buffered (for diagnostics/tests).
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Attempts to decode one frame from the buffered bytes.
    ///
    /// Returns `Ok(None)` if the header is incomplete or the payload/trailer
    /// haven't fully arrived yet ("NeedMore"); the buffer is left untouched in
    /// that case so the next `feed` can extend it. Returns `Err` for any
    /// well-formedness violation, which is fatal for the owning session.
    pub fn decode_next(&mut self) -> Result<Option<Frame>, FrameError> {
        let header_end = match find_crlf(&self.buf) {
            Some(pos) => pos,
            None => return Ok(None),
        };

        let header_str = std::str::from_utf8(&self.buf[..header_end])
            .map_err(|_| FrameError::MalformedHeader("header is not valid UTF-8".to_string()))?;
        let tokens: Vec<&str> = header_str.split_ascii_whitespace().collect();
        if tokens.is_empty() {
            return Err(FrameError::MalformedHeader("empty header line".to_string()));
        }

        let header_len = header_end + 2; // include CRLF

        match tokens[0] {
            "SEQ" => self.decode_seq(&tokens, header_len),
            "MSG" | "RPY" | "ERR" | "NUL" => self.decode_data(&tokens, header_len, tokens[0]),
            "ANS" => self.decode_ans(&tokens, header_len),
            other => Err(FrameError::MalformedHeader(format!("unknown frame keyword {other:?}"))),
        }
    }

    fn decode_seq(&mut self, tokens: &[&str], header_len: usize) -> Result<Option<Frame>, FrameError> {
        if tokens.len() != 4 {
            return Err(FrameError::MalformedHeader(
                "SEQ header requires channel, acknowledgement and window fields".to_string(),
            ));
        }
        let channel = parse_u31(tokens[1], "channel")?;
        let acknowledgement = parse_u32(tokens[2], "acknowledgement")?;
        let window = parse_u32(tokens[3], "window")?;

        // SEQ carries no payload and no END trailer (RFC 3081 §2); header+CRLF is the whole frame.
        if self.buf.len() < header_len {
            return Ok(None);
        }
        self.buf.advance(header_len);
        Ok(Some(Frame::Seq(SeqFrame { channel, acknowledgement, window })))
    }

    fn decode_data(
        &mut self,
        tokens: &[&str],
        header_len: usize,
        keyword: &str,
    ) -> Result<Option<Frame>, FrameError> {
        if tokens.len() != 6 {
            return Err(FrameError::MalformedHeader(format!(
                "{keyword} header requires channel, msgno, more, seqno and size fields"
            )));
        }
        let channel = parse_u31(tokens[1], "channel")?;
        let message = parse_u31(tokens[2], "msgno")?;
        let more = parse_more(tokens[3])?;
        let sequence = parse_u32(tokens[4], "seqno")?;
        let size = parse_u31(tokens[5], "size")?;

        let payload = match self.take_payload(header_len, size)? {
            Some(p) => p,
            None => return Ok(None),
        };

        let data = DataFrame { channel, message, more, sequence, payload };
        let frame = match keyword {
            "MSG" => Frame::Msg(data),
            "RPY" => Frame::Rpy(data),
            "ERR" => Frame::Err(data),
            "NUL" => Frame::Nul(data),
            _ => unreachable!("decode_data only called for MSG/RPY/ERR/NUL"),
        };
        Ok(Some(frame))
    }

    fn decode_ans(&mut self, tokens: &[&str], header_len: usize) -> Result<Option<Frame>, FrameError> {
        if tokens.len() != 7 {
            return Err(FrameError::MalformedHeader(
                "ANS header requires channel, msgno, more, seqno, size and ansno fields".to_string(),
            ));
        }
        let channel = parse_u31(tokens[1], "channel")?;
        let message = parse_u31(tokens[2], "msgno")?;
        let more = parse_more(tokens[3])?;
        let sequence = parse_u32(tokens[4], "seqno")?;
        let size = parse_u31(tokens[5], "size")?;
        let answer = parse_u32(tokens[6], "ansno")?;

        let payload = match self.take_payload(header_len, size)? {
            Some(p) => p,
            None => return Ok(None),
        };

        Ok(Some(Frame::Ans(AnsFrame { channel, message, more, sequence, answer, payload })))
    }

    /// Slices out the payload and validates/consumes the trailer, or reports
    /// `NeedMore` if the bytes haven't fully arrived.
    fn take_payload(&mut self, header_len: usize, size: u32) -> Result<Option<Bytes>, FrameError> {
        let size = size as usize;
        let needed = header_len + size + TRAILER.len();
        if self.buf.len() < needed {
            return Ok(None);
        }
        if &self.buf[header_len + size..needed] != TRAILER {
            return Err(FrameError::MissingTrailer);
        }
        let payload = Bytes::copy_from_slice(&self.buf[header_len..header_len + size]);
        self.buf.advance(needed);
        Ok(Some(payload))
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

fn parse_u31(token: &str, field: &'static str) -> Result<u32, FrameError> {
    let value: u64 = token
        .parse()
        .map_err(|_| FrameError::OutOfRange { field, value: token.to_string() })?;
    check_u31(value).ok_or_else(|| FrameError::OutOfRange { field, value: token.to_string() })
}

fn parse_u32(token: &str, field: &'static str) -> Result<u32, FrameError> {
    let value: u64 = token
        .parse()
        .map_err(|_| FrameError::OutOfRange { field, value: token.to_string() })?;
    check_u32(value).ok_or_else(|| FrameError::OutOfRange { field, value: token.to_string() })
}

fn parse_more(token: &str) -> Result<bool, FrameError> {
    match token {
        "*" => Ok(true),
        "." => Ok(false),
        other => Err(FrameError::InvalidContinuationSymbol(other.to_string())),
    }
}

/// Encodes a frame to its exact wire representation.
///
/// This is a free function rather than a trait method so call sites read
/// naturally as `encode_frame(&frame)`; it performs no validation (see
/// [`Frame`] docs) and never fails — construction is where a caller must
/// already have validated field ranges, so emission stays pure.
pub fn encode_frame(frame: &Frame) -> Bytes {
    let mut out = BytesMut::new();
    match frame {
        Frame::Msg(d) | Frame::Rpy(d) | Frame::Err(d) | Frame::Nul(d) => {
            encode_data_header(&mut out, frame.keyword(), d);
            out.extend_from_slice(&d.payload);
            out.extend_from_slice(TRAILER);
        }
        Frame::Ans(a) => {
            out.extend_from_slice(
                format!(
                    "ANS {} {} {} {} {} {}\r\n",
                    a.channel,
                    a.message,
                    more_symbol(a.more),
                    a.sequence,
                    a.payload.len(),
                    a.answer
                )
                .as_bytes(),
            );
            out.extend_from_slice(&a.payload);
            out.extend_from_slice(TRAILER);
        }
        Frame::Seq(s) => {
            out.extend_from_slice(format!("SEQ {} {} {}\r\n", s.channel, s.acknowledgement, s.window).as_bytes());
        }
    }
    out.freeze()
}

fn encode_data_header(out: &mut BytesMut, keyword: &str, d: &DataFrame) {
    out.extend_from_slice(
        format!(
            "{} {} {} {} {} {}\r\n",
            keyword,
            d.channel,
            d.message,
            more_symbol(d.more),
            d.sequence,
            d.payload.len()
        )
        .as_bytes(),
    );
}

fn more_symbol(more: bool) -> char {
    if more { '*' } else { '.' }
}
