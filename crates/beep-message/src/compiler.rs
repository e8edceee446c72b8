use std::collections::HashMap;

use beep_wire::{AnsFrame, DataFrame, Frame};
use bytes::{Bytes, BytesMut};

use crate::error::MessageError;
use crate::message::{FrameKind, Message, Mime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct AssemblyKey {
    channel: u32,
    message: u32,
    kind: FrameKind,
    /// Meaningless (and always 0) outside `FrameKind::Ans`, where it
    /// distinguishes interleaved answer streams sharing one msgno.
    answer: u32,
}

/// Aggregates frames into messages, and splits outgoing messages into
/// frames.
///
/// One compiler instance serves a whole session: assembly state for every
/// channel and message-type is multiplexed through the same `pending` map,
/// keyed so that concurrent in-flight messages on different channels (or
/// different ANS streams on the same channel) never collide.
#[derive(Debug, Default)]
pub struct MessageCompiler {
    pending: HashMap<AssemblyKey, BytesMut>,
    /// Which frame-type is mid-assembly for a given (channel, msgno), tracked
    /// separately from `pending` so a frame whose type contradicts the one
    /// already in progress is rejected even before the first complete
    /// message on that key exists. `ANS` is exempt: several answer streams
    /// legitimately interleave under one msgno (distinguished by `ansno`),
    /// so there is no single "the" in-progress type to contradict.
    active_kind: HashMap<(u32, u32), FrameKind>,
    max_frame_payload: Option<usize>,
}

impl MessageCompiler {
    pub fn new() -> Self {
        Self { pending: HashMap::new(), active_kind: HashMap::new(), max_frame_payload: None }
    }

    /// Opt-in outgoing segmentation: one frame per message by default. Call
    /// this to cap frame payload size instead.
    pub fn with_max_frame_payload(max_frame_payload: usize) -> Self {
        Self { pending: HashMap::new(), active_kind: HashMap::new(), max_frame_payload: Some(max_frame_payload) }
    }

    /// Feeds one inbound frame into the assembler.
    ///
    /// Returns `Ok(Some(message))` once a complete message has been
    /// assembled, `Ok(None)` if this frame only extended an in-progress
    /// assembly, and `Err` for a frame that cannot be reconciled with
    /// protocol rules. `SEQ` frames carry no message content and are
    /// accepted as a no-op (`Ok(None)`) so callers can pass the whole inbound
    /// frame stream through without pre-filtering.
    pub fn push_frame(&mut self, frame: Frame) -> Result<Option<Message>, MessageError> {
        let (channel, message, kind, answer, more, payload) = match frame {
            Frame::Msg(d) => data_fields(d, FrameKind::Msg),
            Frame::Rpy(d) => data_fields(d, FrameKind::Rpy),
            Frame::Err(d) => data_fields(d, FrameKind::Err),
            Frame::Nul(d) => data_fields(d, FrameKind::Nul),
            Frame::Ans(a) => ans_fields(a),
            Frame::Seq(_) => return Ok(None),
        };

        if kind == FrameKind::Nul && more {
            return Err(MessageError::UnexpectedContinuation { channel, message });
        }

        if kind != FrameKind::Ans {
            let track = (channel, message);
            if let Some(existing) = self.active_kind.get(&track) {
                if *existing != kind {
                    return Err(MessageError::FramingError {
                        channel,
                        message,
                        detail: format!("{} frame arrived while a {} assembly was in progress", kind.keyword(), existing.keyword()),
                    });
                }
            }
            if more {
                self.active_kind.insert(track, kind);
            } else {
                self.active_kind.remove(&track);
            }
        }

        let key = AssemblyKey { channel, message, kind, answer };

        if more {
            self.pending.entry(key).or_default().extend_from_slice(&payload);
            return Ok(None);
        }

        let full = match self.pending.remove(&key) {
            Some(mut buffered) => {
                buffered.extend_from_slice(&payload);
                buffered.freeze()
            }
            None => payload,
        };

        let (mime, content) = parse_entity(&full);
        let mut msg = Message::new(channel, message, kind, mime, content);
        if kind == FrameKind::Ans {
            msg.answer = Some(answer);
        }
        Ok(Some(msg))
    }

    /// Splits an outgoing message into one or more frames, stamping each with
    /// a running sequence number starting at `start_seq`.
    ///
    /// `start_seq` must already account for the rendered entity (see
    /// [`rendered_len`]), since that is the octet count actually placed on
    /// the wire and the basis for the next sequence number.
    ///
    /// `answer` must be `Some` iff `kind == FrameKind::Ans`.
    pub fn split_outgoing(
        &self,
        channel: u32,
        message: u32,
        kind: FrameKind,
        answer: Option<u32>,
        start_seq: u32,
        mime: &Mime,
        content: &[u8],
    ) -> Vec<Frame> {
        let body = render_entity(mime, content);
        chunk_payload(&body, self.max_frame_payload)
            .into_iter()
            .scan(start_seq, |seq, (more, chunk)| {
                let sequence = *seq;
                *seq = seq.wrapping_add(chunk.len() as u32);
                Some(build_frame(kind, channel, message, answer, more, sequence, chunk))
            })
            .collect()
    }
}

fn data_fields(d: DataFrame, kind: FrameKind) -> (u32, u32, FrameKind, u32, bool, Bytes) {
    (d.channel, d.message, kind, 0, d.more, d.payload)
}

fn ans_fields(a: AnsFrame) -> (u32, u32, FrameKind, u32, bool, Bytes) {
    (a.channel, a.message, FrameKind::Ans, a.answer, a.more, a.payload)
}

fn build_frame(kind: FrameKind, channel: u32, message: u32, answer: Option<u32>, more: bool, sequence: u32, payload: Bytes) -> Frame {
    match kind {
        FrameKind::Msg => Frame::Msg(DataFrame { channel, message, more, sequence, payload }),
        FrameKind::Rpy => Frame::Rpy(DataFrame { channel, message, more, sequence, payload }),
        FrameKind::Err => Frame::Err(DataFrame { channel, message, more, sequence, payload }),
        FrameKind::Nul => Frame::Nul(DataFrame { channel, message, more, sequence, payload }),
        FrameKind::Ans => Frame::Ans(AnsFrame {
            channel,
            message,
            more,
            sequence,
            answer: answer.expect("ANS frame requires an answer number"),
            payload,
        }),
    }
}

/// Splits `body` into `(more, chunk)` pairs. With `max` unset, emits the
/// whole body as a single non-continued chunk (even if empty).
fn chunk_payload(body: &Bytes, max: Option<usize>) -> Vec<(bool, Bytes)> {
    let chunk_size = max.unwrap_or(body.len()).max(1);
    if body.is_empty() {
        return vec![(false, Bytes::new())];
    }
    let mut out = Vec::new();
    let mut offset = 0;
    while offset < body.len() {
        let end = (offset + chunk_size).min(body.len());
        let more = end < body.len();
        out.push((more, body.slice(offset..end)));
        offset = end;
    }
    out
}

/// Octets the entity header would add ahead of the content, or `0` for the
/// default `application/octet-stream` type, which is sent bare (RFC 3080
/// §2.2.1.1: a message with no recognizable entity header defaults to it on
/// the receiving side, so the sender omits it rather than spend the octets).
fn entity_header_len(mime: &Mime) -> usize {
    if *mime == Mime::octet_stream() {
        0
    } else {
        b"Content-Type: ".len() + mime.content_type.len() + b"\r\n\r\n".len()
    }
}

/// Total octets `render_entity` will place on the wire for `content_len`
/// bytes of `mime`-typed content. Callers that need to reserve a sequence
/// number range before the content is actually rendered (outgoing `MSG`/`RPY`
/// sends) use this instead of the content's own length.
pub fn rendered_len(mime: &Mime, content_len: usize) -> usize {
    entity_header_len(mime) + content_len
}

fn render_entity(mime: &Mime, content: &[u8]) -> Bytes {
    let header_len = entity_header_len(mime);
    if header_len == 0 {
        return Bytes::copy_from_slice(content);
    }
    let mut buf = BytesMut::with_capacity(content.len() + header_len);
    buf.extend_from_slice(b"Content-Type: ");
    buf.extend_from_slice(mime.content_type.as_bytes());
    buf.extend_from_slice(b"\r\n\r\n");
    buf.extend_from_slice(content);
    buf.freeze()
}

/// Splits a message body into (MIME, content); falls back to
/// `application/octet-stream` if no entity header prefix is recognized.
fn parse_entity(body: &Bytes) -> (Mime, Bytes) {
    const SEPARATOR: &[u8] = b"\r\n\r\n";
    const PREFIX: &[u8] = b"Content-Type:";

    if let Some(pos) = find_subslice(body, SEPARATOR) {
        let header = &body[..pos];
        if header.len() >= PREFIX.len() && header[..PREFIX.len()].eq_ignore_ascii_case(PREFIX) {
            let content_type = String::from_utf8_lossy(&header[PREFIX.len()..]).trim().to_string();
            return (Mime::new(content_type), body.slice(pos + SEPARATOR.len()..));
        }
    }
    (Mime::octet_stream(), body.clone())
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_250_octets_at_size_100() {
        let content = vec![b'x'; 250];
        let chunks = chunk_payload(&Bytes::from(content), Some(100));
        let lens: Vec<usize> = chunks.iter().map(|(_, c)| c.len()).collect();
        let mores: Vec<bool> = chunks.iter().map(|(more, _)| *more).collect();
        assert_eq!(lens, vec![100, 100, 50]);
        assert_eq!(mores, vec![true, true, false]);
    }

    #[test]
    fn split_outgoing_stamps_running_sequence_numbers() {
        let compiler = MessageCompiler::with_max_frame_payload(100);
        let content = vec![b'y'; 250];
        let frames = compiler.split_outgoing(3, 1, FrameKind::Msg, None, 1000, &Mime::octet_stream(), &content);
        let raw_seqnos: Vec<u32> = frames
            .iter()
            .map(|f| match f {
                Frame::Msg(d) => d.sequence,
                other => panic!("expected Msg frame, got {other:?}"),
            })
            .collect();
        assert_eq!(raw_seqnos, vec![1000, 1100, 1200]);
    }

    #[test]
    fn assembles_message_spread_across_three_frames() {
        let mut compiler = MessageCompiler::new();
        let content = Bytes::from(vec![b'z'; 250]);
        let body = render_entity(&Mime::octet_stream(), &content);
        let chunks = chunk_payload(&body, Some(100));
        let mut seq = 0u32;
        let mut assembled = None;
        for (more, chunk) in chunks {
            let frame = Frame::Msg(DataFrame { channel: 3, message: 1, more, sequence: seq, payload: chunk.clone() });
            seq = seq.wrapping_add(chunk.len() as u32);
            assembled = compiler.push_frame(frame).expect("push succeeds");
        }
        let message = assembled.expect("message assembled on final frame");
        assert_eq!(message.content, content);
        assert_eq!(message.mime, Mime::octet_stream());
    }

    #[test]
    fn stray_complete_frame_yields_single_frame_message() {
        let mut compiler = MessageCompiler::new();
        let frame = Frame::Rpy(DataFrame { channel: 0, message: 0, more: false, sequence: 0, payload: Bytes::from_static(b"Content-Type: application/beep+xml\r\n\r\n<ok />") });
        let message = compiler.push_frame(frame).expect("push succeeds").expect("single-frame message");
        assert_eq!(message.content, Bytes::from_static(b"<ok />"));
        assert_eq!(message.mime, Mime::beep_xml());
    }

    #[test]
    fn untyped_payload_defaults_to_octet_stream() {
        let mut compiler = MessageCompiler::new();
        let frame = Frame::Msg(DataFrame { channel: 1, message: 0, more: false, sequence: 0, payload: Bytes::from_static(b"raw bytes, no entity header") });
        let message = compiler.push_frame(frame).expect("push succeeds").expect("message");
        assert_eq!(message.mime, Mime::octet_stream());
        assert_eq!(message.content, Bytes::from_static(b"raw bytes, no entity header"));
    }

    #[test]
    fn mismatched_continuation_type_is_a_framing_error() {
        let mut compiler = MessageCompiler::new();
        let first = Frame::Msg(DataFrame { channel: 1, message: 0, more: true, sequence: 0, payload: Bytes::from_static(b"partial") });
        assert_eq!(compiler.push_frame(first).unwrap(), None);
        let conflicting = Frame::Rpy(DataFrame { channel: 1, message: 0, more: false, sequence: 7, payload: Bytes::from_static(b"oops") });
        let err = compiler.push_frame(conflicting).unwrap_err();
        assert!(matches!(err, MessageError::FramingError { channel: 1, message: 0, .. }));
    }

    #[test]
    fn nul_with_more_true_is_rejected() {
        let mut compiler = MessageCompiler::new();
        let frame = Frame::Nul(DataFrame { channel: 1, message: 3, more: true, sequence: 0, payload: Bytes::new() });
        let err = compiler.push_frame(frame).unwrap_err();
        assert!(matches!(err, MessageError::UnexpectedContinuation { channel: 1, message: 3 }));
    }

    #[test]
    fn interleaved_answer_streams_do_not_collide() {
        let mut compiler = MessageCompiler::new();
        let first = Frame::Ans(AnsFrame { channel: 2, message: 5, more: true, sequence: 0, answer: 0, payload: Bytes::from_static(b"a-") });
        let second = Frame::Ans(AnsFrame { channel: 2, message: 5, more: true, sequence: 0, answer: 1, payload: Bytes::from_static(b"b-") });
        assert_eq!(compiler.push_frame(first).unwrap(), None);
        assert_eq!(compiler.push_frame(second).unwrap(), None);
        let first_end = Frame::Ans(AnsFrame { channel: 2, message: 5, more: false, sequence: 2, answer: 0, payload: Bytes::from_static(b"tail-a") });
        let second_end = Frame::Ans(AnsFrame { channel: 2, message: 5, more: false, sequence: 2, answer: 1, payload: Bytes::from_static(b"tail-b") });
        let msg_a = compiler.push_frame(first_end).unwrap().expect("answer 0 complete");
        let msg_b = compiler.push_frame(second_end).unwrap().expect("answer 1 complete");
        assert_eq!(msg_a.answer, Some(0));
        assert_eq!(msg_a.content, Bytes::from_static(b"a-tail-a"));
        assert_eq!(msg_b.answer, Some(1));
        assert_eq!(msg_b.content, Bytes::from_static(b"b-tail-b"));
    }
}
