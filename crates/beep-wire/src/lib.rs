//! BEEP frame wire format: the header/payload/trailer grammar of RFC 3080 §2.2
//! and the `SEQ` mapping frame of RFC 3081 §2.
//!
//! This crate knows nothing about channels, messages, or sessions — it only
//! turns bytes into [`Frame`] values and back. Everything above it (message
//! assembly, channel bookkeeping, session state) is built on top in sibling
//! crates.

mod codec;
mod error;
mod frame;
mod limits;

pub use codec::{encode_frame, FrameDecoder};
pub use error::FrameError;
pub use frame::{AnsFrame, DataFrame, Frame, SeqFrame};
pub use limits::{check_u31, check_u32, U31_BOUND, U32_BOUND};

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn rpy_greeting() -> Frame {
        Frame::Rpy(DataFrame {
            channel: 0,
            message: 0,
            more: false,
            sequence: 0,
            payload: Bytes::from_static(b"Content-Type: application/beep+xml\r\n\r\n<greeting />"),
        })
    }

    #[test]
    fn encodes_greeting_reply_byte_for_byte() {
        let encoded = encode_frame(&rpy_greeting());
        assert_eq!(
            &encoded[..],
            b"RPY 0 0 . 0 50\r\nContent-Type: application/beep+xml\r\n\r\n<greeting />END\r\n".as_slice()
        );
    }

    #[test]
    fn round_trips_every_frame_kind() {
        let frames = vec![
            Frame::Msg(DataFrame { channel: 1, message: 0, more: false, sequence: 0, payload: Bytes::from_static(b"hello") }),
            rpy_greeting(),
            Frame::Ans(AnsFrame { channel: 3, message: 2, more: true, sequence: 10, answer: 0, payload: Bytes::from_static(b"partial") }),
            Frame::Err(DataFrame { channel: 0, message: 4, more: false, sequence: 5, payload: Bytes::from_static(b"bad") }),
            Frame::Nul(DataFrame { channel: 1, message: 1, more: false, sequence: 20, payload: Bytes::new() }),
            Frame::Seq(SeqFrame { channel: 1, acknowledgement: 4096, window: 8192 }),
        ];
        for frame in frames {
            let bytes = encode_frame(&frame);
            let mut decoder = FrameDecoder::new();
            decoder.feed(&bytes);
            let decoded = decoder.decode_next().expect("decode succeeds").expect("frame is complete");
            assert_eq!(decoded, frame);
            assert_eq!(decoder.decode_next().expect("no trailing garbage"), None);
        }
    }

    #[test]
    fn seq_frame_has_no_end_trailer() {
        let encoded = encode_frame(&Frame::Seq(SeqFrame { channel: 0, acknowledgement: 1, window: 2 }));
        assert_eq!(&encoded[..], b"SEQ 0 1 2\r\n".as_slice());
        assert!(!encoded.ends_with(b"END\r\n"));
    }

    #[test]
    fn decode_next_reports_need_more_on_partial_header() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(b"MSG 0 0 . 0 5\r\nhel");
        assert_eq!(decoder.decode_next().expect("no error while incomplete"), None);
        decoder.feed(b"lo");
        assert_eq!(decoder.decode_next().expect("still waiting on trailer"), None);
        decoder.feed(b"END\r\n");
        let frame = decoder.decode_next().expect("now complete").expect("frame present");
        assert_eq!(frame.payload(), b"hello");
    }

    #[test]
    fn decode_next_splits_two_buffered_frames() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(b"SEQ 0 100 4096\r\nMSG 1 0 . 0 3\r\nabcEND\r\n");
        let first = decoder.decode_next().expect("decode ok").expect("frame present");
        assert!(matches!(first, Frame::Seq(_)));
        let second = decoder.decode_next().expect("decode ok").expect("frame present");
        assert_eq!(second.payload(), b"abc");
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn rejects_bad_continuation_symbol() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(b"MSG 0 0 x 0 0\r\nEND\r\n");
        let err = decoder.decode_next().unwrap_err();
        assert!(matches!(err, FrameError::InvalidContinuationSymbol(ref s) if s == "x"));
    }

    #[test]
    fn rejects_out_of_range_channel() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(b"MSG 99999999999 0 . 0 0\r\nEND\r\n");
        let err = decoder.decode_next().unwrap_err();
        assert!(matches!(err, FrameError::OutOfRange { field: "channel", .. }));
    }

    #[test]
    fn rejects_missing_trailer() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(b"MSG 0 0 . 0 3\r\nabcNOPE");
        let err = decoder.decode_next().unwrap_err();
        assert!(matches!(err, FrameError::MissingTrailer));
    }

    #[test]
    fn rejects_unknown_keyword() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(b"FOO 0 0 . 0 0\r\nEND\r\n");
        let err = decoder.decode_next().unwrap_err();
        assert!(matches!(err, FrameError::MalformedHeader(_)));
    }
}
