use bytes::Bytes;

/// One BEEP data frame header's worth of identity, shared by MSG/RPY/ERR/NUL
/// (ANS adds `answer` on top; see [`AnsFrame`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    pub channel: u32,
    pub message: u32,
    /// `true` for `*` (more frames follow), `false` for `.` (this frame completes the message).
    pub more: bool,
    pub sequence: u32,
    pub payload: Bytes,
}

/// An `ANS` frame: one of potentially many answers to a single MSG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnsFrame {
    pub channel: u32,
    pub message: u32,
    pub more: bool,
    pub sequence: u32,
    pub answer: u32,
    pub payload: Bytes,
}

/// An RFC 3081 `SEQ` mapping frame: advertises a receive window. Carries no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqFrame {
    pub channel: u32,
    pub acknowledgement: u32,
    pub window: u32,
}

/// A single frame of the BEEP wire protocol (RFC 3080 §2.2 / RFC 3081 §2).
///
/// This is a closed sum type, not an open hierarchy: every site that needs to
/// branch on frame kind does so with a single `match`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Msg(DataFrame),
    Rpy(DataFrame),
    Ans(AnsFrame),
    Err(DataFrame),
    Nul(DataFrame),
    Seq(SeqFrame),
}

impl Frame {
    /// The three-letter wire keyword for this frame's variant.
    pub fn keyword(&self) -> &'static str {
        match self {
            Frame::Msg(_) => "MSG",
            Frame::Rpy(_) => "RPY",
            Frame::Ans(_) => "ANS",
            Frame::Err(_) => "ERR",
            Frame::Nul(_) => "NUL",
            Frame::Seq(_) => "SEQ",
        }
    }

    /// The channel this frame is addressed to. `SEQ` frames carry a channel too
    /// (it names the channel whose window is being advertised).
    pub fn channel(&self) -> u32 {
        match self {
            Frame::Msg(d) | Frame::Rpy(d) | Frame::Err(d) | Frame::Nul(d) => d.channel,
            Frame::Ans(a) => a.channel,
            Frame::Seq(s) => s.channel,
        }
    }

    /// The message number, for data-bearing variants. `SEQ` has none.
    pub fn message(&self) -> Option<u32> {
        match self {
            Frame::Msg(d) | Frame::Rpy(d) | Frame::Err(d) | Frame::Nul(d) => Some(d.message),
            Frame::Ans(a) => Some(a.message),
            Frame::Seq(_) => None,
        }
    }

    /// Whether more frames complete this message. `SEQ` is never continued.
    pub fn more(&self) -> bool {
        match self {
            Frame::Msg(d) | Frame::Rpy(d) | Frame::Err(d) | Frame::Nul(d) => d.more,
            Frame::Ans(a) => a.more,
            Frame::Seq(_) => false,
        }
    }

    /// The payload bytes, empty for `SEQ`.
    pub fn payload(&self) -> &[u8] {
        match self {
            Frame::Msg(d) | Frame::Rpy(d) | Frame::Err(d) | Frame::Nul(d) => &d.payload,
            Frame::Ans(a) => &a.payload,
            Frame::Seq(_) => &[],
        }
    }

    /// Whether this is one of the five data-bearing keywords (everything but `SEQ`).
    pub fn is_data(&self) -> bool {
        !matches!(self, Frame::Seq(_))
    }
}
