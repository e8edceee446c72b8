use bytes::Bytes;

/// MIME entity header for a message body: just the content type, since
/// transfer encoding is not exercised anywhere in this core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mime {
    pub content_type: String,
}

impl Mime {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self { content_type: content_type.into() }
    }

    pub fn octet_stream() -> Self {
        Self::new("application/octet-stream")
    }

    pub fn beep_xml() -> Self {
        Self::new("application/beep+xml")
    }
}

impl Default for Mime {
    fn default() -> Self {
        Self::octet_stream()
    }
}

/// The frame keyword a message was (or will be) carried by. Distinguishes
/// otherwise-identical (channel, msgno) keys during assembly: a channel's
/// outstanding MSG and the RPY answering it share a msgno but never share a
/// frame-type key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Msg,
    Rpy,
    Ans,
    Err,
    Nul,
}

impl FrameKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            FrameKind::Msg => "MSG",
            FrameKind::Rpy => "RPY",
            FrameKind::Ans => "ANS",
            FrameKind::Err => "ERR",
            FrameKind::Nul => "NUL",
        }
    }
}

/// A fully assembled application message, bound to one channel and one
/// message number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub channel: u32,
    pub message: u32,
    pub kind: FrameKind,
    /// Present only for `kind == FrameKind::Ans`: which answer in the sequence this is.
    pub answer: Option<u32>,
    pub mime: Mime,
    pub content: Bytes,
}

impl Message {
    pub fn new(channel: u32, message: u32, kind: FrameKind, mime: Mime, content: impl Into<Bytes>) -> Self {
        Self { channel, message, kind, answer: None, mime, content: content.into() }
    }
}
