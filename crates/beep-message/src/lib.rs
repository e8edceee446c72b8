//! BEEP message assembly: joins frames into complete messages keyed by
//! (channel, msgno, frame-type[, ansno]), and splits outgoing messages back
//! into frames.
//!
//! Sits directly above `beep-wire`: this crate knows about MIME entity
//! framing and continuation but nothing about channel numbering or session
//! lifecycle, which live in `beep-core`.

mod compiler;
mod error;
mod message;

pub use compiler::{rendered_len, MessageCompiler};
pub use error::MessageError;
pub use message::{FrameKind, Message, Mime};
