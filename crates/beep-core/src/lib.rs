//! Channel table, tuning handler, and supporting types for a BEEP session.
//!
//! This crate knows how channel numbering, profile binding, and the
//! greeting/start/close dialogue on channel zero work; it does not own a
//! transport connection or the pending-callback maps that make those
//! dialogues asynchronous from a caller's point of view — that composition
//! lives in the `beep` facade crate.

mod channel;
mod error;
mod id;
mod profile;
mod reply_code;
mod role;
mod table;
mod tuning;
pub mod transport;

pub use channel::Channel;
pub use error::{ProtocolError, SessionError, UnknownProfile};
pub use id::SessionId;
pub use profile::{ProfileEvent, ProfileHandler};
pub use reply_code::ReplyCode;
pub use role::Role;
pub use table::{AcceptOutcome, AcceptedStart, ChannelTable};
pub use tuning::{CloseOutcome, SessionStatus, TuningHandler};
