//! A BEEP (RFC 3080/3081) peer: session-oriented, channel-multiplexed framed
//! messaging over a byte stream.
//!
//! This crate composes the lower layers into one public session handle:
//! `beep-wire`'s frame codec, `beep-cmp`'s channel-management XML, and
//! `beep-message`'s assembly/compilation on top of `beep-core`'s channel
//! table and tuning state machine. Most applications only need the types
//! re-exported here.

mod builder;
mod event;
mod session;

pub use beep_cmp::{CmpNode, ProfileOffer};
pub use beep_core::transport::{mem::MemTransport, tcp::TcpTransport, Transport, TransportError};
pub use beep_core::{ProfileEvent, ProfileHandler, ProtocolError, ReplyCode, Role, SessionError, SessionId, SessionStatus, UnknownProfile};
pub use beep_message::{FrameKind, Message, Mime};

pub use builder::SessionBuilder;
pub use event::SessionEvent;
pub use session::Session;
