//! Session state machine for channel zero: greeting, start/close negotiation,
//! and the lifecycle status that drives them.
//!
//! This module holds the [`ChannelTable`] and decides *what CMP node* a given
//! inbound tuning message produces; it does not touch the wire or the pending
//! callback maps keyed by outgoing msgno — those registries belong to the
//! facade session, not here.

use beep_cmp::CmpNode;

use crate::error::{ProtocolError, UnknownProfile};
use crate::profile::ProfileHandler;
use crate::reply_code::ReplyCode;
use crate::role::Role;
use crate::table::{AcceptOutcome, AcceptedStart, ChannelTable};

/// Where a session sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Fresh,
    Greeted,
    Active,
    Closing,
    Closed,
}

/// The outcome of feeding a peer-initiated `close` through [`TuningHandler::peer_close`].
pub struct CloseOutcome {
    pub response: CmpNode,
    /// `true` when the close targeted channel 0: the whole session is
    /// ending, not just one channel.
    pub session_release: bool,
}

/// Owns the channel table and the greeting/start/close state logic that runs
/// on channel 0.
pub struct TuningHandler {
    role: Role,
    table: ChannelTable,
    status: SessionStatus,
    peer_profiles: Vec<String>,
}

impl TuningHandler {
    pub fn new(role: Role) -> Self {
        Self { role, table: ChannelTable::new(), status: SessionStatus::Fresh, peer_profiles: Vec::new() }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn table(&self) -> &ChannelTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut ChannelTable {
        &mut self.table
    }

    pub fn install_profile(&mut self, uri: impl Into<String>, handler: ProfileHandler) {
        self.table.install_profile(uri, handler);
    }

    /// The `greeting` this peer sends once, at session start.
    pub fn local_greeting(&self) -> CmpNode {
        CmpNode::greeting(self.table.get_profiles())
    }

    /// Consumes the peer's greeting. There is no separate handshake:
    /// receiving it moves `fresh` straight to `active`.
    pub fn handle_greeting(&mut self, node: CmpNode) -> Result<(), ProtocolError> {
        let CmpNode::Greeting { profiles, .. } = node else {
            return Err(ProtocolError::new(ReplyCode::GeneralSyntaxError, "expected <greeting> on channel 0"));
        };
        self.peer_profiles = profiles;
        self.status = SessionStatus::Active;
        Ok(())
    }

    /// After `Active`, the peer's advertised profile URIs.
    pub fn available_profiles(&self) -> &[String] {
        &self.peer_profiles
    }

    pub fn propose_start(&mut self, server_name: Option<String>, uri: &str) -> Result<(u32, CmpNode), UnknownProfile> {
        self.table.propose_start(self.role, server_name, uri)
    }

    pub fn abandon_half_open(&mut self, channel: u32) {
        self.table.abandon_half_open(channel);
    }

    pub fn accept_start(&mut self, node: CmpNode) -> AcceptOutcome {
        self.table.accept_start(node)
    }

    pub fn invoke_start_handler(&self, accepted: &AcceptedStart) {
        self.table.invoke_start_handler(accepted);
    }

    pub fn peer_close(&mut self, node: CmpNode) -> CloseOutcome {
        let (response, session_release) = self.table.peer_close(node);
        if session_release {
            self.status = SessionStatus::Closed;
        }
        CloseOutcome { response, session_release }
    }

    pub fn request_close(&self, channel: u32, code: u32) -> CmpNode {
        self.table.request_close(channel, code)
    }

    pub fn confirm_close(&mut self, channel: u32) {
        self.table.confirm_close(channel);
    }

    /// Marks the session as beginning a local graceful shutdown (local
    /// `async_close_channel(0, ...)` / `shutdown()`).
    pub fn begin_closing(&mut self) {
        self.status = SessionStatus::Closing;
    }

    pub fn mark_closed(&mut self) {
        self.status = SessionStatus::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_session_starts_fresh() {
        let handler = TuningHandler::new(Role::Initiator);
        assert_eq!(handler.status(), SessionStatus::Fresh);
    }

    #[test]
    fn receiving_greeting_moves_straight_to_active() {
        let mut handler = TuningHandler::new(Role::Initiator);
        handler.handle_greeting(CmpNode::greeting(vec!["x".to_string()])).unwrap();
        assert_eq!(handler.status(), SessionStatus::Active);
        assert_eq!(handler.available_profiles(), &["x".to_string()]);
    }

    #[test]
    fn handle_greeting_rejects_wrong_node_kind() {
        let mut handler = TuningHandler::new(Role::Initiator);
        let err = handler.handle_greeting(CmpNode::Ok).unwrap_err();
        assert_eq!(err.code, ReplyCode::GeneralSyntaxError);
    }

    #[test]
    fn peer_close_on_channel_zero_marks_closed() {
        let mut handler = TuningHandler::new(Role::Initiator);
        let outcome = handler.peer_close(CmpNode::Close { channel: 0, code: 200, lang: None, diagnostic: None });
        assert!(outcome.session_release);
        assert_eq!(handler.status(), SessionStatus::Closed);
    }
}
