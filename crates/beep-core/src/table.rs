use std::collections::HashMap;

use beep_cmp::{CmpNode, ProfileOffer};
use bytes::Bytes;

use crate::channel::Channel;
use crate::error::{ProtocolError, UnknownProfile};
use crate::profile::{ProfileEvent, ProfileHandler};
use crate::reply_code::ReplyCode;
use crate::role::Role;

/// A channel bound by [`ChannelTable::accept_start`], awaiting the caller to
/// invoke its profile handler via [`ChannelTable::invoke_start_handler`].
#[derive(Debug, Clone)]
pub struct AcceptedStart {
    pub channel: u32,
    pub uri: String,
    pub init: Option<Bytes>,
}

/// The result of [`ChannelTable::accept_start`].
#[derive(Debug, Clone)]
pub enum AcceptOutcome {
    Accepted { response: CmpNode, accepted: AcceptedStart },
    Rejected(CmpNode),
}

/// Numbered channels plus the registry of locally installed profiles.
/// Channel 0 (the tuning channel) is present from construction and is never
/// removed by any operation here.
pub struct ChannelTable {
    channels: HashMap<u32, Channel>,
    profiles: HashMap<String, ProfileHandler>,
    /// Insertion order of `profiles`, kept separately so `get_profiles`
    /// is deterministic for testing.
    profile_order: Vec<String>,
    last_allocated: Option<u32>,
}

impl ChannelTable {
    pub fn new() -> Self {
        let mut channels = HashMap::new();
        channels.insert(0, Channel::new_tuning());
        Self { channels, profiles: HashMap::new(), profile_order: Vec::new(), last_allocated: None }
    }

    /// Records an accepted profile. Duplicates overwrite the handler but keep
    /// the original position in `get_profiles`'s insertion order.
    pub fn install_profile(&mut self, uri: impl Into<String>, handler: ProfileHandler) {
        let uri = uri.into();
        if !self.profiles.contains_key(&uri) {
            self.profile_order.push(uri.clone());
        }
        self.profiles.insert(uri, handler);
    }

    pub fn has_profile(&self, uri: &str) -> bool {
        self.profiles.contains_key(uri)
    }

    pub fn get_profiles(&self) -> Vec<String> {
        self.profile_order.clone()
    }

    pub fn channel(&self, number: u32) -> Option<&Channel> {
        self.channels.get(&number)
    }

    pub fn contains(&self, number: u32) -> bool {
        self.channels.contains_key(&number)
    }

    fn next_candidate(&self, role: Role) -> u32 {
        let base = role.base_channel();
        match self.last_allocated {
            Some(last) => (last + 2).max(base),
            None => base,
        }
    }

    /// Allocates a channel number and builds the `start` CMP request. Marks
    /// the channel half-open in the table immediately, so a colliding
    /// `propose_start`/`accept_start` race is rejected eagerly.
    pub fn propose_start(
        &mut self,
        role: Role,
        server_name: Option<String>,
        uri: &str,
    ) -> Result<(u32, CmpNode), UnknownProfile> {
        if !self.profiles.contains_key(uri) {
            return Err(UnknownProfile(uri.to_string()));
        }
        let mut candidate = self.next_candidate(role);
        while self.channels.contains_key(&candidate) {
            candidate += 2;
        }
        self.last_allocated = Some(candidate);
        self.channels.insert(candidate, Channel::new(candidate, Some(uri.to_string())));
        let node = CmpNode::Start { channel: candidate, server_name, profiles: vec![ProfileOffer::new(uri)] };
        Ok((candidate, node))
    }

    /// Removes a half-open channel after the peer rejects a `propose_start`.
    pub fn abandon_half_open(&mut self, channel: u32) {
        self.channels.remove(&channel);
    }

    /// Binds the first locally-supported profile the peer offered, or
    /// returns a `550` error if the channel is taken or none of the offered
    /// profiles are installed. Does not invoke the profile's handler — see
    /// `invoke_start_handler`.
    pub fn accept_start(&mut self, start: CmpNode) -> AcceptOutcome {
        let CmpNode::Start { channel, profiles, .. } = start else {
            return AcceptOutcome::Rejected(CmpNode::Error {
                code: ReplyCode::GeneralSyntaxError.code(),
                lang: None,
                diagnostic: Some("accept_start called with a non-start node".to_string()),
            });
        };
        if self.channels.contains_key(&channel) {
            return AcceptOutcome::Rejected(CmpNode::Error {
                code: ReplyCode::RequestedActionNotAccepted.code(),
                lang: None,
                diagnostic: Some(format!("channel {channel} is already in use")),
            });
        }
        let matched = profiles.iter().find(|p| self.profiles.contains_key(&p.uri)).cloned();
        match matched {
            Some(offer) => {
                self.channels.insert(channel, Channel::new(channel, Some(offer.uri.clone())));
                let init = offer.init.as_ref().map(|text| Bytes::copy_from_slice(text.as_bytes()));
                AcceptOutcome::Accepted {
                    response: CmpNode::Profile(ProfileOffer::new(offer.uri.clone())),
                    accepted: AcceptedStart { channel, uri: offer.uri, init },
                }
            }
            None => AcceptOutcome::Rejected(CmpNode::Error {
                code: ReplyCode::RequestedActionNotAccepted.code(),
                lang: None,
                diagnostic: Some("all requested profiles are unsupported".to_string()),
            }),
        }
    }

    /// Invokes the profile handler bound by a prior [`Self::accept_start`].
    ///
    /// Split out from `accept_start` so the caller can emit the positive RPY
    /// before the handler runs: frames the handler itself sends on the new
    /// channel must follow the RPY onto the wire, never race ahead of it.
    pub fn invoke_start_handler(&self, accepted: &AcceptedStart) {
        if let Some(handler) = self.profiles.get(&accepted.uri) {
            handler(ProfileEvent::Start { channel: accepted.channel, init: accepted.init.clone(), peer_initiated: true });
        }
    }

    /// Handles a peer-initiated `close`. Returns `(response, session_release)`:
    /// `session_release` is `true` exactly when `channel == 0`, meaning the
    /// whole session is going away rather than one channel.
    pub fn peer_close(&mut self, close: CmpNode) -> (CmpNode, bool) {
        let CmpNode::Close { channel, .. } = close else {
            return (
                CmpNode::Error {
                    code: ReplyCode::GeneralSyntaxError.code(),
                    lang: None,
                    diagnostic: Some("peer_close called with a non-close node".to_string()),
                },
                false,
            );
        };
        if channel == 0 {
            return (CmpNode::Ok, true);
        }
        match self.channels.remove(&channel) {
            Some(closed) => {
                if let Some(uri) = &closed.profile {
                    if let Some(handler) = self.profiles.get(uri) {
                        handler(ProfileEvent::Close { channel });
                    }
                }
                (CmpNode::Ok, false)
            }
            None => (
                CmpNode::Error {
                    code: ReplyCode::RequestedActionNotTaken.code(),
                    lang: None,
                    diagnostic: Some(format!("channel {channel} is not open")),
                },
                false,
            ),
        }
    }

    pub fn request_close(&self, channel: u32, code: u32) -> CmpNode {
        CmpNode::Close { channel, code, lang: None, diagnostic: None }
    }

    /// Removes a channel after the peer's positive `ok` reply to a locally
    /// initiated close.
    pub fn confirm_close(&mut self, channel: u32) -> Option<Channel> {
        self.channels.remove(&channel)
    }

    /// Stamps the next outgoing `(msgno, seqno)` pair for `channel` and
    /// advances its counters by `payload_len` octets.
    pub fn prepare_outgoing(&mut self, channel: u32, payload_len: usize) -> Result<(u32, u32), ProtocolError> {
        let ch = self
            .channels
            .get_mut(&channel)
            .ok_or_else(|| ProtocolError::new(ReplyCode::RequestedActionNotTaken, format!("unknown channel {channel}")))?;
        let msgno = ch.next_message_number();
        let seqno = ch.advance_sequence(payload_len);
        Ok((msgno, seqno))
    }

    /// Advances `channel`'s sequence counter without allocating a new msgno —
    /// used for replies that echo a msgno the peer chose (or the implicit
    /// greeting msgno 0) rather than one produced by `prepare_outgoing`.
    pub fn advance_sequence_only(&mut self, channel: u32, payload_len: usize) -> Result<u32, ProtocolError> {
        let ch = self
            .channels
            .get_mut(&channel)
            .ok_or_else(|| ProtocolError::new(ReplyCode::RequestedActionNotTaken, format!("unknown channel {channel}")))?;
        Ok(ch.advance_sequence(payload_len))
    }
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Role;

    fn noop_handler() -> ProfileHandler {
        std::rc::Rc::new(|_event| {})
    }

    #[test]
    fn channel_zero_present_from_construction() {
        let table = ChannelTable::new();
        assert!(table.contains(0));
    }

    #[test]
    fn initiator_allocates_odd_numbers() {
        let mut table = ChannelTable::new();
        table.install_profile("x", noop_handler());
        let (first, _) = table.propose_start(Role::Initiator, None, "x").unwrap();
        let (second, _) = table.propose_start(Role::Initiator, None, "x").unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 3);
    }

    #[test]
    fn listener_allocates_even_numbers() {
        let mut table = ChannelTable::new();
        table.install_profile("x", noop_handler());
        let (first, _) = table.propose_start(Role::Listener, None, "x").unwrap();
        assert_eq!(first, 2);
    }

    #[test]
    fn propose_start_rejects_unknown_profile() {
        let mut table = ChannelTable::new();
        let err = table.propose_start(Role::Initiator, None, "nope").unwrap_err();
        assert_eq!(err.0, "nope");
    }

    #[test]
    fn accept_start_rejects_unsupported_profile_with_550() {
        let mut table = ChannelTable::new();
        let start = CmpNode::Start { channel: 2, server_name: None, profiles: vec![ProfileOffer::new("unknown")] };
        let outcome = table.accept_start(start);
        match outcome {
            AcceptOutcome::Rejected(response) => assert_eq!(
                response,
                CmpNode::Error { code: 550, lang: None, diagnostic: Some("all requested profiles are unsupported".to_string()) }
            ),
            other => panic!("expected Rejected, got {other:?}"),
        }
        assert!(!table.contains(2));
    }

    #[test]
    fn accept_start_binds_matching_profile_and_defers_handler_invocation() {
        let mut table = ChannelTable::new();
        let fired = std::rc::Rc::new(std::cell::RefCell::new(None));
        let fired_clone = fired.clone();
        table.install_profile(
            "x",
            std::rc::Rc::new(move |event: ProfileEvent| {
                *fired_clone.borrow_mut() = Some(event);
            }),
        );
        let start = CmpNode::Start { channel: 1, server_name: None, profiles: vec![ProfileOffer::new("x")] };
        let outcome = table.accept_start(start);
        let accepted = match outcome {
            AcceptOutcome::Accepted { response, accepted } => {
                assert_eq!(response, CmpNode::Profile(ProfileOffer::new("x")));
                accepted
            }
            other => panic!("expected Accepted, got {other:?}"),
        };
        assert!(table.contains(1));
        assert!(fired.borrow().is_none(), "handler must not fire until invoke_start_handler is called");

        table.invoke_start_handler(&accepted);
        match fired.borrow().as_ref().expect("handler fired") {
            ProfileEvent::Start { channel, peer_initiated, .. } => {
                assert_eq!(*channel, 1);
                assert!(*peer_initiated);
            }
            other => panic!("expected Start event, got {other:?}"),
        }
    }

    #[test]
    fn peer_close_unknown_channel_returns_450() {
        let mut table = ChannelTable::new();
        let close = CmpNode::Close { channel: 7, code: 200, lang: None, diagnostic: None };
        let (response, release) = table.peer_close(close);
        assert!(!release);
        assert_eq!(response, CmpNode::Error { code: 450, lang: None, diagnostic: Some("channel 7 is not open".to_string()) });
    }

    #[test]
    fn peer_close_channel_zero_signals_session_release() {
        let mut table = ChannelTable::new();
        let close = CmpNode::Close { channel: 0, code: 200, lang: None, diagnostic: None };
        let (response, release) = table.peer_close(close);
        assert!(release);
        assert_eq!(response, CmpNode::Ok);
    }

    #[test]
    fn prepare_outgoing_fails_for_unknown_channel() {
        let mut table = ChannelTable::new();
        let err = table.prepare_outgoing(9, 10).unwrap_err();
        assert_eq!(err.code, ReplyCode::RequestedActionNotTaken);
    }
}
