use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use beep_cmp::CmpNode;
use beep_core::transport::Transport;
use beep_core::{ProfileEvent, ProfileHandler, ProtocolError, ReplyCode, Role, SessionError, SessionId, SessionStatus, TuningHandler};
use beep_message::{FrameKind, Message, MessageCompiler, Mime};
use beep_wire::{encode_frame, Frame, FrameDecoder};
use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::event::SessionEvent;

const READ_BUF: usize = 4096;

type AddChannelCallback = Box<dyn FnOnce(Result<u32, Rc<SessionError>>, String)>;
type CloseChannelCallback = Box<dyn FnOnce(Result<u32, Rc<SessionError>>)>;
type ReadCallback = Box<dyn FnOnce(Result<Message, Rc<SessionError>>, u32)>;
type SessionHandler = Rc<dyn Fn(SessionEvent)>;

/// An outstanding request on channel zero, keyed by the msgno the request
/// went out under, waiting for the matching `RPY`/`ERR`.
enum PendingTuning {
    Start { uri: String, channel: u32, callback: AddChannelCallback },
    Close { channel: u32, callback: CloseChannelCallback },
}

/// A BEEP peer bound to one transport connection.
///
/// Single-threaded by design: every piece of mutable state here sits behind
/// `RefCell`, never a lock, because a `Session` is pinned to the executor
/// that drives its [`Session::run`] loop and is not `Send`.
pub struct Session<T: Transport> {
    id: SessionId,
    role: Role,
    transport: T,
    tuning: RefCell<TuningHandler>,
    compiler: RefCell<MessageCompiler>,
    decoder: RefCell<FrameDecoder>,
    pending_tuning: RefCell<HashMap<u32, PendingTuning>>,
    pending_reads: RefCell<HashMap<u32, ReadCallback>>,
    session_handler: RefCell<Option<SessionHandler>>,
}

impl<T: Transport> Session<T> {
    pub(crate) fn new(id: SessionId, role: Role, transport: T, tuning: TuningHandler) -> Self {
        Self {
            id,
            role,
            transport,
            tuning: RefCell::new(tuning),
            compiler: RefCell::new(MessageCompiler::new()),
            decoder: RefCell::new(FrameDecoder::new()),
            pending_tuning: RefCell::new(HashMap::new()),
            pending_reads: RefCell::new(HashMap::new()),
            session_handler: RefCell::new(None),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn status(&self) -> SessionStatus {
        self.tuning.borrow().status()
    }

    /// Registers (or replaces) the profile that will be offered at a channel
    /// number once the peer proposes or accepts a `start` for `uri`.
    pub fn install_profile(&self, uri: impl Into<String>, handler: impl Fn(ProfileEvent) + 'static) {
        self.tuning.borrow_mut().install_profile(uri, Rc::new(handler) as ProfileHandler);
    }

    /// Registers the collaborator notified of session-wide events. Only one
    /// handler is kept; installing a second replaces the first.
    pub fn install_session_handler(&self, handler: impl Fn(SessionEvent) + 'static) {
        *self.session_handler.borrow_mut() = Some(Rc::new(handler));
    }

    /// The peer's advertised profile URIs. Empty until the greeting arrives.
    pub fn available_profiles(&self) -> Vec<String> {
        self.tuning.borrow().available_profiles().to_vec()
    }

    /// Sends this peer's greeting. Callers invoke this once before [`Session::run`]
    /// so the first bytes on the wire are the unsolicited `RPY(0, 0)` greeting.
    pub async fn send_greeting(&self) -> Result<(), SessionError> {
        let node = self.tuning.borrow().local_greeting();
        self.send_tuning_reply(0, 0, FrameKind::Rpy, node).await
    }

    /// Proposes a new channel bound to `uri`. Returns `0` immediately if `uri`
    /// was never installed locally; otherwise returns the allocated channel
    /// number and invokes `cb` once the peer's `RPY`/`ERR` arrives.
    pub async fn async_add_channel(&self, uri: &str, cb: impl FnOnce(Result<u32, Rc<SessionError>>, String) + 'static) -> u32 {
        let proposed = {
            let mut tuning = self.tuning.borrow_mut();
            tuning.propose_start(Some(self.id.to_string()), uri)
        };
        let (channel, node) = match proposed {
            Ok(pair) => pair,
            Err(unknown) => {
                cb(Err(Rc::new(SessionError::Protocol(ProtocolError::new(ReplyCode::RequestedActionNotAccepted, unknown.to_string())))), uri.to_string());
                return 0;
            }
        };
        match self.send_tuning_request(node).await {
            Ok(msgno) => {
                self.pending_tuning
                    .borrow_mut()
                    .insert(msgno, PendingTuning::Start { uri: uri.to_string(), channel, callback: Box::new(cb) });
                channel
            }
            Err(e) => {
                self.tuning.borrow_mut().abandon_half_open(channel);
                cb(Err(Rc::new(e)), uri.to_string());
                0
            }
        }
    }

    /// Requests that `channel` (or, for `0`, the whole session) be closed.
    pub async fn async_close_channel(&self, channel: u32, code: u32, cb: impl FnOnce(Result<u32, Rc<SessionError>>) + 'static) {
        let node = self.tuning.borrow().request_close(channel, code);
        if channel == 0 {
            self.tuning.borrow_mut().begin_closing();
        }
        match self.send_tuning_request(node).await {
            Ok(msgno) => {
                self.pending_tuning.borrow_mut().insert(msgno, PendingTuning::Close { channel, callback: Box::new(cb) });
            }
            Err(e) => cb(Err(Rc::new(e))),
        }
    }

    /// Registers a one-shot callback for the next complete message assembled
    /// on `channel`. There is no passive dispatch: a message that arrives with
    /// no registered reader is dropped.
    pub fn async_read(&self, channel: u32, cb: impl FnOnce(Result<Message, Rc<SessionError>>, u32) + 'static) {
        self.pending_reads.borrow_mut().insert(channel, Box::new(cb));
    }

    /// Sends a complete application message on `channel` as a single `MSG`,
    /// returning the msgno it was stamped with.
    pub async fn send(&self, channel: u32, mime: Mime, content: impl Into<Bytes>) -> Result<u32, SessionError> {
        let content = content.into();
        let (msgno, seqno) = {
            let mut tuning = self.tuning.borrow_mut();
            tuning.table_mut().prepare_outgoing(channel, beep_message::rendered_len(&mime, content.len()))?
        };
        let frames = self.compiler.borrow().split_outgoing(channel, msgno, FrameKind::Msg, None, seqno, &mime, &content);
        self.write_frames(frames).await?;
        Ok(msgno)
    }

    /// Initiates a graceful close of the whole session. Advisory: the
    /// transport is only released once the peer's positive reply to the
    /// close(0) request is processed by [`Session::run`].
    pub async fn shutdown(&self) {
        self.async_close_channel(0, ReplyCode::Success.code(), |_| {}).await;
    }

    /// Drives the session until the transport closes or a fatal error occurs.
    ///
    /// Owns the single place frames are read, decoded, assembled into
    /// messages, and dispatched. For an inbound peer-initiated `start`, the
    /// positive `RPY` is written and awaited *before* the bound profile's
    /// start handler runs, so nothing the handler sends on the new channel
    /// can race ahead of the channel actually being opened on the wire.
    pub async fn run(&self) -> Result<(), SessionError> {
        let mut buf = [0u8; READ_BUF];
        loop {
            if self.tuning.borrow().status() == SessionStatus::Closed {
                self.transport.close();
                return Ok(());
            }
            let n = match self.transport.read(&mut buf).await {
                Ok(n) => n,
                Err(err) => {
                    let shared = Rc::new(SessionError::from(err));
                    self.fail_all(shared.clone());
                    self.fire_session_event(SessionEvent::FatalError(shared));
                    self.transport.close();
                    return Err(SessionError::TransportClosed);
                }
            };
            trace!(bytes = n, "read from transport");
            self.decoder.borrow_mut().feed(&buf[..n]);
            loop {
                let decoded = self.decoder.borrow_mut().decode_next();
                let frame = match decoded {
                    Ok(Some(frame)) => frame,
                    Ok(None) => break,
                    Err(e) => return self.fail_session(SessionError::from(e)).await,
                };
                self.handle_frame(frame).await?;
            }
        }
    }

    async fn handle_frame(&self, frame: Frame) -> Result<(), SessionError> {
        let channel = frame.channel();
        let assembled = self.compiler.borrow_mut().push_frame(frame);
        let message = match assembled {
            Ok(Some(message)) => message,
            Ok(None) => return Ok(()),
            Err(e) => return self.fail_session(SessionError::from(e)).await,
        };
        if channel == 0 {
            self.handle_tuning_message(message).await
        } else {
            self.dispatch_user_message(message);
            Ok(())
        }
    }

    fn dispatch_user_message(&self, message: Message) {
        let channel = message.channel;
        match self.pending_reads.borrow_mut().remove(&channel) {
            Some(cb) => cb(Ok(message), channel),
            None => debug!(channel, "message arrived with no registered reader, dropping"),
        }
    }

    async fn handle_tuning_message(&self, message: Message) -> Result<(), SessionError> {
        let node = match beep_cmp::parse(&String::from_utf8_lossy(&message.content)) {
            Ok(node) => node,
            Err(e) => return self.fail_session(SessionError::from(e)).await,
        };
        match message.kind {
            FrameKind::Rpy | FrameKind::Err => {
                self.handle_tuning_reply(message.message, message.kind, node).await
            }
            FrameKind::Msg => self.handle_tuning_request(message.message, node).await,
            FrameKind::Nul | FrameKind::Ans => {
                warn!(kind = ?message.kind, "channel zero does not carry this frame kind, ignoring");
                Ok(())
            }
        }
    }

    async fn handle_tuning_reply(&self, msgno: u32, kind: FrameKind, node: CmpNode) -> Result<(), SessionError> {
        if msgno == 0 {
            if let CmpNode::Greeting { .. } = &node {
                return match self.tuning.borrow_mut().handle_greeting(node) {
                    Ok(()) => {
                        debug!("peer greeting received, session active");
                        self.fire_session_event(SessionEvent::Greeted);
                        Ok(())
                    }
                    Err(e) => self.fail_session(SessionError::from(e)).await,
                };
            }
        }

        let pending = self.pending_tuning.borrow_mut().remove(&msgno);
        match pending {
            Some(PendingTuning::Start { uri, channel, callback }) => match (kind, node) {
                (FrameKind::Rpy, CmpNode::Profile(_)) => callback(Ok(channel), uri),
                (FrameKind::Err, CmpNode::Error { code, diagnostic, .. }) => {
                    self.tuning.borrow_mut().abandon_half_open(channel);
                    callback(Err(Rc::new(SessionError::Protocol(protocol_error_from(code, diagnostic)))), uri);
                }
                (_, other) => {
                    self.tuning.borrow_mut().abandon_half_open(channel);
                    let err = ProtocolError::new(ReplyCode::GeneralSyntaxError, format!("unexpected tuning reply {other:?}"));
                    callback(Err(Rc::new(SessionError::Protocol(err))), uri);
                }
            },
            Some(PendingTuning::Close { channel, callback }) => match (kind, node) {
                (FrameKind::Rpy, CmpNode::Ok) => {
                    if channel == 0 {
                        self.tuning.borrow_mut().mark_closed();
                    } else {
                        self.tuning.borrow_mut().confirm_close(channel);
                    }
                    callback(Ok(channel));
                }
                (FrameKind::Err, CmpNode::Error { code, diagnostic, .. }) => {
                    callback(Err(Rc::new(SessionError::Protocol(protocol_error_from(code, diagnostic)))));
                }
                (_, other) => {
                    let err = ProtocolError::new(ReplyCode::GeneralSyntaxError, format!("unexpected tuning reply {other:?}"));
                    callback(Err(Rc::new(SessionError::Protocol(err))));
                }
            },
            None => warn!(msgno, "tuning reply with no matching pending request, ignoring"),
        }
        Ok(())
    }

    async fn handle_tuning_request(&self, msgno: u32, node: CmpNode) -> Result<(), SessionError> {
        match &node {
            CmpNode::Start { .. } => {
                let outcome = self.tuning.borrow_mut().accept_start(node);
                match outcome {
                    beep_core::AcceptOutcome::Accepted { response, accepted } => {
                        self.send_tuning_reply(0, msgno, FrameKind::Rpy, response).await?;
                        self.tuning.borrow().invoke_start_handler(&accepted);
                    }
                    beep_core::AcceptOutcome::Rejected(response) => {
                        self.send_tuning_reply(0, msgno, FrameKind::Err, response).await?;
                    }
                }
                Ok(())
            }
            CmpNode::Close { .. } => {
                let outcome = self.tuning.borrow_mut().peer_close(node);
                let kind = if matches!(outcome.response, CmpNode::Error { .. }) { FrameKind::Err } else { FrameKind::Rpy };
                self.send_tuning_reply(0, msgno, kind, outcome.response).await?;
                if outcome.session_release {
                    self.transport.close();
                }
                Ok(())
            }
            other => {
                warn!(?other, "unexpected node shape for a channel-zero MSG, ignoring");
                Ok(())
            }
        }
    }

    /// Sends a locally-initiated tuning `MSG`, stamping a fresh msgno off
    /// channel zero's own counter.
    async fn send_tuning_request(&self, node: CmpNode) -> Result<u32, SessionError> {
        let content = beep_cmp::emit(&node);
        let (msgno, seqno) = {
            let mut tuning = self.tuning.borrow_mut();
            tuning.table_mut().prepare_outgoing(0, beep_message::rendered_len(&Mime::beep_xml(), content.len()))?
        };
        let frames = self.compiler.borrow().split_outgoing(0, msgno, FrameKind::Msg, None, seqno, &Mime::beep_xml(), content.as_bytes());
        self.write_frames(frames).await?;
        Ok(msgno)
    }

    /// Replies to an inbound channel-zero `MSG`, echoing its msgno while
    /// advancing only the local outgoing sequence counter.
    async fn send_tuning_reply(&self, channel: u32, msgno: u32, kind: FrameKind, node: CmpNode) -> Result<(), SessionError> {
        let content = beep_cmp::emit(&node);
        let seqno = {
            let mut tuning = self.tuning.borrow_mut();
            tuning.table_mut().advance_sequence_only(channel, beep_message::rendered_len(&Mime::beep_xml(), content.len()))?
        };
        let frames = self.compiler.borrow().split_outgoing(channel, msgno, kind, None, seqno, &Mime::beep_xml(), content.as_bytes());
        self.write_frames(frames).await?;
        Ok(())
    }

    async fn write_frames(&self, frames: Vec<Frame>) -> Result<(), SessionError> {
        for frame in frames {
            let bytes = encode_frame(&frame);
            self.transport.write_all(&bytes).await?;
        }
        Ok(())
    }

    /// Tears the session down: every pending callback and the session handler
    /// are told exactly once.
    async fn fail_session(&self, err: SessionError) -> Result<(), SessionError> {
        let shared = Rc::new(err);
        self.fail_all(shared.clone());
        self.fire_session_event(SessionEvent::FatalError(shared));
        self.transport.close();
        Err(SessionError::TransportClosed)
    }

    fn fail_all(&self, err: Rc<SessionError>) {
        for (_, pending) in self.pending_tuning.borrow_mut().drain() {
            match pending {
                PendingTuning::Start { callback, uri, .. } => callback(Err(err.clone()), uri),
                PendingTuning::Close { callback, .. } => callback(Err(err.clone())),
            }
        }
        for (channel, cb) in self.pending_reads.borrow_mut().drain() {
            cb(Err(err.clone()), channel);
        }
    }

    fn fire_session_event(&self, event: SessionEvent) {
        if let Some(handler) = self.session_handler.borrow().as_ref() {
            handler(event);
        }
    }
}

fn protocol_error_from(code: u32, diagnostic: Option<String>) -> ProtocolError {
    let reply_code = ReplyCode::from_code(code).unwrap_or(ReplyCode::RequestedActionNotAccepted);
    ProtocolError::new(reply_code, diagnostic.unwrap_or_default())
}
