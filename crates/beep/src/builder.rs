use beep_core::transport::Transport;
use beep_core::{Role, SessionId, TuningHandler};

use crate::session::Session;

/// Builds a [`Session`] bound to one transport.
///
/// Profiles installed here are available the moment the greeting is sent;
/// profiles can also be installed later, directly on the built `Session`.
pub struct SessionBuilder<T: Transport> {
    role: Role,
    transport: Option<T>,
    id: Option<SessionId>,
    profiles: Vec<(String, beep_core::ProfileHandler)>,
}

impl<T: Transport> SessionBuilder<T> {
    pub fn new(role: Role) -> Self {
        Self { role, transport: None, id: None, profiles: Vec::new() }
    }

    pub fn initiator() -> Self {
        Self::new(Role::Initiator)
    }

    pub fn listener() -> Self {
        Self::new(Role::Listener)
    }

    pub fn transport(mut self, transport: T) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn id(mut self, id: SessionId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn profile(mut self, uri: impl Into<String>, handler: impl Fn(beep_core::ProfileEvent) + 'static) -> Self {
        self.profiles.push((uri.into(), std::rc::Rc::new(handler) as beep_core::ProfileHandler));
        self
    }

    /// Builds the session. Panics if no transport was supplied: a
    /// `SessionBuilder` with no transport is a programming error, not a
    /// runtime condition callers need to recover from.
    pub fn build(self) -> Session<T> {
        let transport = self.transport.expect("SessionBuilder::build called without a transport");
        let id = self.id.unwrap_or_else(SessionId::generate);
        let mut tuning = TuningHandler::new(self.role);
        for (uri, handler) in self.profiles {
            tuning.install_profile(uri, handler);
        }
        Session::new(id, self.role, transport, tuning)
    }
}
