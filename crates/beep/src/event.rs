use std::rc::Rc;

use beep_core::SessionError;

/// Session-level notifications delivered to the handler installed via
/// `install_session_handler`.
///
/// `FatalError` wraps an [`Rc`] rather than the bare error because the same
/// value is also handed to every pending callback the fatal condition
/// disconnects: every pending tuning callback and user-read callback is
/// invoked exactly once with the error.
#[derive(Clone)]
pub enum SessionEvent {
    /// The peer's greeting arrived; `available_profiles()` now reflects it.
    Greeted,
    /// The session is tearing down; no further callbacks will fire.
    FatalError(Rc<SessionError>),
}
