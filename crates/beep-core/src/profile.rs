use bytes::Bytes;

/// A notification delivered to an installed profile handler.
///
/// One collaborator signature covers both channel start and channel close,
/// expressed as a closed union rather than a four-argument callback, so
/// handlers `match` instead of branching on a `close_flag` boolean.
#[derive(Debug, Clone)]
pub enum ProfileEvent {
    /// A channel bound to this profile's URI has just been created.
    Start { channel: u32, init: Option<Bytes>, peer_initiated: bool },
    /// A channel bound to this profile's URI is being torn down.
    Close { channel: u32 },
}

/// The callback a profile registers at `install_profile` time.
pub type ProfileHandler = std::rc::Rc<dyn Fn(ProfileEvent)>;
