/// Which side of a session this peer is playing.
///
/// Determines channel-number parity (RFC 3080 §2.3.1.2): initiators allocate
/// odd numbers, listeners allocate even numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Listener,
}

impl Role {
    /// The first channel number this role is permitted to allocate.
    pub fn base_channel(self) -> u32 {
        match self {
            Role::Initiator => 1,
            Role::Listener => 2,
        }
    }
}
