/// A profile offered inside a `start` element, or standalone as the positive
/// reply to a successful channel start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileOffer {
    pub uri: String,
    pub encoding: Option<String>,
    /// Initialization content, present when the peer supplies one (≤4096 octets, RFC 3080 §2.3.1.2).
    pub init: Option<String>,
}

impl ProfileOffer {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into(), encoding: None, init: None }
    }
}

/// The closed set of channel-zero XML elements (RFC 3080 §2.3.1), parsed from
/// or emitted to a message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmpNode {
    Greeting { profiles: Vec<String>, features: Vec<String>, localizations: Vec<String> },
    Start { channel: u32, server_name: Option<String>, profiles: Vec<ProfileOffer> },
    Profile(ProfileOffer),
    Close { channel: u32, code: u32, lang: Option<String>, diagnostic: Option<String> },
    Ok,
    Error { code: u32, lang: Option<String>, diagnostic: Option<String> },
}

impl CmpNode {
    /// Convenience constructor for the common empty greeting a listener
    /// with no installed profiles sends.
    pub fn empty_greeting() -> Self {
        CmpNode::Greeting { profiles: Vec::new(), features: Vec::new(), localizations: Vec::new() }
    }

    pub fn greeting(profiles: Vec<String>) -> Self {
        CmpNode::Greeting { profiles, features: Vec::new(), localizations: Vec::new() }
    }
}
