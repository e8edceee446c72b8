use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A locally generated session identifier.
///
/// Session identity is an external collaborator's concern in principle
/// (nothing on the wire depends on it), but every session needs *some*
/// stable handle for logging and for `Transport::on_established`. This
/// combines a process-startup-relative timestamp with a monotonic counter,
/// which is enough to make ids unique within one process without pulling in
/// a UUID dependency the wire protocol has no use for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u128);

impl SessionId {
    pub fn generate() -> Self {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0);
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed) as u128;
        SessionId((nanos << 20) | (sequence & 0xF_FFFF))
    }

    pub fn as_u128(self) -> u128 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}
