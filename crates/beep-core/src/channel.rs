/// One entry in the channel table: identity plus the monotonic counters that
/// drive outgoing message/sequence/answer numbering.
#[derive(Debug, Clone)]
pub struct Channel {
    pub number: u32,
    /// Empty for the tuning channel; the bound profile URI otherwise.
    pub profile: Option<String>,
    next_msgno: u32,
    next_seqno: u32,
    next_ansno: u32,
}

impl Channel {
    pub fn new(number: u32, profile: Option<String>) -> Self {
        Self { number, profile, next_msgno: 0, next_seqno: 0, next_ansno: 0 }
    }

    /// Channel 0 only: msgno 0 is implicitly consumed by the greeting RPY
    /// (RFC 3080 §2.3.1.1), so the first locally initiated tuning MSG must
    /// start at 1.
    pub fn new_tuning() -> Self {
        Self { number: 0, profile: None, next_msgno: 1, next_seqno: 0, next_ansno: 0 }
    }

    /// Stamps the next outgoing message number and advances the counter
    /// (mod 2^31, per the wire's `msgno` range).
    pub fn next_message_number(&mut self) -> u32 {
        let msgno = self.next_msgno;
        self.next_msgno = self.next_msgno.wrapping_add(1) & (u32::MAX >> 1);
        msgno
    }

    /// Stamps the current outgoing sequence number and advances it by
    /// `payload_len` octets (mod 2^32).
    pub fn advance_sequence(&mut self, payload_len: usize) -> u32 {
        let seqno = self.next_seqno;
        self.next_seqno = self.next_seqno.wrapping_add(payload_len as u32);
        seqno
    }

    pub fn next_answer_number(&mut self) -> u32 {
        let ansno = self.next_ansno;
        self.next_ansno = self.next_ansno.wrapping_add(1);
        ansno
    }
}
