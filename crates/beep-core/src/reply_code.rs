/// BEEP reply codes (RFC 3080 §8), the subset this core round-trips through
/// `error` and `close` CMP elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ReplyCode {
    Success = 200,
    ServiceNotAvailable = 421,
    RequestedActionNotTaken = 450,
    RequestedActionAborted = 451,
    TemporaryAuthenticationFailure = 454,
    GeneralSyntaxError = 500,
    SyntaxErrorInParameters = 501,
    ParameterNotImplemented = 504,
    AuthenticationRequired = 530,
    AuthenticationMechanismInsufficient = 534,
    AuthenticationFailure = 535,
    ActionNotAuthorizedForUser = 537,
    AuthenticationMechanismRequiresEncryption = 538,
    RequestedActionNotAccepted = 550,
    ParameterInvalid = 553,
    TransactionFailed = 554,
}

impl ReplyCode {
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Maps a wire reply code back to its symbolic form, if recognized.
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            200 => ReplyCode::Success,
            421 => ReplyCode::ServiceNotAvailable,
            450 => ReplyCode::RequestedActionNotTaken,
            451 => ReplyCode::RequestedActionAborted,
            454 => ReplyCode::TemporaryAuthenticationFailure,
            500 => ReplyCode::GeneralSyntaxError,
            501 => ReplyCode::SyntaxErrorInParameters,
            504 => ReplyCode::ParameterNotImplemented,
            530 => ReplyCode::AuthenticationRequired,
            534 => ReplyCode::AuthenticationMechanismInsufficient,
            535 => ReplyCode::AuthenticationFailure,
            537 => ReplyCode::ActionNotAuthorizedForUser,
            538 => ReplyCode::AuthenticationMechanismRequiresEncryption,
            550 => ReplyCode::RequestedActionNotAccepted,
            553 => ReplyCode::ParameterInvalid,
            554 => ReplyCode::TransactionFailed,
            _ => return None,
        })
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}
