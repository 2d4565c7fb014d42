use num_enum::{FromPrimitive, IntoPrimitive};

/// Response status numbers. The set a server can answer with is open
/// ended; anything this crate does not know lands in [Status::Unknown]
/// rather than failing the decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum Status {
    /// The operation completed
    Success = 0x0000,

    /// The key does not exist
    KeyNotFound = 0x0001,

    /// The key exists, or exists with a CAS other than the one supplied
    KeyExists = 0x0002,

    /// The value exceeds what the server will store
    ValueTooLarge = 0x0003,

    /// The request was malformed at the protocol level
    InvalidArguments = 0x0004,

    /// The item was not stored (failed add/replace/append/prepend condition)
    NotStored = 0x0005,

    /// Increment/decrement on a value that is not an unsigned integer
    DeltaBadval = 0x0006,

    /// The contacted server does not own the vbucket; the topology map is stale
    NotMyVbucket = 0x0007,

    /// No bucket has been selected on this connection
    NoBucket = 0x0008,

    /// The document is locked by a get-and-lock
    Locked = 0x0009,

    /// Authentication failed
    AuthenticationError = 0x0020,

    /// Authentication requires another SASL step
    AuthContinue = 0x0021,

    /// The connection is not allowed to perform the command
    AccessError = 0x0024,

    UnknownCommand = 0x0081,
    OutOfMemory = 0x0082,
    Busy = 0x0085,
    TemporaryFailure = 0x0086,

    #[num_enum(catch_all)]
    Unknown(u16),
}

impl Default for Status {
    fn default() -> Self {
        Status::Success
    }
}

impl Status {
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success)
    }

    /// Statuses the server may clear on its own shortly; callers can
    /// reasonably back off and reissue.
    pub fn is_temporary(&self) -> bool {
        matches!(self, Status::Busy | Status::TemporaryFailure)
    }
}
