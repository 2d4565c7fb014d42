use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The client opcodes this crate speaks. Key-value commands carry a
/// vbucket id; the bootstrap commands (Hello, SASL, SelectBucket,
/// GetClusterConfig) are connection-scoped and leave it zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    Get = 0x00,
    Set = 0x01,
    Add = 0x02,
    Replace = 0x03,
    Delete = 0x04,
    Increment = 0x05,
    Decrement = 0x06,
    Flush = 0x08,
    Noop = 0x0a,
    Version = 0x0b,
    Append = 0x0e,
    Prepend = 0x0f,
    Stat = 0x10,
    Touch = 0x1c,
    Gat = 0x1d,
    Hello = 0x1f,
    SaslListMechs = 0x20,
    SaslAuth = 0x21,
    SaslStep = 0x22,
    SelectBucket = 0x89,
    GetLocked = 0x94,
    UnlockKey = 0x95,
    GetClusterConfig = 0xb5,
}

impl Opcode {
    /// Commands that address a document and therefore route by vbucket.
    pub fn is_key_command(&self) -> bool {
        matches!(
            self,
            Opcode::Get
                | Opcode::Set
                | Opcode::Add
                | Opcode::Replace
                | Opcode::Delete
                | Opcode::Increment
                | Opcode::Decrement
                | Opcode::Append
                | Opcode::Prepend
                | Opcode::Touch
                | Opcode::Gat
                | Opcode::GetLocked
                | Opcode::UnlockKey
        )
    }

    /// Commands whose effect is the same when issued twice; the client
    /// may transparently retry these over a fresh connection.
    pub fn is_idempotent(&self) -> bool {
        matches!(self, Opcode::Get | Opcode::Gat | Opcode::Noop | Opcode::Version | Opcode::Stat)
    }
}
