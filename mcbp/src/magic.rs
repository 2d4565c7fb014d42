use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Magic identifies the kind of frame and which header layout it uses.
/// The alternative encodings trade two bytes of key length for a framing
/// extras section.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Magic {
    #[default]
    ClientRequest = 0x80,
    AltClientRequest = 0x08,
    ClientResponse = 0x81,
    AltClientResponse = 0x18,
}

impl Magic {
    pub fn is_request(&self) -> bool {
        matches!(self, Magic::ClientRequest | Magic::AltClientRequest)
    }

    pub fn is_response(&self) -> bool {
        !self.is_request()
    }

    /// Is the frame using the alternative layout with framing extras
    pub fn is_alternative_encoding(&self) -> bool {
        matches!(self, Magic::AltClientRequest | Magic::AltClientResponse)
    }
}
