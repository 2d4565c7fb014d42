use bytes::{BufMut, Bytes, BytesMut};
use mcbp::{Cas, Message, MessageBuilder, Opcode};

/// The three storage flavours share framing and differ only in opcode
/// and failure condition: Add requires the key to be absent, Replace
/// requires it to be present, Set takes it either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Add,
    Set,
    Replace,
}

impl From<StoreKind> for Opcode {
    fn from(kind: StoreKind) -> Opcode {
        match kind {
            StoreKind::Add => Opcode::Add,
            StoreKind::Set => Opcode::Set,
            StoreKind::Replace => Opcode::Replace,
        }
    }
}

#[derive(Debug)]
pub struct StoreRequest {
    pub kind: StoreKind,
    pub key: Bytes,
    pub value: Bytes,
    /// Opaque caller tag describing the value encoding; stored and
    /// returned verbatim.
    pub flags: u32,
    /// Relative time-to-live in seconds; zero means no expiry.
    pub expiry: u32,
    pub vbucket: u16,
    /// Non-zero to make the store conditional on the current version.
    pub cas: Cas,
}

impl StoreRequest {
    pub fn encode(&self) -> Message {
        let mut extras = BytesMut::with_capacity(8);
        extras.put_u32(self.flags);
        extras.put_u32(self.expiry);
        MessageBuilder::new(self.kind.into())
            .key(self.key.clone())
            .value(self.value.clone())
            .extras(extras.freeze())
            .vbucket(self.vbucket)
            .cas(self.cas)
            .build()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StoreResponse {
    pub cas: Cas,
}

impl StoreResponse {
    pub fn decode(resp: &Message) -> StoreResponse {
        StoreResponse { cas: resp.cas }
    }
}
