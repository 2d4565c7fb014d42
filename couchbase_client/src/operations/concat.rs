use bytes::Bytes;
use mcbp::{Cas, Message, MessageBuilder, Opcode};

/// Append and prepend concatenate raw bytes onto an existing value,
/// preserving its flags and expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatKind {
    Append,
    Prepend,
}

impl From<ConcatKind> for Opcode {
    fn from(kind: ConcatKind) -> Opcode {
        match kind {
            ConcatKind::Append => Opcode::Append,
            ConcatKind::Prepend => Opcode::Prepend,
        }
    }
}

#[derive(Debug)]
pub struct ConcatRequest {
    pub kind: ConcatKind,
    pub key: Bytes,
    pub value: Bytes,
    pub vbucket: u16,
}

impl ConcatRequest {
    pub fn encode(&self) -> Message {
        MessageBuilder::new(self.kind.into())
            .key(self.key.clone())
            .value(self.value.clone())
            .vbucket(self.vbucket)
            .build()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConcatResponse {
    pub cas: Cas,
}

impl ConcatResponse {
    pub fn decode(resp: &Message) -> ConcatResponse {
        ConcatResponse { cas: resp.cas }
    }
}
