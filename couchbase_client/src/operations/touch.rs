use bytes::{BufMut, Bytes, BytesMut};
use mcbp::{Cas, Message, MessageBuilder, Opcode};

/// Touch replaces a document's expiry without reading or writing its
/// value.
#[derive(Debug)]
pub struct TouchRequest {
    pub key: Bytes,
    pub expiry: u32,
    pub vbucket: u16,
}

impl TouchRequest {
    pub fn encode(&self) -> Message {
        let mut extras = BytesMut::with_capacity(4);
        extras.put_u32(self.expiry);
        MessageBuilder::new(Opcode::Touch)
            .key(self.key.clone())
            .extras(extras.freeze())
            .vbucket(self.vbucket)
            .build()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TouchResponse {
    pub cas: Cas,
}

impl TouchResponse {
    pub fn decode(resp: &Message) -> TouchResponse {
        TouchResponse { cas: resp.cas }
    }
}
