use bytes::Bytes;
use mcbp::{Cas, Message, MessageBuilder, Opcode};

#[derive(Debug)]
pub struct DeleteRequest {
    pub key: Bytes,
    pub vbucket: u16,
}

impl DeleteRequest {
    pub fn encode(&self) -> Message {
        MessageBuilder::new(Opcode::Delete)
            .key(self.key.clone())
            .vbucket(self.vbucket)
            .build()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteResponse {
    pub cas: Cas,
}

impl DeleteResponse {
    pub fn decode(resp: &Message) -> DeleteResponse {
        DeleteResponse { cas: resp.cas }
    }
}
