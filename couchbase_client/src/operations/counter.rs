use bytes::{Buf, BufMut, Bytes, BytesMut};
use mcbp::{Cas, FrameError, Message, MessageBuilder, Opcode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterKind {
    Increment,
    Decrement,
}

impl From<CounterKind> for Opcode {
    fn from(kind: CounterKind) -> Opcode {
        match kind {
            CounterKind::Increment => Opcode::Increment,
            CounterKind::Decrement => Opcode::Decrement,
        }
    }
}

/// Counter extras are 20 bytes: the delta, the value to seed an absent
/// key with, and the expiry applied on that seed. An expiry of
/// 0xffffffff makes an absent key an error instead.
#[derive(Debug)]
pub struct CounterRequest {
    pub kind: CounterKind,
    pub key: Bytes,
    pub delta: u64,
    pub initial: u64,
    pub expiry: u32,
    pub vbucket: u16,
}

impl CounterRequest {
    pub fn encode(&self) -> Message {
        let mut extras = BytesMut::with_capacity(20);
        extras.put_u64(self.delta);
        extras.put_u64(self.initial);
        extras.put_u32(self.expiry);
        MessageBuilder::new(self.kind.into())
            .key(self.key.clone())
            .extras(extras.freeze())
            .vbucket(self.vbucket)
            .build()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CounterResponse {
    /// The counter value after the operation.
    pub value: u64,
    pub cas: Cas,
}

impl CounterResponse {
    pub fn decode(resp: &Message) -> Result<CounterResponse, FrameError> {
        if resp.value.len() != 8 {
            return Err(FrameError::LengthMismatch);
        }
        let mut body = &resp.value[..];
        Ok(CounterResponse {
            value: body.get_u64(),
            cas: resp.cas,
        })
    }
}
