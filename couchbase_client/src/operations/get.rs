use bytes::{Buf, BufMut, Bytes, BytesMut};
use mcbp::{Cas, DataType, Message, MessageBuilder, Opcode};

#[derive(Debug)]
pub struct GetRequest {
    pub key: Bytes,
    pub vbucket: u16,
}

impl GetRequest {
    pub fn encode(&self) -> Message {
        MessageBuilder::new(Opcode::Get)
            .key(self.key.clone())
            .vbucket(self.vbucket)
            .build()
    }
}

/// get-and-lock: a get that also takes an exclusive lock for `lock_time`
/// seconds. Mutations that do not present the returned CAS fail with a
/// lock conflict until the lock expires or the key is unlocked.
#[derive(Debug)]
pub struct GetLockedRequest {
    pub key: Bytes,
    pub lock_time: u32,
    pub vbucket: u16,
}

impl GetLockedRequest {
    pub fn encode(&self) -> Message {
        let mut extras = BytesMut::with_capacity(4);
        extras.put_u32(self.lock_time);
        MessageBuilder::new(Opcode::GetLocked)
            .key(self.key.clone())
            .extras(extras.freeze())
            .vbucket(self.vbucket)
            .build()
    }
}

/// get-and-touch: a get that atomically replaces the expiry.
#[derive(Debug)]
pub struct GetAndTouchRequest {
    pub key: Bytes,
    pub expiry: u32,
    pub vbucket: u16,
}

impl GetAndTouchRequest {
    pub fn encode(&self) -> Message {
        let mut extras = BytesMut::with_capacity(4);
        extras.put_u32(self.expiry);
        MessageBuilder::new(Opcode::Gat)
            .key(self.key.clone())
            .extras(extras.freeze())
            .vbucket(self.vbucket)
            .build()
    }
}

/// Releases a get-and-lock lock; the CAS must be the one the lock
/// handed out.
#[derive(Debug)]
pub struct UnlockRequest {
    pub key: Bytes,
    pub cas: Cas,
    pub vbucket: u16,
}

impl UnlockRequest {
    pub fn encode(&self) -> Message {
        MessageBuilder::new(Opcode::UnlockKey)
            .key(self.key.clone())
            .cas(self.cas)
            .vbucket(self.vbucket)
            .build()
    }
}

/// Response shape shared by the whole get family.
#[derive(Debug, Clone)]
pub struct GetResponse {
    pub flags: u32,
    pub cas: Cas,
    pub data_type: DataType,
    pub value: Bytes,
}

impl GetResponse {
    pub fn decode(resp: &Message) -> GetResponse {
        let mut extras = &resp.extras[..];
        let flags = if extras.len() >= 4 { extras.get_u32() } else { 0 };
        GetResponse {
            flags,
            cas: resp.cas,
            data_type: resp.data_type,
            value: resp.value.clone(),
        }
    }
}
