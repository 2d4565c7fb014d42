use bytes::Bytes;
use mcbp::{Message, MessageBuilder, Opcode};

/// Requests a stat group (empty group means all stats). The server
/// answers with a stream of entries; the stream ends with an entry whose
/// key is empty.
#[derive(Debug)]
pub struct StatRequest {
    pub group: Bytes,
}

impl StatRequest {
    pub fn encode(&self) -> Message {
        MessageBuilder::new(Opcode::Stat)
            .key(self.group.clone())
            .build()
    }
}

#[derive(Debug, Clone)]
pub struct StatEntry {
    pub name: String,
    pub value: String,
}

impl StatEntry {
    pub fn decode(resp: &Message) -> StatEntry {
        StatEntry {
            name: String::from_utf8_lossy(&resp.key).into_owned(),
            value: String::from_utf8_lossy(&resp.value).into_owned(),
        }
    }

    /// The empty-key entry terminating a stat stream.
    pub fn is_last(&self) -> bool {
        self.name.is_empty()
    }
}
