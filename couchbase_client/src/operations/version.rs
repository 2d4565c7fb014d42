use mcbp::{Message, MessageBuilder, Opcode};

#[derive(Debug)]
pub struct VersionRequest;

impl VersionRequest {
    pub fn encode(&self) -> Message {
        MessageBuilder::new(Opcode::Version).build()
    }
}

#[derive(Debug, Clone)]
pub struct VersionResponse {
    pub version: String,
}

impl VersionResponse {
    pub fn decode(resp: &Message) -> VersionResponse {
        VersionResponse {
            version: String::from_utf8_lossy(&resp.value).into_owned(),
        }
    }
}
