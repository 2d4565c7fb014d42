use bytes::{Buf, BufMut, BytesMut};
use mcbp::{Feature, Message, MessageBuilder, Opcode};
use tracing::warn;

/// Feature negotiation, the first exchange on a fresh connection. The
/// key names this agent; the value lists the features it would like.
#[derive(Debug)]
pub struct HelloRequest {
    pub user_agent: String,
    pub features: Vec<Feature>,
}

impl HelloRequest {
    pub fn default_features() -> Vec<Feature> {
        vec![Feature::SelectBucket, Feature::Json, Feature::AltRequestSupport]
    }

    pub fn encode(&self) -> Message {
        let mut value = BytesMut::with_capacity(self.features.len() * 2);
        for &feature in &self.features {
            value.put_u16(feature.into());
        }
        MessageBuilder::new(Opcode::Hello)
            .key(self.user_agent.clone())
            .value(value.freeze())
            .build()
    }
}

#[derive(Debug)]
pub struct HelloResponse {
    pub features: Vec<Feature>,
}

impl HelloResponse {
    pub fn decode(resp: &Message) -> HelloResponse {
        let mut value = &resp.value[..];
        let mut features = Vec::with_capacity(value.len() / 2);
        for _ in 0..value.len() / 2 {
            let raw = value.get_u16();
            match Feature::try_from(raw) {
                Ok(feature) => features.push(feature),
                Err(_) => warn!("unknown feature (0x{raw:04x})"),
            }
        }
        HelloResponse { features }
    }
}
