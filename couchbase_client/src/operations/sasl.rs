use bytes::{BufMut, BytesMut};
use mcbp::{Message, MessageBuilder, Opcode};
use std::collections::BTreeSet;

#[derive(Debug)]
pub struct SaslListMechsRequest;

impl SaslListMechsRequest {
    pub fn encode(&self) -> Message {
        MessageBuilder::new(Opcode::SaslListMechs).build()
    }
}

#[derive(Debug, Clone)]
pub struct SaslListMechsResponse {
    pub mechanisms: BTreeSet<String>,
}

impl SaslListMechsResponse {
    pub fn decode(resp: &Message) -> SaslListMechsResponse {
        let mechanisms = String::from_utf8_lossy(&resp.value)
            .split_whitespace()
            .map(str::to_string)
            .collect();
        SaslListMechsResponse { mechanisms }
    }
}

pub enum SaslAuthRequest {
    Plain { username: String, password: String },
}

impl SaslAuthRequest {
    pub fn encode(&self) -> Message {
        let mut builder = MessageBuilder::new(Opcode::SaslAuth);
        match self {
            SaslAuthRequest::Plain { username, password } => {
                let value = {
                    let mut bytes = BytesMut::with_capacity(2 + username.len() + password.len());
                    bytes.put_u8(0);
                    bytes.put(username.as_bytes());
                    bytes.put_u8(0);
                    bytes.put(password.as_bytes());
                    bytes.freeze()
                };
                builder = builder.key("PLAIN").value(value);
            }
        }
        builder.build()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use mcbp::Status;

    #[test]
    fn test_mechanisms_parse_as_a_set() {
        let resp = MessageBuilder::new(Opcode::SaslListMechs)
            .status(Status::Success)
            .value("SCRAM-SHA1 PLAIN PLAIN")
            .build();
        let decoded = SaslListMechsResponse::decode(&resp);
        assert_eq!(decoded.mechanisms.len(), 2);
        assert!(decoded.mechanisms.contains("PLAIN"));
    }

    #[test]
    fn test_plain_auth_value_is_nul_separated() {
        let message = SaslAuthRequest::Plain {
            username: "user".to_string(),
            password: "pass".to_string(),
        }
        .encode();
        assert_eq!(&message.key[..], b"PLAIN");
        assert_eq!(&message.value[..], b"\0user\0pass");
    }
}
