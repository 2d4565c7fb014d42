use mcbp::{Message, MessageBuilder, Opcode};

/// Scopes the connection to one bucket; every key command after this
/// addresses that bucket's namespace.
#[derive(Debug)]
pub struct SelectBucketRequest {
    pub bucket: String,
}

impl SelectBucketRequest {
    pub fn encode(&self) -> Message {
        MessageBuilder::new(Opcode::SelectBucket)
            .key(self.bucket.clone())
            .build()
    }
}
