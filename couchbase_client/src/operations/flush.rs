use mcbp::{Message, MessageBuilder, Opcode};

/// Drops every item on the connected node. Test isolation only; not
/// part of the steady-state contract.
#[derive(Debug)]
pub struct FlushRequest;

impl FlushRequest {
    pub fn encode(&self) -> Message {
        MessageBuilder::new(Opcode::Flush).build()
    }
}
