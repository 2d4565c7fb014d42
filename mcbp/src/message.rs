use crate::{Cas, DataType, FrameError, Magic, Opcode, Status};
use bytes::Bytes;

/// A full protocol frame, request or response. The byte sections are
/// reference-counted slices so a decoded frame can be taken apart
/// without copying.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Message {
    pub magic: Magic,
    pub opcode: Opcode,
    pub data_type: DataType,
    pub specific: Specific,
    pub opaque: u32,
    pub cas: Cas,
    pub extras: Bytes,
    pub framing_extras: Bytes,
    pub key: Bytes,
    pub value: Bytes,
}

/// The half-word at header offset 6 carries the vbucket id on requests
/// and the status on responses.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Specific {
    Vbucket(u16),
    Status(Status),
}

impl Message {
    /// The status of a response frame
    pub fn try_status(&self) -> Result<Status, FrameError> {
        match self.specific {
            Specific::Status(status) => Ok(status),
            Specific::Vbucket(_) => Err(FrameError::MissingStatus),
        }
    }

    /// The vbucket id of a request frame
    pub fn try_vbucket(&self) -> Result<u16, FrameError> {
        match self.specific {
            Specific::Vbucket(vbucket) => Ok(vbucket),
            Specific::Status(_) => Err(FrameError::MissingVbucket),
        }
    }
}

/// Builds a [Message] field by field. New builders default to a plain
/// client request; calling [MessageBuilder::status] turns the frame into
/// a response.
pub struct MessageBuilder {
    magic: Magic,
    opcode: Opcode,
    data_type: DataType,
    specific: Specific,
    opaque: u32,
    cas: Cas,
    extras: Bytes,
    framing_extras: Bytes,
    key: Bytes,
    value: Bytes,
}

impl MessageBuilder {
    pub fn new(opcode: Opcode) -> MessageBuilder {
        MessageBuilder {
            opcode,
            magic: Magic::default(),
            data_type: DataType::default(),
            specific: Specific::Vbucket(0),
            opaque: 0,
            cas: Cas::default(),
            extras: Bytes::new(),
            framing_extras: Bytes::new(),
            key: Bytes::new(),
            value: Bytes::new(),
        }
    }

    pub fn magic(mut self, magic: Magic) -> Self {
        self.magic = magic;
        self
    }

    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn vbucket(mut self, vbucket: u16) -> Self {
        self.specific = Specific::Vbucket(vbucket);
        self
    }

    /// Set the response status. Also flips the magic to the response
    /// form so the status cannot be framed as a vbucket id.
    pub fn status(mut self, status: Status) -> Self {
        self.magic = Magic::ClientResponse;
        self.specific = Specific::Status(status);
        self
    }

    pub fn opaque(mut self, opaque: u32) -> Self {
        self.opaque = opaque;
        self
    }

    pub fn cas(mut self, cas: Cas) -> Self {
        self.cas = cas;
        self
    }

    pub fn extras(mut self, extras: impl Into<Bytes>) -> Self {
        self.extras = extras.into();
        self
    }

    pub fn framing_extras(mut self, framing_extras: impl Into<Bytes>) -> Self {
        self.framing_extras = framing_extras.into();
        self
    }

    pub fn key(mut self, key: impl Into<Bytes>) -> Self {
        self.key = key.into();
        self
    }

    pub fn value(mut self, value: impl Into<Bytes>) -> Self {
        self.value = value.into();
        self
    }

    pub fn build(self) -> Message {
        Message {
            magic: self.magic,
            opcode: self.opcode,
            data_type: self.data_type,
            specific: self.specific,
            opaque: self.opaque,
            cas: self.cas,
            extras: self.extras,
            framing_extras: self.framing_extras,
            key: self.key,
            value: self.value,
        }
    }
}
