use crate::{message::Specific, Cas, DataType, FrameError, Magic, Message, Opcode, Status};
use bytes::{Buf, BufMut, BytesMut};
use std::convert::TryFrom;
use tokio_util::codec::{Decoder, Encoder};

/// Length of the fixed header every frame starts with.
pub const HEADER_LEN: usize = 24;

/// Encoder/decoder for the Couchbase flavour of the memcached binary
/// protocol. Stateless; usable standalone over a [BytesMut] pair or
/// through the tokio-util framing traits.
#[derive(Clone, Copy, Default, Debug)]
pub struct Codec;

impl Codec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for Codec {
    type Item = Message;

    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            // Not enough data to read the header yet.
            return Ok(None);
        }

        let total_body = u32::from_be_bytes([src[8], src[9], src[10], src[11]]) as usize;
        if src.len() < HEADER_LEN + total_body {
            // The body has not fully arrived; grow the buffer up front so
            // the remaining reads land in one allocation.
            src.reserve(HEADER_LEN + total_body - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(HEADER_LEN + total_body);

        let magic_raw = frame.get_u8();
        let magic = Magic::try_from(magic_raw).map_err(|_| FrameError::InvalidMagic(magic_raw))?;
        let opcode_raw = frame.get_u8();
        let opcode =
            Opcode::try_from(opcode_raw).map_err(|_| FrameError::InvalidOpcode(opcode_raw))?;
        let (framing_extras_len, key_len) = if magic.is_alternative_encoding() {
            (frame.get_u8() as usize, frame.get_u8() as usize)
        } else {
            (0, frame.get_u16() as usize)
        };
        let extras_len = frame.get_u8() as usize;
        let data_type = DataType::try_from(frame.get_u8())?;
        let specific = if magic.is_request() {
            Specific::Vbucket(frame.get_u16())
        } else {
            Specific::Status(Status::from(frame.get_u16()))
        };
        // Total body length was consumed before the split.
        frame.advance(4);
        let opaque = frame.get_u32();
        let cas = Cas::from(frame.get_u64());

        if extras_len + framing_extras_len + key_len > total_body {
            return Err(FrameError::LengthMismatch);
        }

        let extras = frame.split_to(extras_len).freeze();
        let framing_extras = frame.split_to(framing_extras_len).freeze();
        let key = frame.split_to(key_len).freeze();
        let value = frame.freeze();

        Ok(Some(Message {
            magic,
            opcode,
            data_type,
            specific,
            opaque,
            cas,
            extras,
            framing_extras,
            key,
            value,
        }))
    }
}

impl Encoder<Message> for Codec {
    type Error = std::io::Error;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let total_body =
            item.extras.len() + item.framing_extras.len() + item.key.len() + item.value.len();
        dst.reserve(HEADER_LEN + total_body);

        dst.put_u8(item.magic.into());
        dst.put_u8(item.opcode.into());

        if item.magic.is_alternative_encoding() {
            dst.put_u8(item.framing_extras.len() as u8);
            dst.put_u8(item.key.len() as u8);
        } else {
            assert!(item.framing_extras.is_empty());
            dst.put_u16(item.key.len() as u16);
        }

        dst.put_u8(item.extras.len() as u8);
        dst.put_u8(item.data_type.into());

        match item.specific {
            Specific::Vbucket(vbucket) => dst.put_u16(vbucket),
            Specific::Status(status) => dst.put_u16(status.into()),
        }

        dst.put_u32(total_body as u32);
        dst.put_u32(item.opaque);
        dst.put_u64(item.cas.into());
        dst.put(item.extras);
        dst.put(item.framing_extras);
        dst.put(item.key);
        dst.put(item.value);

        Ok(())
    }
}
