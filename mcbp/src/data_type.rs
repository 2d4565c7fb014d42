use crate::error::FrameError;
use bitflags::bitflags;
use std::convert::TryFrom;

bitflags! {
    /// Hints about the value encoding, negotiated during Hello. Callers
    /// that do their own serialization leave this RAW and use the item
    /// flags instead.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DataType: u8 {
        const RAW = 0x00;
        const JSON = 0x01;
        const SNAPPY = 0x02;
    }
}

impl Default for DataType {
    fn default() -> Self {
        DataType::RAW
    }
}

impl DataType {
    pub fn is_compressed(&self) -> bool {
        self.contains(DataType::SNAPPY)
    }
}

impl TryFrom<u8> for DataType {
    type Error = FrameError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        DataType::from_bits(bits).ok_or(FrameError::InvalidDataType(bits))
    }
}

impl From<DataType> for u8 {
    fn from(data_type: DataType) -> Self {
        data_type.bits()
    }
}
