use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Capabilities negotiated in the Hello exchange during bootstrap. The
/// server answers with the subset it supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum Feature {
    /// The connection may switch between buckets
    SelectBucket = 0x08,

    /// Values may travel snappy-compressed
    Snappy = 0x0a,

    /// The server detects and flags JSON values
    Json = 0x0b,

    /// Requests may use the alternative frame layout
    AltRequestSupport = 0x10,
}
