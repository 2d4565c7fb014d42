use std::io;

use thiserror::Error;

/// Errors produced while encoding or decoding frames. These are distinct
/// from protocol-level error statuses, which arrive in well-formed
/// response frames and are surfaced by the layers above.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("invalid magic (0x{0:02x})")]
    InvalidMagic(u8),
    #[error("invalid opcode (0x{0:02x})")]
    InvalidOpcode(u8),
    #[error("invalid data type (0x{0:02x})")]
    InvalidDataType(u8),
    #[error("invalid feature (0x{0:04x})")]
    InvalidFeature(u16),
    #[error("frame section lengths are inconsistent")]
    LengthMismatch,
    #[error("status field requested on a request frame")]
    MissingStatus,
    #[error("vbucket field requested on a response frame")]
    MissingVbucket,
    #[error(transparent)]
    Io {
        #[from]
        source: io::Error,
    },
}
