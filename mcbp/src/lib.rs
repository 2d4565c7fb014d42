pub mod cas;
pub mod codec;
pub mod data_type;
pub mod error;
pub mod feature;
pub mod magic;
pub mod message;
pub mod opcode;
pub mod status;

pub use cas::Cas;
pub use codec::Codec;
pub use data_type::DataType;
pub use error::FrameError;
pub use feature::Feature;
pub use magic::Magic;
pub use message::{Message, MessageBuilder, Specific};
pub use opcode::Opcode;
pub use status::Status;
