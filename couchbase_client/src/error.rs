use bytes::Bytes;
use mcbp::{FrameError, Opcode, Status};
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything an operation can fail with. Key-addressed failures carry
/// the originating key so callers of bulk operations can tell which
/// document the error is about.
#[derive(Error, Debug)]
pub enum Error {
    #[error("key not found: {key:?}")]
    KeyNotFound { key: Bytes },

    #[error("item already exists: {key:?}")]
    ItemExists { key: Bytes },

    #[error("item is locked: {key:?}")]
    LockConflict { key: Bytes },

    #[error("stored value is not a counter: {key:?}")]
    TypeMismatch { key: Bytes },

    /// The contacted server disowned the key's vbucket. The router
    /// absorbs this by refreshing the topology; it only escapes when a
    /// node client is driven directly.
    #[error("contacted server does not own the vbucket for {key:?}")]
    NotMyVbucket { key: Bytes },

    /// The owner resolved from a freshly refreshed map still disowned
    /// the vbucket, or could not be reached at all.
    #[error("no reachable owner for {key:?}")]
    Topology { key: Bytes },

    #[error("bucket not found: {name}")]
    BucketNotFound { name: String },

    #[error("capability negotiation failed: {reason}")]
    Configuration { reason: String },

    #[error("operation timed out")]
    Timeout,

    #[error("frame decode failed")]
    Decode(#[from] FrameError),

    #[error("connection failed")]
    Connection(#[from] io::Error),

    #[error("server answered {opcode:?} with {status:?}")]
    UnexpectedStatus { opcode: Opcode, status: Status },
}

impl Error {
    /// Map a non-success response status onto the taxonomy. Statuses
    /// without a dedicated kind surface as [Error::UnexpectedStatus].
    pub(crate) fn from_status(status: Status, opcode: Opcode, key: &Bytes) -> Error {
        match status {
            Status::KeyNotFound => Error::KeyNotFound { key: key.clone() },
            Status::KeyExists => Error::ItemExists { key: key.clone() },
            Status::Locked => Error::LockConflict { key: key.clone() },
            Status::DeltaBadval => Error::TypeMismatch { key: key.clone() },
            Status::NotMyVbucket => Error::NotMyVbucket { key: key.clone() },
            status => Error::UnexpectedStatus { opcode, status },
        }
    }

    pub(crate) fn is_connection(&self) -> bool {
        matches!(self, Error::Connection(_))
    }
}
