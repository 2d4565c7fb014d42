//! Request and response framing for each operation the client issues.
//! Requests build [mcbp::Message]s; responses are decoded after the node
//! client has already turned non-success statuses into errors.

pub mod cluster_config;
pub mod concat;
pub mod counter;
pub mod flush;
pub mod get;
pub mod hello;
pub mod remove;
pub mod sasl;
pub mod select_bucket;
pub mod stat;
pub mod store;
pub mod touch;
pub mod version;

/// Key to vbucket hash for CRC-mapped buckets: the top half of the crc32
/// with the sign bit cleared, folded onto the table size.
pub fn vbucket_hash(key: &[u8], num_vbuckets: u16) -> u16 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(key);
    let crc = hasher.finalize();
    (((crc >> 16) & 0x7fff) % num_vbuckets as u32) as u16
}
