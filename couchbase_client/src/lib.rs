//! A vbucket-aware client for couchbase-style memcached clusters.
//!
//! [Cluster] remembers the seed addresses and credentials and hands out
//! [Bucket] handles. A bucket routes every operation to the node owning
//! the key's vbucket, and refreshes its topology map when the cluster
//! moves vbuckets around (a `NotMyVbucket` answer): one coalesced
//! refresh, one retry, then the error surfaces.
//!
//! ```no_run
//! use couchbase_client::Cluster;
//!
//! # fn main() -> couchbase_client::Result<()> {
//! let cluster = Cluster::connect(["127.0.0.1:11210"], "user", "pass");
//! let bucket = cluster.bucket("default")?;
//! bucket.set("greeting", 0, 0, "hello")?;
//! let doc = bucket.get("greeting")?;
//! assert_eq!(&doc.value[..], b"hello");
//! # Ok(())
//! # }
//! ```

pub mod bucket;
pub mod cluster;
pub mod config;
pub mod connection;
pub mod error;
pub mod node;
pub mod operations;
pub mod pool;
pub mod topology;

pub use bucket::{Bucket, BulkGetResult, GetResult};
pub use cluster::Cluster;
pub use config::{ClientConfig, Credentials};
pub use error::{Error, Result};
pub use node::NodeClient;
pub use topology::{CccpProvider, ClusterMap, MapSnapshot, Topology, TopologyProvider, Vbid};

pub use mcbp::{Cas, Status};
