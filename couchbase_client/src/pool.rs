use crate::{
    config::{ClientConfig, Credentials},
    error::Result,
    node::NodeClient,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Lazily-established connections, one per server address, shared by
/// every operation routed through a bucket.
pub struct ConnectionPool {
    bucket: String,
    credentials: Credentials,
    config: ClientConfig,
    nodes: DashMap<String, Arc<Mutex<NodeClient>>>,
}

impl ConnectionPool {
    pub fn new(bucket: String, credentials: Credentials, config: ClientConfig) -> ConnectionPool {
        ConnectionPool {
            bucket,
            credentials,
            config,
            nodes: DashMap::new(),
        }
    }

    /// The pooled client for `address`, connecting and bootstrapping it
    /// first if needed. Two callers may race the connect; the later
    /// insert wins and the loser's connection is dropped.
    pub fn checkout(&self, address: &str) -> Result<Arc<Mutex<NodeClient>>> {
        if let Some(node) = self.nodes.get(address) {
            return Ok(node.clone());
        }
        debug!(address, bucket = %self.bucket, "opening pooled connection");
        let client = NodeClient::connect(
            address,
            &self.credentials,
            Some(&self.bucket),
            &self.config,
        )?;
        let node = Arc::new(Mutex::new(client));
        self.nodes.insert(address.to_string(), node.clone());
        Ok(node)
    }

    /// Forget a broken connection so the next checkout dials afresh.
    pub fn evict(&self, address: &str) {
        self.nodes.remove(address);
    }
}
