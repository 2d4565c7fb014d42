use crate::{
    bucket::Bucket,
    config::{ClientConfig, Credentials},
    error::Result,
    topology::CccpProvider,
};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

/// Entry point: holds the seed addresses and credentials and hands out
/// routed bucket handles. The handle owns the bucket registry — lookup
/// is explicit and by name, there is no ambient global state.
pub struct Cluster {
    seeds: Vec<String>,
    credentials: Credentials,
    config: ClientConfig,
    buckets: DashMap<String, Arc<Bucket>>,
}

impl Cluster {
    /// Remember how to reach the cluster. Connections are dialled
    /// lazily, per bucket, on the first [Cluster::bucket] call.
    pub fn connect<I, S>(seeds: I, username: &str, password: &str) -> Cluster
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Cluster::connect_with(seeds, username, password, ClientConfig::default())
    }

    pub fn connect_with<I, S>(
        seeds: I,
        username: &str,
        password: &str,
        config: ClientConfig,
    ) -> Cluster
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Cluster {
            seeds: seeds.into_iter().map(Into::into).collect(),
            credentials: Credentials::new(username, password),
            config,
            buckets: DashMap::new(),
        }
    }

    /// Open (or return the already-open) handle for a bucket. Fails with
    /// [BucketNotFound] when the cluster does not know the name.
    ///
    /// [BucketNotFound]: crate::error::Error::BucketNotFound
    pub fn bucket(&self, name: &str) -> Result<Arc<Bucket>> {
        if let Some(bucket) = self.buckets.get(name) {
            return Ok(bucket.clone());
        }
        let provider = CccpProvider::new(
            self.seeds.clone(),
            self.credentials.clone(),
            self.config.clone(),
        );
        let bucket = Bucket::open(
            name,
            Box::new(provider),
            self.credentials.clone(),
            self.config.clone(),
        )?;
        info!(bucket = name, "opened bucket");
        self.buckets.insert(name.to_string(), bucket.clone());
        Ok(bucket)
    }
}
