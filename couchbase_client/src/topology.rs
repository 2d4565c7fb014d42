use crate::{
    config::{ClientConfig, Credentials},
    error::{Error, Result},
    node::NodeClient,
    operations::{cluster_config::ClusterConfig, vbucket_hash},
};
use parking_lot::{Mutex, RwLock};
use std::{
    fmt::{self, Display},
    sync::Arc,
};
use tracing::{info, warn};

/// Identifier of one logical partition of a bucket's keyspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Vbid(u16);

impl Vbid {
    pub fn new(id: u16) -> Self {
        Self(id)
    }
}

impl From<Vbid> for u16 {
    fn from(vbid: Vbid) -> Self {
        vbid.0
    }
}

impl From<Vbid> for usize {
    fn from(vbid: Vbid) -> Self {
        vbid.0 as usize
    }
}

impl From<u16> for Vbid {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

impl Display for Vbid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One version of a bucket's layout: the server list plus the
/// vbucket-to-server assignment. Immutable once built; the cluster map
/// swaps whole snapshots so a reader never sees half an update.
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    bucket: String,
    rev: u32,
    servers: Vec<String>,
    vbucket_owners: Vec<u16>,
}

impl Topology {
    pub fn new(
        bucket: impl Into<String>,
        rev: u32,
        servers: Vec<String>,
        vbucket_owners: Vec<u16>,
    ) -> Result<Topology> {
        if servers.is_empty() || vbucket_owners.is_empty() {
            return Err(Error::Configuration {
                reason: "topology needs at least one server and one vbucket".to_string(),
            });
        }
        if let Some(bad) = vbucket_owners.iter().find(|&&o| o as usize >= servers.len()) {
            return Err(Error::Configuration {
                reason: format!("vbucket owner index {bad} out of range"),
            });
        }
        Ok(Topology {
            bucket: bucket.into(),
            rev,
            servers,
            vbucket_owners,
        })
    }

    /// Build from the config JSON a node publishes. Every vbucket must
    /// have an active owner.
    pub fn from_config(bucket: &str, config: &ClusterConfig) -> Result<Topology> {
        let map = config
            .v_bucket_server_map
            .as_ref()
            .ok_or_else(|| Error::Configuration {
                reason: "cluster config carries no vbucket server map".to_string(),
            })?;
        let owners = map
            .v_bucket_map
            .iter()
            .enumerate()
            .map(|(vb, chain)| match chain.first() {
                Some(&owner) if owner >= 0 && (owner as usize) < map.server_list.len() => {
                    Ok(owner as u16)
                }
                _ => Err(Error::Configuration {
                    reason: format!("vbucket {vb} has no active owner"),
                }),
            })
            .collect::<Result<Vec<u16>>>()?;
        Topology::new(bucket, config.rev, map.server_list.clone(), owners)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn rev(&self) -> u32 {
        self.rev
    }

    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    pub fn num_vbuckets(&self) -> u16 {
        self.vbucket_owners.len() as u16
    }

    pub fn vbucket_for(&self, key: &[u8]) -> Vbid {
        Vbid(vbucket_hash(key, self.num_vbuckets()))
    }

    pub fn owner(&self, vbucket: Vbid) -> &str {
        &self.servers[self.vbucket_owners[usize::from(vbucket)] as usize]
    }
}

/// Source of fresh topology for a bucket: the administrative side of the
/// cluster reduced to the one call the map consumes.
pub trait TopologyProvider: Send + Sync {
    fn fetch(&self, bucket: &str) -> Result<Topology>;
}

/// The installed topology plus a local generation stamp. The stamp
/// orders installs even when the cluster leaves its config revision
/// unchanged.
#[derive(Clone)]
pub struct MapSnapshot {
    pub generation: u64,
    pub topology: Arc<Topology>,
}

/// Holds the current topology snapshot and refreshes it on demand.
/// Readers clone the snapshot and proceed on it; a refresh installs a
/// whole new snapshot atomically.
pub struct ClusterMap {
    bucket: String,
    provider: Box<dyn TopologyProvider>,
    current: RwLock<MapSnapshot>,
    refresh_lock: Mutex<()>,
}

impl ClusterMap {
    pub fn bootstrap(bucket: &str, provider: Box<dyn TopologyProvider>) -> Result<ClusterMap> {
        let topology = provider.fetch(bucket)?;
        info!(bucket, rev = topology.rev(), servers = topology.servers().len(), "initial topology");
        Ok(ClusterMap {
            bucket: bucket.to_string(),
            provider,
            current: RwLock::new(MapSnapshot {
                generation: 0,
                topology: Arc::new(topology),
            }),
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn snapshot(&self) -> MapSnapshot {
        self.current.read().clone()
    }

    /// Install a fresh topology, unless another caller already has since
    /// the calling operation took its snapshot. Concurrent callers
    /// serialize on the refresh lock; all but the first find the
    /// generation advanced and return the map the first one installed,
    /// so one stale observation window costs exactly one fetch.
    pub fn refresh(&self, observed_generation: u64) -> Result<MapSnapshot> {
        let _guard = self.refresh_lock.lock();
        let current = self.snapshot();
        if current.generation > observed_generation {
            return Ok(current);
        }
        let fresh = Arc::new(self.provider.fetch(&self.bucket)?);
        info!(bucket = %self.bucket, rev = fresh.rev(), servers = fresh.servers().len(), "installed topology");
        let snapshot = MapSnapshot {
            generation: current.generation + 1,
            topology: fresh,
        };
        *self.current.write() = snapshot.clone();
        Ok(snapshot)
    }
}

/// Fetches the bucket config over the data connection itself, the way
/// couchbase nodes publish topology on the kv port. Seeds are tried in
/// order until one answers.
pub struct CccpProvider {
    seeds: Vec<String>,
    credentials: Credentials,
    config: ClientConfig,
}

impl CccpProvider {
    pub fn new(seeds: Vec<String>, credentials: Credentials, config: ClientConfig) -> CccpProvider {
        CccpProvider {
            seeds,
            credentials,
            config,
        }
    }

    fn fetch_from(&self, seed: &str, bucket: &str) -> Result<Topology> {
        let mut node = NodeClient::connect(seed, &self.credentials, Some(bucket), &self.config)?;
        let config = node.cluster_config()?;
        Topology::from_config(bucket, &config)
    }
}

impl TopologyProvider for CccpProvider {
    fn fetch(&self, bucket: &str) -> Result<Topology> {
        let mut last = Error::Configuration {
            reason: "no seed addresses".to_string(),
        };
        for seed in &self.seeds {
            match self.fetch_from(seed, bucket) {
                Ok(topology) => return Ok(topology),
                // A bucket the cluster does not know is not going to
                // appear on another seed.
                Err(e @ Error::BucketNotFound { .. }) => return Err(e),
                Err(e) => {
                    warn!(seed = %seed, error = %e, "seed did not yield a config");
                    last = e;
                }
            }
        }
        Err(last)
    }
}
