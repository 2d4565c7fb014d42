use crate::{
    config::{ClientConfig, Credentials},
    error::{Error, Result},
    node::NodeClient,
    operations::{
        concat::ConcatKind,
        counter::CounterKind,
        get::GetResponse,
        store::StoreKind,
    },
    pool::ConnectionPool,
    topology::{ClusterMap, MapSnapshot, TopologyProvider, Vbid},
};
use bytes::Bytes;
use mcbp::Cas;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A document as the get family returns it.
#[derive(Debug, Clone)]
pub struct GetResult {
    pub flags: u32,
    pub cas: Cas,
    pub value: Bytes,
}

impl From<GetResponse> for GetResult {
    fn from(resp: GetResponse) -> GetResult {
        GetResult {
            flags: resp.flags,
            cas: resp.cas,
            value: resp.value,
        }
    }
}

/// Outcome of a bulk get: whatever was found, plus an error per key
/// whose owner failed. Misses appear in neither map.
#[derive(Debug, Default)]
pub struct BulkGetResult {
    pub found: HashMap<Bytes, GetResult>,
    pub errors: HashMap<Bytes, Arc<Error>>,
}

/// A routed handle to one bucket. Each operation resolves the key's
/// vbucket owner from the current topology snapshot and dispatches to
/// that node; a NotMyVbucket answer triggers one coalesced map refresh
/// and one retry.
pub struct Bucket {
    name: String,
    map: ClusterMap,
    pool: ConnectionPool,
}

impl std::fmt::Debug for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket").field("name", &self.name).finish()
    }
}

impl Bucket {
    /// Bootstrap a routed bucket from any topology source. [Cluster]
    /// wires up the cccp provider; tests substitute their own.
    ///
    /// [Cluster]: crate::cluster::Cluster
    pub fn open(
        name: &str,
        provider: Box<dyn TopologyProvider>,
        credentials: Credentials,
        config: ClientConfig,
    ) -> Result<Arc<Bucket>> {
        let map = ClusterMap::bootstrap(name, provider)?;
        let pool = ConnectionPool::new(name.to_string(), credentials, config);
        Ok(Arc::new(Bucket {
            name: name.to_string(),
            map,
            pool,
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: impl Into<Bytes>) -> Result<GetResult> {
        let key = key.into();
        self.dispatch(&key, &|node, vb| node.get(vb, &key))
            .map(GetResult::from)
    }

    pub fn get_and_touch(&self, key: impl Into<Bytes>, expiry: u32) -> Result<GetResult> {
        let key = key.into();
        self.dispatch(&key, &|node, vb| node.get_and_touch(vb, &key, expiry))
            .map(GetResult::from)
    }

    pub fn get_and_lock(&self, key: impl Into<Bytes>, lock_time: u32) -> Result<GetResult> {
        let key = key.into();
        self.dispatch(&key, &|node, vb| node.get_and_lock(vb, &key, lock_time))
            .map(GetResult::from)
    }

    pub fn unlock(&self, key: impl Into<Bytes>, cas: Cas) -> Result<()> {
        let key = key.into();
        self.dispatch(&key, &|node, vb| node.unlock(vb, &key, cas))
    }

    pub fn set(&self, key: impl Into<Bytes>, flags: u32, expiry: u32, value: impl Into<Bytes>) -> Result<Cas> {
        self.store(StoreKind::Set, key, flags, expiry, value)
    }

    pub fn add(&self, key: impl Into<Bytes>, flags: u32, expiry: u32, value: impl Into<Bytes>) -> Result<Cas> {
        self.store(StoreKind::Add, key, flags, expiry, value)
    }

    pub fn replace(&self, key: impl Into<Bytes>, flags: u32, expiry: u32, value: impl Into<Bytes>) -> Result<Cas> {
        self.store(StoreKind::Replace, key, flags, expiry, value)
    }

    fn store(
        &self,
        kind: StoreKind,
        key: impl Into<Bytes>,
        flags: u32,
        expiry: u32,
        value: impl Into<Bytes>,
    ) -> Result<Cas> {
        let key = key.into();
        let value = value.into();
        self.dispatch(&key, &|node, vb| {
            node.store(vb, kind, &key, flags, expiry, value.clone(), Cas::default())
        })
    }

    pub fn append(&self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Result<Cas> {
        self.concat(ConcatKind::Append, key, value)
    }

    pub fn prepend(&self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Result<Cas> {
        self.concat(ConcatKind::Prepend, key, value)
    }

    fn concat(&self, kind: ConcatKind, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Result<Cas> {
        let key = key.into();
        let value = value.into();
        self.dispatch(&key, &|node, vb| node.concat(vb, kind, &key, value.clone()))
    }

    pub fn delete(&self, key: impl Into<Bytes>) -> Result<()> {
        let key = key.into();
        self.dispatch(&key, &|node, vb| node.delete(vb, &key))?;
        Ok(())
    }

    pub fn touch(&self, key: impl Into<Bytes>, expiry: u32) -> Result<Cas> {
        let key = key.into();
        self.dispatch(&key, &|node, vb| node.touch(vb, &key, expiry))
    }

    /// Add `delta` to a counter, seeding an absent key with zero.
    pub fn incr(&self, key: impl Into<Bytes>, delta: u64) -> Result<u64> {
        self.counter(CounterKind::Increment, key, delta, 0, 0)
    }

    /// Subtract `delta` from a counter, flooring at zero.
    pub fn decr(&self, key: impl Into<Bytes>, delta: u64) -> Result<u64> {
        self.counter(CounterKind::Decrement, key, delta, 0, 0)
    }

    pub fn incr_with(&self, key: impl Into<Bytes>, delta: u64, initial: u64, expiry: u32) -> Result<u64> {
        self.counter(CounterKind::Increment, key, delta, initial, expiry)
    }

    pub fn decr_with(&self, key: impl Into<Bytes>, delta: u64, initial: u64, expiry: u32) -> Result<u64> {
        self.counter(CounterKind::Decrement, key, delta, initial, expiry)
    }

    fn counter(
        &self,
        kind: CounterKind,
        key: impl Into<Bytes>,
        delta: u64,
        initial: u64,
        expiry: u32,
    ) -> Result<u64> {
        let key = key.into();
        self.dispatch(&key, &|node, vb| {
            node.counter(vb, kind, &key, delta, initial, expiry)
        })
        .map(|(value, _)| value)
    }

    /// Fetch many keys at once. Keys are grouped per owning server from
    /// one topology snapshot and the batches run concurrently; one
    /// owner's failure marks only its keys, results from the others are
    /// kept.
    pub fn get_multi<I, K>(&self, keys: I) -> BulkGetResult
    where
        I: IntoIterator<Item = K>,
        K: Into<Bytes>,
    {
        let mut result = BulkGetResult::default();
        let mut pending: Vec<Bytes> = keys.into_iter().map(Into::into).collect();
        let mut snapshot = self.map.snapshot();
        let mut refreshed = false;

        while !pending.is_empty() {
            let batches = group_by_owner(&snapshot, &pending);
            pending.clear();

            for (keys_of_batch, outcome) in self.run_batches(batches) {
                match outcome {
                    Ok(found) => {
                        result
                            .found
                            .extend(found.into_iter().map(|(k, v)| (k, GetResult::from(v))));
                    }
                    Err(Error::NotMyVbucket { .. }) if !refreshed => {
                        pending.extend(keys_of_batch);
                    }
                    Err(Error::NotMyVbucket { .. }) | Err(Error::Topology { .. }) => {
                        for key in keys_of_batch {
                            let error = Arc::new(Error::Topology { key: key.clone() });
                            result.errors.insert(key, error);
                        }
                    }
                    Err(e) => {
                        let error = Arc::new(e);
                        for key in keys_of_batch {
                            result.errors.insert(key, error.clone());
                        }
                    }
                }
            }

            if !pending.is_empty() {
                match self.map.refresh(snapshot.generation) {
                    Ok(fresh) => {
                        snapshot = fresh;
                        refreshed = true;
                    }
                    Err(e) => {
                        let error = Arc::new(e);
                        for key in pending.drain(..) {
                            result.errors.insert(key, error.clone());
                        }
                    }
                }
            }
        }
        result
    }

    /// Clear every node in the current snapshot. Test isolation only.
    pub fn flush(&self) -> Result<()> {
        let snapshot = self.map.snapshot();
        for server in snapshot.topology.servers() {
            let node = self.pool.checkout(server)?;
            node.lock().flush()?;
        }
        Ok(())
    }

    /// Per-server stat maps for one stat group.
    pub fn stats(&self, group: &str) -> Result<HashMap<String, HashMap<String, String>>> {
        let snapshot = self.map.snapshot();
        let mut all = HashMap::new();
        for server in snapshot.topology.servers() {
            let node = self.pool.checkout(server)?;
            let stats = node.lock().stats(group)?;
            all.insert(server.clone(), stats);
        }
        Ok(all)
    }

    fn dispatch<T>(
        &self,
        key: &Bytes,
        op: &dyn Fn(&mut NodeClient, Vbid) -> Result<T>,
    ) -> Result<T> {
        let snapshot = self.map.snapshot();
        match self.try_once(&snapshot, key, op) {
            Err(Error::NotMyVbucket { .. }) => {
                debug!(key = ?key, "stale vbucket map, refreshing");
                let snapshot = self.map.refresh(snapshot.generation)?;
                match self.try_once(&snapshot, key, op) {
                    Err(Error::NotMyVbucket { .. }) => Err(Error::Topology { key: key.clone() }),
                    other => other,
                }
            }
            other => other,
        }
    }

    fn try_once<T>(
        &self,
        snapshot: &MapSnapshot,
        key: &Bytes,
        op: &dyn Fn(&mut NodeClient, Vbid) -> Result<T>,
    ) -> Result<T> {
        let vbucket = snapshot.topology.vbucket_for(key);
        let server = snapshot.topology.owner(vbucket).to_string();
        let node = match self.pool.checkout(&server) {
            Ok(node) => node,
            // An unreachable owner is a routing problem, not the
            // caller's connection.
            Err(Error::Connection(_)) | Err(Error::Timeout) => {
                return Err(Error::Topology { key: key.clone() })
            }
            Err(e) => return Err(e),
        };
        let result = op(&mut node.lock(), vbucket);
        if let Err(e) = &result {
            if e.is_connection() {
                self.pool.evict(&server);
            }
        }
        result
    }

    fn run_batches(
        &self,
        batches: Vec<(String, Vec<(Vbid, Bytes)>)>,
    ) -> Vec<(Vec<Bytes>, Result<HashMap<Bytes, GetResponse>>)> {
        crossbeam_utils::thread::scope(|scope| {
            let handles: Vec<_> = batches
                .iter()
                .map(|(server, batch)| scope.spawn(move |_| self.run_batch(server, batch)))
                .collect();
            handles
                .into_iter()
                .zip(batches.iter())
                .map(|(handle, (_, batch))| {
                    let keys = batch.iter().map(|(_, key)| key.clone()).collect();
                    (keys, handle.join().expect("batch thread panicked"))
                })
                .collect()
        })
        .expect("fan-out scope panicked")
    }

    fn run_batch(
        &self,
        server: &str,
        batch: &[(Vbid, Bytes)],
    ) -> Result<HashMap<Bytes, GetResponse>> {
        let node = match self.pool.checkout(server) {
            Ok(node) => node,
            Err(Error::Connection(_)) | Err(Error::Timeout) => {
                return Err(Error::Topology {
                    key: batch[0].1.clone(),
                })
            }
            Err(e) => return Err(e),
        };
        let result = node.lock().get_multi(batch);
        if let Err(e) = &result {
            if e.is_connection() {
                self.pool.evict(server);
            }
        }
        result
    }
}

fn group_by_owner(snapshot: &MapSnapshot, keys: &[Bytes]) -> Vec<(String, Vec<(Vbid, Bytes)>)> {
    let mut batches: HashMap<&str, Vec<(Vbid, Bytes)>> = HashMap::new();
    for key in keys {
        let vbucket = snapshot.topology.vbucket_for(key);
        batches
            .entry(snapshot.topology.owner(vbucket))
            .or_default()
            .push((vbucket, key.clone()));
    }
    batches
        .into_iter()
        .map(|(server, batch)| (server.to_string(), batch))
        .collect()
}
