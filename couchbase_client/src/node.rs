use crate::{
    config::{ClientConfig, Credentials},
    connection::Connection,
    error::{Error, Result},
    operations::{
        cluster_config::{ClusterConfig, GetClusterConfigRequest, GetClusterConfigResponse},
        concat::{ConcatKind, ConcatRequest, ConcatResponse},
        counter::{CounterKind, CounterRequest, CounterResponse},
        flush::FlushRequest,
        get::{GetAndTouchRequest, GetLockedRequest, GetRequest, GetResponse, UnlockRequest},
        hello::{HelloRequest, HelloResponse},
        remove::{DeleteRequest, DeleteResponse},
        sasl::{SaslAuthRequest, SaslListMechsRequest, SaslListMechsResponse},
        select_bucket::SelectBucketRequest,
        stat::{StatEntry, StatRequest},
        store::{StoreKind, StoreRequest, StoreResponse},
        touch::{TouchRequest, TouchResponse},
        version::{VersionRequest, VersionResponse},
    },
    topology::Vbid,
};
use bytes::Bytes;
use mcbp::{Cas, Feature, Message, Opcode, Status};
use std::collections::{BTreeSet, HashMap};
use std::io;
use tracing::{debug, warn};

/// A client for one memcached endpoint: owns the connection, assigns
/// opaques, and issues one operation at a time. The router shares node
/// clients behind a mutex; they are also usable directly against a
/// single server.
#[derive(Debug)]
pub struct NodeClient {
    address: String,
    config: ClientConfig,
    credentials: Credentials,
    bucket: Option<String>,
    connection: Connection,
    features: Vec<Feature>,
    opaque: u32,
}

impl NodeClient {
    /// Connect and bootstrap: feature negotiation, SASL PLAIN when
    /// credentials are given, bucket selection when a bucket is given.
    pub fn connect(
        address: &str,
        credentials: &Credentials,
        bucket: Option<&str>,
        config: &ClientConfig,
    ) -> Result<NodeClient> {
        let connection = Connection::open(address, config)?;
        let mut client = NodeClient {
            address: address.to_string(),
            config: config.clone(),
            credentials: credentials.clone(),
            bucket: bucket.map(str::to_string),
            connection,
            features: Vec::new(),
            opaque: 0,
        };
        client.bootstrap()?;
        Ok(client)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Features the server agreed to during Hello.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    fn bootstrap(&mut self) -> Result<()> {
        let hello = HelloRequest {
            user_agent: self.config.user_agent.clone(),
            features: HelloRequest::default_features(),
        };
        let resp = self.round_trip(hello.encode())?;
        // Servers predating Hello answer UnknownCommand; that just means
        // no features.
        if resp.try_status()?.is_success() {
            self.features = HelloResponse::decode(&resp).features;
        }
        if !self.credentials.username.is_empty() {
            self.authenticate()?;
        }
        if let Some(bucket) = self.bucket.clone() {
            self.select_bucket(&bucket)?;
        }
        debug!(address = %self.address, features = ?self.features, "bootstrapped");
        Ok(())
    }

    fn authenticate(&mut self) -> Result<()> {
        let mechanisms = self.sasl_mechanisms()?;
        if !mechanisms.contains("PLAIN") {
            return Err(Error::Configuration {
                reason: format!("server offers no supported SASL mechanism: {mechanisms:?}"),
            });
        }
        let request = SaslAuthRequest::Plain {
            username: self.credentials.username.clone(),
            password: self.credentials.password.clone(),
        };
        let resp = self.round_trip(request.encode())?;
        match resp.try_status()? {
            status if status.is_success() => Ok(()),
            Status::AuthenticationError => Err(Error::Configuration {
                reason: "authentication rejected".to_string(),
            }),
            status => Err(Error::UnexpectedStatus {
                opcode: Opcode::SaslAuth,
                status,
            }),
        }
    }

    /// The SASL mechanisms the server advertises.
    pub fn sasl_mechanisms(&mut self) -> Result<BTreeSet<String>> {
        let resp = self.round_trip(SaslListMechsRequest.encode())?;
        let status = resp.try_status()?;
        if !status.is_success() {
            return Err(Error::Configuration {
                reason: format!("SASL mechanism listing refused: {status:?}"),
            });
        }
        Ok(SaslListMechsResponse::decode(&resp).mechanisms)
    }

    fn select_bucket(&mut self, name: &str) -> Result<()> {
        let request = SelectBucketRequest {
            bucket: name.to_string(),
        };
        let resp = self.round_trip(request.encode())?;
        match resp.try_status()? {
            status if status.is_success() => Ok(()),
            Status::KeyNotFound | Status::AccessError | Status::NoBucket => {
                Err(Error::BucketNotFound {
                    name: name.to_string(),
                })
            }
            status => Err(Error::UnexpectedStatus {
                opcode: Opcode::SelectBucket,
                status,
            }),
        }
    }

    /// The bucket configuration the node publishes on its data port.
    pub fn cluster_config(&mut self) -> Result<ClusterConfig> {
        let resp = self.round_trip(GetClusterConfigRequest.encode())?;
        let status = resp.try_status()?;
        if !status.is_success() {
            return Err(Error::Configuration {
                reason: format!("cluster config fetch refused: {status:?}"),
            });
        }
        GetClusterConfigResponse::decode(&resp)
            .map(|resp| resp.config)
            .map_err(|e| Error::Configuration {
                reason: format!("cluster config unparsable: {e}"),
            })
    }

    pub fn get(&mut self, vbucket: Vbid, key: &Bytes) -> Result<GetResponse> {
        let request = GetRequest {
            key: key.clone(),
            vbucket: vbucket.into(),
        };
        let resp = self.execute_read(request.encode(), key)?;
        Ok(GetResponse::decode(&resp))
    }

    pub fn get_and_touch(&mut self, vbucket: Vbid, key: &Bytes, expiry: u32) -> Result<GetResponse> {
        let request = GetAndTouchRequest {
            key: key.clone(),
            expiry,
            vbucket: vbucket.into(),
        };
        let resp = self.execute_read(request.encode(), key)?;
        Ok(GetResponse::decode(&resp))
    }

    /// Acquiring a lock mutates server state, so unlike the other gets
    /// this is never retried over a fresh connection.
    pub fn get_and_lock(&mut self, vbucket: Vbid, key: &Bytes, lock_time: u32) -> Result<GetResponse> {
        let request = GetLockedRequest {
            key: key.clone(),
            lock_time,
            vbucket: vbucket.into(),
        };
        let resp = self.execute(request.encode(), key)?;
        Ok(GetResponse::decode(&resp))
    }

    pub fn unlock(&mut self, vbucket: Vbid, key: &Bytes, cas: Cas) -> Result<()> {
        let request = UnlockRequest {
            key: key.clone(),
            cas,
            vbucket: vbucket.into(),
        };
        self.execute(request.encode(), key)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn store(
        &mut self,
        vbucket: Vbid,
        kind: StoreKind,
        key: &Bytes,
        flags: u32,
        expiry: u32,
        value: Bytes,
        cas: Cas,
    ) -> Result<Cas> {
        let request = StoreRequest {
            kind,
            key: key.clone(),
            value,
            flags,
            expiry,
            vbucket: vbucket.into(),
            cas,
        };
        let resp = self.execute(request.encode(), key)?;
        Ok(StoreResponse::decode(&resp).cas)
    }

    pub fn concat(&mut self, vbucket: Vbid, kind: ConcatKind, key: &Bytes, value: Bytes) -> Result<Cas> {
        let request = ConcatRequest {
            kind,
            key: key.clone(),
            value,
            vbucket: vbucket.into(),
        };
        match self.execute(request.encode(), key) {
            Ok(resp) => Ok(ConcatResponse::decode(&resp).cas),
            // Servers answer NotStored for a concat against an absent
            // key; surface that as the absence it is.
            Err(Error::UnexpectedStatus {
                status: Status::NotStored,
                ..
            }) => Err(Error::KeyNotFound { key: key.clone() }),
            Err(e) => Err(e),
        }
    }

    pub fn counter(
        &mut self,
        vbucket: Vbid,
        kind: CounterKind,
        key: &Bytes,
        delta: u64,
        initial: u64,
        expiry: u32,
    ) -> Result<(u64, Cas)> {
        let request = CounterRequest {
            kind,
            key: key.clone(),
            delta,
            initial,
            expiry,
            vbucket: vbucket.into(),
        };
        let resp = self.execute(request.encode(), key)?;
        let decoded = CounterResponse::decode(&resp)?;
        Ok((decoded.value, decoded.cas))
    }

    pub fn delete(&mut self, vbucket: Vbid, key: &Bytes) -> Result<Cas> {
        let request = DeleteRequest {
            key: key.clone(),
            vbucket: vbucket.into(),
        };
        let resp = self.execute(request.encode(), key)?;
        Ok(DeleteResponse::decode(&resp).cas)
    }

    pub fn touch(&mut self, vbucket: Vbid, key: &Bytes, expiry: u32) -> Result<Cas> {
        let request = TouchRequest {
            key: key.clone(),
            expiry,
            vbucket: vbucket.into(),
        };
        let resp = self.execute(request.encode(), key)?;
        Ok(TouchResponse::decode(&resp).cas)
    }

    /// Pipeline gets for many keys over the one connection: every
    /// request is queued before the first response is read, and
    /// responses are matched back by opaque. Misses are omitted.
    pub fn get_multi(&mut self, keys: &[(Vbid, Bytes)]) -> Result<HashMap<Bytes, GetResponse>> {
        let mut inflight = HashMap::with_capacity(keys.len());
        for (vbucket, key) in keys {
            let mut message = GetRequest {
                key: key.clone(),
                vbucket: (*vbucket).into(),
            }
            .encode();
            message.opaque = self.next_opaque();
            inflight.insert(message.opaque, key.clone());
            self.connection.enqueue(message)?;
        }
        self.connection.flush()?;

        let mut found = HashMap::with_capacity(inflight.len());
        while !inflight.is_empty() {
            let resp = self.connection.recv()?;
            let key = inflight.remove(&resp.opaque).ok_or_else(desync)?;
            match resp.try_status()? {
                status if status.is_success() => {
                    found.insert(key, GetResponse::decode(&resp));
                }
                Status::KeyNotFound => {}
                status => return Err(Error::from_status(status, Opcode::Get, &key)),
            }
        }
        Ok(found)
    }

    pub fn version(&mut self) -> Result<String> {
        let resp = self.execute(VersionRequest.encode(), &Bytes::new())?;
        Ok(VersionResponse::decode(&resp).version)
    }

    /// Collect one stat group into a map, draining the stream up to its
    /// empty-key terminator.
    pub fn stats(&mut self, group: &str) -> Result<HashMap<String, String>> {
        let group = Bytes::copy_from_slice(group.as_bytes());
        let mut message = StatRequest {
            group: group.clone(),
        }
        .encode();
        let opaque = self.next_opaque();
        message.opaque = opaque;
        self.connection.send(message)?;

        let mut entries = HashMap::new();
        loop {
            let resp = self.connection.recv()?;
            if resp.opaque != opaque {
                return Err(desync());
            }
            let status = resp.try_status()?;
            if !status.is_success() {
                return Err(Error::from_status(status, Opcode::Stat, &group));
            }
            let entry = StatEntry::decode(&resp);
            if entry.is_last() {
                break;
            }
            entries.insert(entry.name, entry.value);
        }
        Ok(entries)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.execute(FlushRequest.encode(), &Bytes::new())?;
        Ok(())
    }

    fn next_opaque(&mut self) -> u32 {
        self.opaque = self.opaque.wrapping_add(1);
        self.opaque
    }

    /// One request, one response, opaque verified. The status is left
    /// for the caller: bootstrap exchanges inspect it themselves.
    fn round_trip(&mut self, mut message: Message) -> Result<Message> {
        let opaque = self.next_opaque();
        message.opaque = opaque;
        let resp = self.connection.round_trip(message)?;
        if resp.opaque != opaque {
            return Err(desync());
        }
        Ok(resp)
    }

    /// Round-trip plus the common status handling for key commands.
    fn execute(&mut self, message: Message, key: &Bytes) -> Result<Message> {
        let opcode = message.opcode;
        let resp = self.round_trip(message)?;
        let status = resp.try_status()?;
        if status.is_success() {
            Ok(resp)
        } else {
            Err(Error::from_status(status, opcode, key))
        }
    }

    /// Idempotent reads may transparently reconnect once after a broken
    /// connection; mutations never do, to avoid duplicated side effects.
    fn execute_read(&mut self, message: Message, key: &Bytes) -> Result<Message> {
        let retry = message.clone();
        match self.execute(message, key) {
            Err(e) if e.is_connection() => {
                warn!(address = %self.address, "reconnecting after broken read");
                self.reconnect()?;
                self.execute(retry, key)
            }
            other => other,
        }
    }

    fn reconnect(&mut self) -> Result<()> {
        self.connection = Connection::open(&self.address, &self.config)?;
        self.features.clear();
        self.bootstrap()
    }
}

fn desync() -> Error {
    Error::Connection(io::Error::new(
        io::ErrorKind::InvalidData,
        "response does not match any in-flight request",
    ))
}
