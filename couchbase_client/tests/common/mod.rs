//! In-process cluster node for the integration suites: listens on a
//! loopback port, speaks the binary protocol, owns a configurable set
//! of vbuckets and answers NotMyVbucket for the rest.

#![allow(dead_code)]

use bytes::{Buf, Bytes, BytesMut};
use couchbase_client::{Credentials, Topology, TopologyProvider};
use mcbp::{Cas, Codec, Message, MessageBuilder, Opcode, Status};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Read;
use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tokio_util::codec::{Decoder, Encoder};

pub const VBUCKETS: u16 = 16;
pub const USERNAME: &str = "user";
pub const PASSWORD: &str = "pass";

pub fn creds() -> Credentials {
    Credentials::new(USERNAME, PASSWORD)
}

/// A loopback address nothing listens on.
pub fn dead_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);
    address
}

/// Every vbucket on one node.
pub fn all_to_one(bucket: &str, rev: u32, node: &FakeNode) -> Topology {
    Topology::new(
        bucket,
        rev,
        vec![node.address().to_string()],
        vec![0; VBUCKETS as usize],
    )
    .unwrap()
}

/// Vbuckets dealt round-robin over the given addresses.
pub fn round_robin(bucket: &str, rev: u32, addresses: &[String]) -> Topology {
    let owners = (0..VBUCKETS)
        .map(|vb| vb % addresses.len() as u16)
        .collect();
    Topology::new(bucket, rev, addresses.to_vec(), owners).unwrap()
}

/// Vbuckets a round-robin topology assigns to server index `index`.
pub fn owned_share(index: u16, num_servers: u16) -> Vec<u16> {
    (0..VBUCKETS).filter(|vb| vb % num_servers == index).collect()
}

/// `count` distinct keys the topology routes to `server`.
pub fn keys_owned_by(topology: &Topology, server: &str, count: usize) -> Vec<Bytes> {
    let mut keys = Vec::with_capacity(count);
    for i in 0.. {
        if keys.len() == count {
            break;
        }
        let key = Bytes::from(format!("key{i}"));
        if topology.owner(topology.vbucket_for(&key)) == server {
            keys.push(key);
        }
        assert!(i < 10_000, "no keys hash to {server}");
    }
    keys
}

/// A key whose vbucket satisfies the predicate.
pub fn find_key(topology: &Topology, pred: impl Fn(u16) -> bool) -> Bytes {
    (0..10_000)
        .map(|i| Bytes::from(format!("key{i}")))
        .find(|key| pred(u16::from(topology.vbucket_for(key))))
        .expect("no key matched the vbucket predicate")
}

/// Serves topologies front to back, then repeats the last one. Counts
/// fetches so tests can assert refresh coalescing.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Topology>>,
    pub fetches: AtomicUsize,
}

/// Clonable handle to a [ScriptedProvider]. A local newtype so it can
/// implement the foreign [TopologyProvider] trait (the orphan rule
/// forbids implementing it directly for `Arc<ScriptedProvider>`).
#[derive(Clone)]
pub struct SharedProvider(Arc<ScriptedProvider>);

impl ScriptedProvider {
    pub fn new(script: Vec<Topology>) -> SharedProvider {
        assert!(!script.is_empty());
        SharedProvider(Arc::new(ScriptedProvider {
            script: Mutex::new(script.into()),
            fetches: AtomicUsize::new(0),
        }))
    }
}

impl SharedProvider {
    pub fn fetches(&self) -> usize {
        self.0.fetches.load(Ordering::SeqCst)
    }
}

impl TopologyProvider for SharedProvider {
    fn fetch(&self, _bucket: &str) -> couchbase_client::Result<Topology> {
        self.0.fetches.fetch_add(1, Ordering::SeqCst);
        let mut script = self.0.script.lock().unwrap();
        if script.len() > 1 {
            Ok(script.pop_front().unwrap())
        } else {
            Ok(script.front().unwrap().clone())
        }
    }
}

const DEFAULT_LOCK_SECONDS: u64 = 15;

struct Doc {
    value: Vec<u8>,
    flags: u32,
    cas: u64,
    expires_at: Option<Instant>,
    locked_until: Option<Instant>,
}

impl Doc {
    fn locked(&self) -> bool {
        self.locked_until.map_or(false, |until| until > Instant::now())
    }
}

struct NodeState {
    buckets: Vec<String>,
    owned: RwLock<HashSet<u16>>,
    store: Mutex<HashMap<Bytes, Doc>>,
    cas_seq: AtomicU64,
    config_json: Mutex<Option<Vec<u8>>>,
    stop: AtomicBool,
}

impl NodeState {
    fn next_cas(&self) -> u64 {
        self.cas_seq.fetch_add(1, Ordering::SeqCst)
    }
}

pub struct FakeNode {
    address: String,
    state: Arc<NodeState>,
}

impl FakeNode {
    pub fn spawn(buckets: &[&str], owned: impl IntoIterator<Item = u16>) -> FakeNode {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let state = Arc::new(NodeState {
            buckets: buckets.iter().map(|b| b.to_string()).collect(),
            owned: RwLock::new(owned.into_iter().collect()),
            store: Mutex::new(HashMap::new()),
            cas_seq: AtomicU64::new(1),
            config_json: Mutex::new(None),
            stop: AtomicBool::new(false),
        });

        let accept_state = state.clone();
        std::thread::spawn(move || {
            while !accept_state.stop.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        stream.set_nonblocking(false).unwrap();
                        let state = accept_state.clone();
                        std::thread::spawn(move || serve(stream, state));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        std::thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        FakeNode { address, state }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn set_owned(&self, vbuckets: impl IntoIterator<Item = u16>) {
        *self.state.owned.write().unwrap() = vbuckets.into_iter().collect();
    }

    pub fn set_config(&self, json: Vec<u8>) {
        *self.state.config_json.lock().unwrap() = Some(json);
    }

    /// Seed a document directly, bypassing the protocol.
    pub fn insert(&self, key: &[u8], value: &[u8]) {
        let cas = self.state.next_cas();
        self.state.store.lock().unwrap().insert(
            Bytes::copy_from_slice(key),
            Doc {
                value: value.to_vec(),
                flags: 0,
                cas,
                expires_at: None,
                locked_until: None,
            },
        );
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.state.store.lock().unwrap().contains_key(&Bytes::copy_from_slice(key))
    }

    pub fn item_count(&self) -> usize {
        self.state.store.lock().unwrap().len()
    }
}

impl Drop for FakeNode {
    fn drop(&mut self) {
        self.state.stop.store(true, Ordering::SeqCst);
    }
}

fn serve(mut stream: TcpStream, state: Arc<NodeState>) {
    let mut codec = Codec::new();
    let mut read_buf = BytesMut::new();
    let mut write_buf = BytesMut::new();

    loop {
        let mut chunk = [0u8; 4096];
        let n = match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        read_buf.extend_from_slice(&chunk[..n]);

        loop {
            match codec.decode(&mut read_buf) {
                Ok(Some(request)) => {
                    for mut resp in handle(&state, &request) {
                        resp.opaque = request.opaque;
                        codec.encode(resp, &mut write_buf).unwrap();
                    }
                    if stream.write_all(&write_buf).is_err() {
                        return;
                    }
                    write_buf.clear();
                }
                Ok(None) => break,
                Err(_) => return,
            }
        }
    }
}

fn status_only(opcode: Opcode, status: Status) -> Message {
    MessageBuilder::new(opcode).status(status).build()
}

fn hit(opcode: Opcode, doc: &Doc) -> Message {
    MessageBuilder::new(opcode)
        .status(Status::Success)
        .cas(Cas::from(doc.cas))
        .extras(doc.flags.to_be_bytes().to_vec())
        .value(doc.value.clone())
        .build()
}

fn expiry_instant(seconds: u32) -> Option<Instant> {
    if seconds == 0 {
        None
    } else {
        Some(Instant::now() + Duration::from_secs(seconds as u64))
    }
}

fn live<'a>(store: &'a mut HashMap<Bytes, Doc>, key: &Bytes) -> Option<&'a mut Doc> {
    let expired = store
        .get(key)
        .map_or(false, |doc| doc.expires_at.map_or(false, |at| at <= Instant::now()));
    if expired {
        store.remove(key);
    }
    store.get_mut(key)
}

fn handle(state: &NodeState, req: &Message) -> Vec<Message> {
    let opcode = req.opcode;

    if opcode.is_key_command() {
        let vbucket = req.try_vbucket().unwrap();
        if !state.owned.read().unwrap().contains(&vbucket) {
            return vec![status_only(opcode, Status::NotMyVbucket)];
        }
    }

    match opcode {
        Opcode::Get => {
            let mut store = state.store.lock().unwrap();
            match live(&mut store, &req.key) {
                Some(doc) => vec![hit(opcode, doc)],
                None => vec![status_only(opcode, Status::KeyNotFound)],
            }
        }

        Opcode::GetLocked => {
            let mut extras = &req.extras[..];
            let lock_time = if extras.len() >= 4 { extras.get_u32() as u64 } else { 0 };
            let lock_time = if lock_time == 0 { DEFAULT_LOCK_SECONDS } else { lock_time };
            let mut store = state.store.lock().unwrap();
            match live(&mut store, &req.key) {
                Some(doc) if doc.locked() => vec![status_only(opcode, Status::Locked)],
                Some(doc) => {
                    doc.cas = state.next_cas();
                    doc.locked_until = Some(Instant::now() + Duration::from_secs(lock_time));
                    vec![hit(opcode, doc)]
                }
                None => vec![status_only(opcode, Status::KeyNotFound)],
            }
        }

        Opcode::UnlockKey => {
            let mut store = state.store.lock().unwrap();
            match live(&mut store, &req.key) {
                Some(doc) if !doc.locked() => vec![status_only(opcode, Status::TemporaryFailure)],
                Some(doc) if u64::from(req.cas) != doc.cas => {
                    vec![status_only(opcode, Status::Locked)]
                }
                Some(doc) => {
                    doc.locked_until = None;
                    vec![status_only(opcode, Status::Success)]
                }
                None => vec![status_only(opcode, Status::KeyNotFound)],
            }
        }

        Opcode::Gat => {
            let mut extras = &req.extras[..];
            let expiry = if extras.len() >= 4 { extras.get_u32() } else { 0 };
            let mut store = state.store.lock().unwrap();
            match live(&mut store, &req.key) {
                Some(doc) if doc.locked() => vec![status_only(opcode, Status::Locked)],
                Some(doc) => {
                    doc.expires_at = expiry_instant(expiry);
                    vec![hit(opcode, doc)]
                }
                None => vec![status_only(opcode, Status::KeyNotFound)],
            }
        }

        Opcode::Touch => {
            let mut extras = &req.extras[..];
            let expiry = if extras.len() >= 4 { extras.get_u32() } else { 0 };
            let mut store = state.store.lock().unwrap();
            match live(&mut store, &req.key) {
                Some(doc) if doc.locked() => vec![status_only(opcode, Status::Locked)],
                Some(doc) => {
                    doc.expires_at = expiry_instant(expiry);
                    doc.cas = state.next_cas();
                    vec![MessageBuilder::new(opcode)
                        .status(Status::Success)
                        .cas(Cas::from(doc.cas))
                        .build()]
                }
                None => vec![status_only(opcode, Status::KeyNotFound)],
            }
        }

        Opcode::Set | Opcode::Add | Opcode::Replace => {
            let mut extras = &req.extras[..];
            let (flags, expiry) = if extras.len() >= 8 {
                (extras.get_u32(), extras.get_u32())
            } else {
                (0, 0)
            };
            let req_cas = u64::from(req.cas);
            let mut store = state.store.lock().unwrap();
            let existing = live(&mut store, &req.key);

            match (opcode, &existing) {
                (Opcode::Add, Some(_)) => return vec![status_only(opcode, Status::KeyExists)],
                (Opcode::Replace, None) => return vec![status_only(opcode, Status::KeyNotFound)],
                _ => {}
            }
            if let Some(doc) = &existing {
                if doc.locked() && req_cas != doc.cas {
                    return vec![status_only(opcode, Status::Locked)];
                }
                if !doc.locked() && req_cas != 0 && req_cas != doc.cas {
                    return vec![status_only(opcode, Status::KeyExists)];
                }
            }

            let cas = state.next_cas();
            store.insert(
                req.key.clone(),
                Doc {
                    value: req.value.to_vec(),
                    flags,
                    cas,
                    expires_at: expiry_instant(expiry),
                    locked_until: None,
                },
            );
            vec![MessageBuilder::new(opcode)
                .status(Status::Success)
                .cas(Cas::from(cas))
                .build()]
        }

        Opcode::Append | Opcode::Prepend => {
            let mut store = state.store.lock().unwrap();
            match live(&mut store, &req.key) {
                Some(doc) if doc.locked() => vec![status_only(opcode, Status::Locked)],
                Some(doc) => {
                    if opcode == Opcode::Append {
                        doc.value.extend_from_slice(&req.value);
                    } else {
                        let mut value = req.value.to_vec();
                        value.extend_from_slice(&doc.value);
                        doc.value = value;
                    }
                    doc.cas = state.next_cas();
                    vec![MessageBuilder::new(opcode)
                        .status(Status::Success)
                        .cas(Cas::from(doc.cas))
                        .build()]
                }
                None => vec![status_only(opcode, Status::NotStored)],
            }
        }

        Opcode::Delete => {
            let mut store = state.store.lock().unwrap();
            match live(&mut store, &req.key) {
                Some(doc) if doc.locked() && u64::from(req.cas) != doc.cas => {
                    vec![status_only(opcode, Status::Locked)]
                }
                Some(_) => {
                    store.remove(&req.key);
                    vec![status_only(opcode, Status::Success)]
                }
                None => vec![status_only(opcode, Status::KeyNotFound)],
            }
        }

        Opcode::Increment | Opcode::Decrement => {
            let mut extras = &req.extras[..];
            if extras.len() != 20 {
                return vec![status_only(opcode, Status::InvalidArguments)];
            }
            let delta = extras.get_u64();
            let initial = extras.get_u64();
            let expiry = extras.get_u32();

            let mut store = state.store.lock().unwrap();
            let (value, cas) = match live(&mut store, &req.key) {
                Some(doc) if doc.locked() => {
                    return vec![status_only(opcode, Status::Locked)];
                }
                Some(doc) => {
                    let current = match std::str::from_utf8(&doc.value)
                        .ok()
                        .and_then(|s| s.trim().parse::<u64>().ok())
                    {
                        Some(n) => n,
                        None => return vec![status_only(opcode, Status::DeltaBadval)],
                    };
                    let next = if opcode == Opcode::Increment {
                        current.wrapping_add(delta)
                    } else {
                        current.saturating_sub(delta)
                    };
                    doc.value = next.to_string().into_bytes();
                    doc.cas = state.next_cas();
                    (next, doc.cas)
                }
                None => {
                    if expiry == u32::MAX {
                        return vec![status_only(opcode, Status::KeyNotFound)];
                    }
                    let cas = state.next_cas();
                    store.insert(
                        req.key.clone(),
                        Doc {
                            value: initial.to_string().into_bytes(),
                            flags: 0,
                            cas,
                            expires_at: expiry_instant(expiry),
                            locked_until: None,
                        },
                    );
                    (initial, cas)
                }
            };
            vec![MessageBuilder::new(opcode)
                .status(Status::Success)
                .cas(Cas::from(cas))
                .value(value.to_be_bytes().to_vec())
                .build()]
        }

        Opcode::Flush => {
            state.store.lock().unwrap().clear();
            vec![status_only(opcode, Status::Success)]
        }

        Opcode::Version => {
            vec![MessageBuilder::new(opcode)
                .status(Status::Success)
                .value("7.2.0-fake")
                .build()]
        }

        Opcode::Stat => {
            let items = state.store.lock().unwrap().len();
            vec![
                stat_entry("curr_items", &items.to_string()),
                stat_entry("ep_version", "fake-7.2"),
                status_only(opcode, Status::Success),
            ]
        }

        Opcode::Hello => {
            let supported: [u16; 2] = [0x08, 0x0b];
            let mut requested = &req.value[..];
            let mut agreed = Vec::new();
            for _ in 0..requested.len() / 2 {
                let feature = requested.get_u16();
                if supported.contains(&feature) {
                    agreed.extend_from_slice(&feature.to_be_bytes());
                }
            }
            vec![MessageBuilder::new(opcode)
                .status(Status::Success)
                .value(agreed)
                .build()]
        }

        Opcode::SaslListMechs => {
            vec![MessageBuilder::new(opcode)
                .status(Status::Success)
                .value("PLAIN")
                .build()]
        }

        Opcode::SaslAuth => {
            let ok = req.key.as_ref() == b"PLAIN" && plain_credentials_match(&req.value);
            let status = if ok { Status::Success } else { Status::AuthenticationError };
            vec![status_only(opcode, status)]
        }

        Opcode::SelectBucket => {
            let name = String::from_utf8_lossy(&req.key).into_owned();
            let status = if state.buckets.contains(&name) {
                Status::Success
            } else {
                Status::AccessError
            };
            vec![status_only(opcode, status)]
        }

        Opcode::GetClusterConfig => match state.config_json.lock().unwrap().clone() {
            Some(json) => vec![MessageBuilder::new(opcode)
                .status(Status::Success)
                .value(json)
                .build()],
            None => vec![status_only(opcode, Status::NoBucket)],
        },

        _ => vec![status_only(opcode, Status::UnknownCommand)],
    }
}

fn stat_entry(name: &str, value: &str) -> Message {
    MessageBuilder::new(Opcode::Stat)
        .status(Status::Success)
        .key(Bytes::copy_from_slice(name.as_bytes()))
        .value(Bytes::copy_from_slice(value.as_bytes()))
        .build()
}

fn plain_credentials_match(value: &[u8]) -> bool {
    let mut parts = value.split(|&b| b == 0);
    let _authzid = parts.next();
    let username = parts.next().unwrap_or_default();
    let password = parts.next().unwrap_or_default();
    username == USERNAME.as_bytes() && password == PASSWORD.as_bytes()
}
