//! Shared test helpers
//!
//! - `SequenceKeyGenerator`: scripted key candidates
//! - `FaultyBackend`: wraps a backend and fails selected operations
//! - `FakeStoreServer`: Redis-protocol server over a `MemoryStore`

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{BufReader, BufWriter};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use bytes::Bytes;
use docstash::config::IndexedConfig;
use docstash::protocol::{read_reply, write_reply, Reply};
use docstash::{
    Backend, Capabilities, IndexedBackend, ListStore, MemoryStore, Result, StashError, TagWeight,
};

// =============================================================================
// Key Generators
// =============================================================================

/// Returns scripted keys in order, then `fallback` forever
pub struct SequenceKeyGenerator {
    keys: Mutex<VecDeque<String>>,
    fallback: String,
}

impl SequenceKeyGenerator {
    pub fn new(keys: &[&str], fallback: &str) -> Self {
        Self {
            keys: Mutex::new(keys.iter().map(|k| k.to_string()).collect()),
            fallback: fallback.to_string(),
        }
    }
}

impl docstash::KeyGenerator for SequenceKeyGenerator {
    fn create_key(&self, _length: usize) -> String {
        self.keys
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

// =============================================================================
// Backends
// =============================================================================

/// Indexed backend over a fresh in-memory store, no mirror copy
pub fn memory_indexed_backend() -> (Arc<MemoryStore>, IndexedBackend) {
    memory_indexed_backend_with(IndexedConfig {
        mirror_path: None,
        ..IndexedConfig::default()
    })
}

pub fn memory_indexed_backend_with(config: IndexedConfig) -> (Arc<MemoryStore>, IndexedBackend) {
    let store = Arc::new(MemoryStore::new());
    let shared: Arc<dyn ListStore> = store.clone();
    (store, IndexedBackend::new(shared, &config))
}

/// Which operations a `FaultyBackend` fails
#[derive(Debug, Default, Clone, Copy)]
pub struct Faults {
    pub put: bool,
    pub put_tags: bool,
    pub put_catalog_entry: bool,
    pub get_tags: bool,
    pub search: bool,
}

/// Backend wrapper that fails selected operations with `StoreUnavailable`
pub struct FaultyBackend {
    inner: Arc<dyn Backend>,
    faults: Faults,
    pub writes: AtomicUsize,
}

impl FaultyBackend {
    pub fn new(inner: Arc<dyn Backend>, faults: Faults) -> Self {
        Self {
            inner,
            faults,
            writes: AtomicUsize::new(0),
        }
    }

    fn fail(operation: &str) -> StashError {
        StashError::StoreUnavailable(format!("injected failure in {}", operation))
    }
}

impl Backend for FaultyBackend {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }

    fn check_key(&self, key: &str) -> Result<()> {
        self.inner.check_key(key)
    }

    fn put(&self, key: &str, body: &[u8]) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.faults.put {
            return Err(Self::fail("put"));
        }
        self.inner.put(key, body)
    }

    fn get(&self, key: &str, skip_expire: bool) -> Result<Bytes> {
        self.inner.get(key, skip_expire)
    }

    fn put_tags(&self, key: &str, tags: &[String]) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.faults.put_tags {
            return Err(Self::fail("put_tags"));
        }
        self.inner.put_tags(key, tags)
    }

    fn get_tags(&self, key: &str) -> Result<Vec<String>> {
        if self.faults.get_tags {
            return Err(Self::fail("get_tags"));
        }
        self.inner.get_tags(key)
    }

    fn put_catalog_entry(&self, key: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.faults.put_catalog_entry {
            return Err(Self::fail("put_catalog_entry"));
        }
        self.inner.put_catalog_entry(key)
    }

    fn get_catalog(&self) -> Result<Vec<String>> {
        self.inner.get_catalog()
    }

    fn search_keys(&self, substring: &str) -> Result<Vec<String>> {
        if self.faults.search {
            return Err(Self::fail("search_keys"));
        }
        self.inner.search_keys(substring)
    }

    fn search_tag(&self, tag: &str) -> Result<Vec<String>> {
        if self.faults.search {
            return Err(Self::fail("search_tag"));
        }
        self.inner.search_tag(tag)
    }

    fn get_all_tags(&self) -> Result<Vec<String>> {
        self.inner.get_all_tags()
    }

    fn get_all_tag_weights(&self) -> Result<Vec<TagWeight>> {
        self.inner.get_all_tag_weights()
    }
}

// =============================================================================
// Fake Store Server
// =============================================================================

/// Redis-protocol server answering from a `MemoryStore`
pub struct FakeStoreServer {
    pub port: u16,
    pub store: Arc<MemoryStore>,
    pub commands: Arc<Mutex<Vec<Vec<String>>>>,
}

impl FakeStoreServer {
    /// Start serving on an ephemeral local port
    pub fn start(password: Option<&str>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let store = Arc::new(MemoryStore::new());
        let commands = Arc::new(Mutex::new(Vec::new()));
        let password = password.map(str::to_string);

        let server_store = Arc::clone(&store);
        let server_commands = Arc::clone(&commands);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let store = Arc::clone(&server_store);
                let commands = Arc::clone(&server_commands);
                let password = password.clone();
                thread::spawn(move || serve(stream, &store, &commands, password.as_deref()));
            }
        });

        Self {
            port,
            store,
            commands,
        }
    }

    /// Indexed config pointing at this server
    pub fn config(&self) -> IndexedConfig {
        IndexedConfig {
            host: "127.0.0.1".to_string(),
            port: self.port,
            mirror_path: None,
            ..IndexedConfig::default()
        }
    }

    /// Command names received so far, uppercase
    pub fn command_names(&self) -> Vec<String> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .map(|args| args[0].to_uppercase())
            .collect()
    }
}

fn serve(
    stream: TcpStream,
    store: &MemoryStore,
    commands: &Mutex<Vec<Vec<String>>>,
    password: Option<&str>,
) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut writer = BufWriter::new(stream);
    let mut authed = password.is_none();

    loop {
        let Ok(request) = read_reply(&mut reader) else { return };
        let Ok(args) = request.into_bulk_array() else { return };
        let text: Vec<String> = args
            .iter()
            .map(|a| String::from_utf8_lossy(a).into_owned())
            .collect();
        commands.lock().unwrap().push(text.clone());

        let name = text[0].to_uppercase();
        let reply = if name == "AUTH" {
            if Some(text[1].as_str()) == password {
                authed = true;
                Reply::Status("OK".to_string())
            } else {
                Reply::Error("WRONGPASS invalid username-password pair".to_string())
            }
        } else if !authed {
            Reply::Error("NOAUTH Authentication required.".to_string())
        } else {
            dispatch(store, &name, &args)
        };

        if write_reply(&mut writer, &reply).is_err() || name == "QUIT" {
            return;
        }
    }
}

fn dispatch(store: &MemoryStore, name: &str, args: &[Vec<u8>]) -> Reply {
    let text = |i: usize| String::from_utf8_lossy(&args[i]).into_owned();
    let int = |i: usize| text(i).parse::<i64>().unwrap_or(0);
    let result: Result<Reply> = match name {
        "PING" => Ok(Reply::Status("PONG".to_string())),
        "QUIT" => Ok(Reply::Status("OK".to_string())),
        "SELECT" if int(1) < 16 => Ok(Reply::Status("OK".to_string())),
        "SELECT" => Ok(Reply::Error("ERR DB index is out of range".to_string())),
        "GET" => store.get(&text(1)).map(Reply::Bulk),
        "SET" => store.set(&text(1), &args[2]).map(|_| Reply::Status("OK".to_string())),
        "EXPIRE" => store
            .expire(&text(1), int(2) as u64)
            .map(|armed| Reply::Integer(armed as i64)),
        "LPUSH" => store.lpush(&text(1), &args[2]).map(|n| Reply::Integer(n as i64)),
        "LLEN" => store.llen(&text(1)).map(|n| Reply::Integer(n as i64)),
        "LRANGE" => store.lrange(&text(1), int(2), int(3)).map(|items| {
            Reply::Array(Some(items.into_iter().map(|i| Reply::Bulk(Some(i))).collect()))
        }),
        "KEYS" => store.keys(&text(1)).map(|keys| {
            Reply::Array(Some(
                keys.into_iter()
                    .map(|k| Reply::Bulk(Some(k.into_bytes())))
                    .collect(),
            ))
        }),
        other => Ok(Reply::Error(format!("ERR unknown command '{}'", other))),
    };

    result.unwrap_or_else(|e| match e {
        StashError::Store(message) => Reply::Error(message),
        other => Reply::Error(format!("ERR {}", other)),
    })
}

/// Server that answers one connection with scripted replies, then hangs up
pub fn scripted_server(replies: Vec<Reply>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    thread::spawn(move || {
        let Ok((stream, _)) = listener.accept() else { return };
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut writer = BufWriter::new(stream);
        for reply in replies {
            if read_reply(&mut reader).is_err() {
                return;
            }
            if write_reply(&mut writer, &reply).is_err() {
                return;
            }
        }
        // Dropping the stream closes the connection
    });

    port
}

/// A local port with nothing listening on it
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}
