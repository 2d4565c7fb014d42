use serde::Deserialize;
use std::time::Duration;

/// Client tuning knobs. Deserializable so deployments can ship them in a
/// config file; the defaults suit a local cluster.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Bound on establishing a TCP connection to a node, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Bound on any single network read or write, in milliseconds.
    pub operation_timeout_ms: u64,
    /// Agent name announced to the server during Hello.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            connect_timeout_ms: 5_000,
            operation_timeout_ms: 2_500,
            user_agent: "couchbase-client-rs".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

/// Credentials for SASL PLAIN authentication. An empty username skips
/// authentication entirely (ancient unsecured buckets).
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Credentials {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Placeholder credentials for buckets without authentication.
    pub fn none() -> Credentials {
        Credentials {
            username: String::new(),
            password: String::new(),
        }
    }
}
