//! Server configuration types.
//!
//! Listener address, worker threads and connection timeouts for the Pingora
//! HTTP service.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    DEFAULT_GRACE_PERIOD_SECS, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_PORT,
    DEFAULT_READ_TIMEOUT_SECS, DEFAULT_THREADS, DEFAULT_WRITE_TIMEOUT_SECS,
};

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Worker threads for the HTTP service
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Maximum time to receive a request header, in seconds
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Maximum time to flush a response, in seconds
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,
    /// Keep-alive idle time between requests, in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    /// Time given to in-flight requests on shutdown, in seconds
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            threads: default_threads(),
            read_timeout_secs: default_read_timeout(),
            write_timeout_secs: default_write_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            grace_period_secs: default_grace_period(),
        }
    }
}

impl ServerConfig {
    /// `address:port` string used for the TCP listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_threads() -> usize {
    DEFAULT_THREADS
}

fn default_read_timeout() -> u64 {
    DEFAULT_READ_TIMEOUT_SECS
}

fn default_write_timeout() -> u64 {
    DEFAULT_WRITE_TIMEOUT_SECS
}

fn default_idle_timeout() -> u64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}

fn default_grace_period() -> u64 {
    DEFAULT_GRACE_PERIOD_SECS
}
