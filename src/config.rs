//! Configuration module for status-line-server.
//!
//! The server has no operator-facing configuration: no CLI arguments, no
//! configuration file. Every value is fixed by `Config::default()`. The
//! struct exists so the rest of the crate reads its parameters from one
//! place and tests can bind an ephemeral port.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind to
    pub listen: SocketAddr,
    /// Listen backlog passed to `listen(2)`
    pub backlog: i32,
    /// Maximum number of bytes taken from the connection per read
    pub read_size: usize,
    /// Iteration counter value on which the BYE line is sent
    pub bye_at: u64,
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            backlog: default_backlog(),
            read_size: default_read_size(),
            bye_at: default_bye_at(),
            log_level: default_log_level(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 5000))
}

fn default_backlog() -> i32 {
    1
}

fn default_read_size() -> usize {
    1024
}

fn default_bye_at() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}
