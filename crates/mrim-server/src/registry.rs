//! Live connection registry.
//!
//! Tracks every open connection so the runtime can enforce the connection
//! limit and report how many clients are online. Ids come from a counter and
//! are never reused, even after a connection closes.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};

use tokio::sync::RwLock;

/// Information about a registered connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Remote address
    pub peer: SocketAddr,
    /// When the connection was accepted
    pub connected_at: Instant,
}

/// Registry of open connections.
#[derive(Debug)]
pub struct ConnectionRegistry {
    /// Connection id → info
    connections: RwLock<HashMap<u64, ConnectionInfo>>,
    /// Next id to hand out
    next_id: AtomicU64,
    /// Maximum concurrent connections
    max_connections: usize,
}

impl ConnectionRegistry {
    /// Create an empty registry holding at most `max_connections`.
    pub fn new(max_connections: usize) -> Self {
        Self { connections: RwLock::new(HashMap::new()), next_id: AtomicU64::new(1), max_connections }
    }

    /// Register a newly accepted connection.
    ///
    /// Returns the assigned id, or `None` if the registry is full.
    pub async fn register(&self, peer: SocketAddr) -> Option<u64> {
        let mut connections = self.connections.write().await;
        if connections.len() >= self.max_connections {
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        connections.insert(id, ConnectionInfo { peer, connected_at: Instant::now() });
        Some(id)
    }

    /// Remove a connection. Returns its info if it was registered.
    pub async fn deregister(&self, id: u64) -> Option<ConnectionInfo> {
        self.connections.write().await.remove(&id)
    }

    /// Info for a connection, if registered.
    pub async fn get(&self, id: u64) -> Option<ConnectionInfo> {
        self.connections.read().await.get(&id).cloned()
    }

    /// Number of open connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Whether no connections are open.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }

    /// Connection limit.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}
