//! MRIM production server.
//!
//! Production server implementation using Tokio TCP sockets for transport.
//!
//! # Architecture
//!
//! This crate wraps [`mrim_core`]'s sans-IO connection state machine with
//! real I/O. The [`Session`] driver decides what to do with inbound bytes and
//! returns [`SessionAction`]s; [`serve_connection`] carries them out on a
//! socket and maps log actions to `tracing`.
//!
//! # Components
//!
//! - [`CommandExecutor`]: fixed opcode table and command handlers
//! - [`Session`]: per-connection driver (pure logic, no I/O)
//! - [`Server`]: accept loop, one task per connection
//! - [`ConnectionRegistry`]: live connections and the connection limit
//! - [`PasswordAuthenticator`] / [`MemoryUserStore`]: credential check

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod commands;
pub mod config;
mod error;
pub mod executor;
mod registry;
mod session;
pub mod storage;

use std::{future::Future, net::SocketAddr, sync::Arc};

pub use auth::{AuthError, Authenticator, PasswordAuthenticator, UserRecord};
pub use config::{ConfigError, FileConfig, Overrides, ServerConfig};
pub use error::ServerError;
pub use executor::{CommandExecutor, Execution, RejectReason};
pub use registry::{ConnectionInfo, ConnectionRegistry};
pub use session::{LogLevel, Session, SessionAction};
pub use storage::{MemoryUserStore, StorageError, StoredUser, UserStore};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpListener,
};

/// Size of the per-connection read buffer.
const READ_BUFFER_SIZE: usize = 16 * 1024;

/// Production MRIM server.
pub struct Server<A: Authenticator> {
    /// Bound listening socket
    listener: TcpListener,
    /// Shared command table and collaborators
    executor: Arc<CommandExecutor<A>>,
    /// Open connections
    registry: Arc<ConnectionRegistry>,
}

impl Server<PasswordAuthenticator<MemoryUserStore>> {
    /// Bind a server from resolved configuration, seeding the in-memory user
    /// store with the configured users.
    pub async fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let store = MemoryUserStore::new();
        let seeded = config.seed_users(&store)?;
        tracing::info!(users = seeded, "user store ready");

        let executor =
            CommandExecutor::new(PasswordAuthenticator::new(store), config.ping_interval_secs());
        Self::bind(&config.bind_address(), executor, config.max_connections).await
    }
}

impl<A: Authenticator> Server<A> {
    /// Bind a listening socket.
    pub async fn bind(
        address: &str,
        executor: CommandExecutor<A>,
        max_connections: usize,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| ServerError::Transport(format!("cannot bind {address}: {e}")))?;

        Ok(Self {
            listener,
            executor: Arc::new(executor),
            registry: Arc::new(ConnectionRegistry::new(max_connections)),
        })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Connection registry, shared with the connection tasks.
    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Run the server until an unrecoverable error.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server until `shutdown` completes.
    ///
    /// Connection tasks already running are left to finish on their own.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<(), ServerError> {
        tracing::info!("Server starting on {}", self.local_addr()?);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("Server shutting down");
                    return Ok(());
                },
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let Some(id) = self.registry.register(peer).await else {
                            tracing::warn!(%peer, "connection limit reached, refusing");
                            drop(stream);
                            continue;
                        };

                        let executor = Arc::clone(&self.executor);
                        let registry = Arc::clone(&self.registry);

                        tokio::spawn(async move {
                            if let Err(e) = stream.set_nodelay(true) {
                                tracing::debug!(connection_id = id, "set_nodelay failed: {}", e);
                            }
                            if let Err(e) = serve_connection(stream, peer, id, executor).await {
                                tracing::warn!(connection_id = id, %peer, "Connection error: {}", e);
                            }
                            registry.deregister(id).await;
                        });
                    },
                    Err(e) => {
                        tracing::error!("Accept error: {}", e);
                    },
                },
            }
        }
    }
}

/// Serve one connection until either side closes it.
///
/// Generic over the stream so tests can drive it with in-memory pipes.
/// Returns `Ok` for every orderly close, including closes the protocol
/// demands; `Err` only for transport failures.
pub async fn serve_connection<S, A>(
    mut stream: S,
    peer: SocketAddr,
    id: u64,
    executor: Arc<CommandExecutor<A>>,
) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    A: Authenticator,
{
    tracing::debug!(connection_id = id, %peer, "New connection");

    let mut session = Session::new(id, peer, executor);
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) => {
                execute_actions(&mut stream, session.handle_closed("peer closed"), id, peer)
                    .await?;
                return Ok(());
            },
            Ok(n) => n,
            Err(e) => {
                execute_actions(&mut stream, session.handle_closed(&e.to_string()), id, peer)
                    .await?;
                return Err(e.into());
            },
        };

        let mut actions = session.handle_data(&buf[..n]).await;
        loop {
            if let Flow::Close = execute_actions(&mut stream, actions, id, peer).await? {
                // Best effort: the peer may already be gone
                let _ = stream.shutdown().await;
                return Ok(());
            }

            // One command in flight: the next buffered frame runs only after
            // the previous responses are written
            if !session.has_pending_input() {
                break;
            }
            actions = session.poll_buffered().await;
        }
    }
}

/// Whether the connection continues after a batch of actions.
enum Flow {
    Continue,
    Close,
}

/// Execute session actions.
async fn execute_actions<S>(
    stream: &mut S,
    actions: Vec<SessionAction>,
    id: u64,
    peer: SocketAddr,
) -> Result<Flow, ServerError>
where
    S: AsyncWrite + Unpin,
{
    for action in actions {
        match action {
            SessionAction::Send(bytes) => {
                stream.write_all(&bytes).await.map_err(|e| {
                    tracing::warn!(connection_id = id, %peer, "write failed: {}", e);
                    ServerError::from(e)
                })?;
                stream.flush().await?;
            },

            SessionAction::Close { reason } => {
                tracing::info!(connection_id = id, %peer, "Closing connection: {}", reason);
                return Ok(Flow::Close);
            },

            SessionAction::Log { level, message } => match level {
                LogLevel::Debug => tracing::debug!(connection_id = id, %peer, "{}", message),
                LogLevel::Info => tracing::info!(connection_id = id, %peer, "{}", message),
                LogLevel::Warn => tracing::warn!(connection_id = id, %peer, "{}", message),
                LogLevel::Error => tracing::error!(connection_id = id, %peer, "{}", message),
            },
        }
    }

    Ok(Flow::Continue)
}
