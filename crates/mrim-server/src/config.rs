//! Server configuration.
//!
//! Values come from four layers, highest precedence first: command-line
//! flags, environment variables, an optional JSON config file, and built-in
//! defaults. Flags and environment variables are both parsed by `clap` in the
//! binary and arrive here as [`Overrides`]; the file arrives as
//! [`FileConfig`]. [`ServerConfig::resolve`] merges them.
//!
//! The file keeps the shape of the legacy YAML config:
//!
//! ```json
//! {
//!   "server": { "host": "0.0.0.0", "port": 2041, "mrim": { "ping_interval": 10 } },
//!   "repositories": { "user": { "entries": [
//!     { "id": 1, "localpart": "alice", "password": "secret" }
//!   ] } },
//!   "log": { "level": "info" }
//! }
//! ```

use std::{collections::HashSet, path::Path};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    auth::hash_password,
    storage::{StorageError, UserStore},
};

/// Errors from loading or validating configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read {path}: {message}")]
    Io {
        /// File path
        path: String,
        /// Underlying error
        message: String,
    },

    /// Config file is not valid JSON of the expected shape
    #[error("cannot parse {path}: {message}")]
    Parse {
        /// File path
        path: String,
        /// Underlying error
        message: String,
    },

    /// User entry carries neither `password` nor `password_hash`
    #[error("user entry {0:?} has no password")]
    MissingPassword(String),

    /// Two user entries share a localpart
    #[error("duplicate user entry {0:?}")]
    DuplicateUser(String),

    /// Ping interval must be at least one second
    #[error("ping interval must be positive")]
    ZeroPingInterval,

    /// User store rejected a configured user
    #[error("cannot seed user store: {0}")]
    Storage(#[from] StorageError),
}

/// JSON config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    /// `server` section
    #[serde(default)]
    pub server: ServerSection,
    /// `repositories` section
    #[serde(default)]
    pub repositories: RepositoriesSection,
    /// `log` section
    #[serde(default)]
    pub log: LogSection,
}

/// `server` section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerSection {
    /// Listen host
    pub host: Option<String>,
    /// Listen port
    pub port: Option<u16>,
    /// `server.mrim` subsection
    #[serde(default)]
    pub mrim: MrimSection,
}

/// `server.mrim` section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MrimSection {
    /// Seconds between client pings
    pub ping_interval: Option<u32>,
}

/// `repositories` section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositoriesSection {
    /// `repositories.user` subsection
    #[serde(default)]
    pub user: UserRepositorySection,
}

/// `repositories.user` section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRepositorySection {
    /// Users to create at startup
    #[serde(default)]
    pub entries: Vec<UserEntry>,
}

/// One configured user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserEntry {
    /// Fixed id; assigned by the store if absent
    pub id: Option<u64>,
    /// Login name
    pub localpart: String,
    /// Cleartext password, hashed at load
    pub password: Option<String>,
    /// Precomputed lowercase hex SHA-256, stored as given
    pub password_hash: Option<String>,
}

impl UserEntry {
    fn resolved_hash(&self) -> Result<String, ConfigError> {
        match (&self.password_hash, &self.password) {
            (Some(hash), _) => Ok(hash.clone()),
            (None, Some(password)) => Ok(hash_password(password)),
            (None, None) => Err(ConfigError::MissingPassword(self.localpart.clone())),
        }
    }
}

/// `log` section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogSection {
    /// Default tracing filter
    pub level: Option<String>,
}

impl FileConfig {
    /// Read and parse a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Self::from_json(&text).map_err(|e| match e {
            ConfigError::Parse { message, .. } => {
                ConfigError::Parse { path: path.display().to_string(), message }
            },
            other => other,
        })
    }

    /// Parse config file contents.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text)
            .map_err(|e| ConfigError::Parse { path: "<inline>".to_string(), message: e.to_string() })
    }
}

/// Values given on the command line or in the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Listen host
    pub host: Option<String>,
    /// Listen port
    pub port: Option<u16>,
    /// Seconds between client pings
    pub ping_interval_secs: Option<u32>,
    /// Default tracing filter
    pub log_level: Option<String>,
    /// Connection limit
    pub max_connections: Option<usize>,
}

/// Resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listen host
    pub host: String,
    /// Listen port
    pub port: u16,
    /// Seconds between client pings, announced in `SC_HELLO_ACK`
    pub ping_interval_secs: u32,
    /// Default tracing filter (`RUST_LOG` still wins)
    pub log_level: String,
    /// Maximum concurrent connections
    pub max_connections: usize,
    /// Users to create at startup
    pub users: Vec<UserEntry>,
}

impl ServerConfig {
    /// Default MRIM port.
    pub const DEFAULT_PORT: u16 = 2041;
    /// Default ping interval in seconds.
    pub const DEFAULT_PING_INTERVAL_SECS: u32 = 10;
    /// Default log level.
    pub const DEFAULT_LOG_LEVEL: &'static str = "info";
    /// Default connection limit.
    pub const DEFAULT_MAX_CONNECTIONS: usize = 10_000;
    /// Default listen host.
    pub const DEFAULT_HOST: &'static str = "0.0.0.0";

    /// Merge overrides over the file over defaults, and validate.
    ///
    /// # Errors
    ///
    /// - `ConfigError::ZeroPingInterval` for a ping interval of 0
    /// - `ConfigError::MissingPassword` for a user without a password
    /// - `ConfigError::DuplicateUser` for two users with one localpart
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self, ConfigError> {
        let config = Self {
            host: overrides
                .host
                .or(file.server.host)
                .unwrap_or_else(|| Self::DEFAULT_HOST.to_string()),
            port: overrides.port.or(file.server.port).unwrap_or(Self::DEFAULT_PORT),
            ping_interval_secs: overrides
                .ping_interval_secs
                .or(file.server.mrim.ping_interval)
                .unwrap_or(Self::DEFAULT_PING_INTERVAL_SECS),
            log_level: overrides
                .log_level
                .or(file.log.level)
                .unwrap_or_else(|| Self::DEFAULT_LOG_LEVEL.to_string()),
            max_connections: overrides.max_connections.unwrap_or(Self::DEFAULT_MAX_CONNECTIONS),
            users: file.repositories.user.entries,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ping_interval_secs == 0 {
            return Err(ConfigError::ZeroPingInterval);
        }

        let mut seen = HashSet::new();
        for user in &self.users {
            user.resolved_hash()?;
            if !seen.insert(user.localpart.as_str()) {
                return Err(ConfigError::DuplicateUser(user.localpart.clone()));
            }
        }

        Ok(())
    }

    /// Seconds between client pings.
    pub fn ping_interval_secs(&self) -> u32 {
        self.ping_interval_secs
    }

    /// `host:port` to listen on.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Create every configured user in `store`.
    ///
    /// Returns the number of users created.
    pub fn seed_users(&self, store: &impl UserStore) -> Result<usize, ConfigError> {
        for user in &self.users {
            let hash = user.resolved_hash()?;
            match user.id {
                Some(id) => store.insert_with_id(id, &user.localpart, &hash)?,
                None => store.create(&user.localpart, &hash)?,
            };
        }

        Ok(self.users.len())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
            ping_interval_secs: Self::DEFAULT_PING_INTERVAL_SECS,
            log_level: Self::DEFAULT_LOG_LEVEL.to_string(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
            users: Vec::new(),
        }
    }
}
