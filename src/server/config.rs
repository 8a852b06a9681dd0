//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::identity::session::DEFAULT_SESSION_COOKIE;
use crate::identity::Avatar;
use crate::room::{FanoutMode, RoomConfig};

/// Environment variable holding the bind address
pub const ENV_BIND_ADDR: &str = "CHAT_BIND_ADDR";

/// Environment variable selecting the avatar strategy
pub const ENV_AVATAR: &str = "CHAT_AVATAR";

/// Environment variable holding the outbound queue capacity
pub const ENV_OUTBOUND_CAPACITY: &str = "CHAT_OUTBOUND_CAPACITY";

/// Environment variable enabling slow-member eviction, in milliseconds
pub const ENV_FANOUT_TIMEOUT_MS: &str = "CHAT_FANOUT_TIMEOUT_MS";

/// Environment variable holding the login redirect target
pub const ENV_LOGIN_PATH: &str = "CHAT_LOGIN_PATH";

/// Invalid configuration value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// Variable or field name
    pub key: String,
    /// Why the value was rejected
    pub reason: String,
}

impl ConfigError {
    fn new(key: &str, reason: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid {}: {}", self.key, self.reason)
    }
}

impl std::error::Error for ConfigError {}

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Path of the WebSocket room endpoint
    pub room_path: String,

    /// Where unauthenticated clients are redirected
    pub login_path: String,

    /// Name of the session cookie
    pub session_cookie: String,

    /// Avatar strategy applied to every message
    pub avatar: Avatar,

    /// Largest accepted WebSocket message, in bytes
    pub max_message_size: usize,

    /// Room queues and fan-out policy
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            room_path: "/room".to_string(),
            login_path: "/login".to_string(),
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            avatar: Avatar::default(),
            max_message_size: 64 * 1024, // 64KB
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Build a config from `CHAT_*` environment variables
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup(ENV_BIND_ADDR) {
            config.bind_addr = addr
                .parse()
                .map_err(|e| ConfigError::new(ENV_BIND_ADDR, format!("{}", e)))?;
        }

        if let Some(avatar) = lookup(ENV_AVATAR) {
            config.avatar = avatar
                .parse()
                .map_err(|e: String| ConfigError::new(ENV_AVATAR, e))?;
        }

        if let Some(capacity) = lookup(ENV_OUTBOUND_CAPACITY) {
            let capacity: usize = capacity
                .parse()
                .map_err(|e| ConfigError::new(ENV_OUTBOUND_CAPACITY, format!("{}", e)))?;
            config = config.outbound_capacity(capacity);
        }

        if let Some(ms) = lookup(ENV_FANOUT_TIMEOUT_MS) {
            let ms: u64 = ms
                .parse()
                .map_err(|e| ConfigError::new(ENV_FANOUT_TIMEOUT_MS, format!("{}", e)))?;
            config = config.evict_slow_members(Duration::from_millis(ms));
        }

        if let Some(path) = lookup(ENV_LOGIN_PATH) {
            if !path.starts_with('/') {
                return Err(ConfigError::new(ENV_LOGIN_PATH, "must start with '/'"));
            }
            config.login_path = path;
        }

        Ok(config)
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the room endpoint path
    pub fn room_path(mut self, path: impl Into<String>) -> Self {
        self.room_path = path.into();
        self
    }

    /// Set the login redirect target
    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    /// Set the session cookie name
    pub fn session_cookie(mut self, name: impl Into<String>) -> Self {
        self.session_cookie = name.into();
        self
    }

    /// Set the avatar strategy
    pub fn avatar(mut self, avatar: Avatar) -> Self {
        self.avatar = avatar;
        self
    }

    /// Set the largest accepted message size
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the per-connection outbound queue capacity (at least 1)
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.room = self.room.outbound_capacity(capacity);
        self
    }

    /// Set the forward queue capacity (at least 1)
    pub fn forward_capacity(mut self, capacity: usize) -> Self {
        self.room = self.room.forward_capacity(capacity);
        self
    }

    /// Set the fan-out policy
    pub fn fanout(mut self, mode: FanoutMode) -> Self {
        self.room = self.room.fanout(mode);
        self
    }

    /// Evict members whose queue stays full longer than `timeout`
    pub fn evict_slow_members(mut self, timeout: Duration) -> Self {
        self.room = self.room.evict_slow_members(timeout);
        self
    }

    /// Replace the whole room configuration
    pub fn room(mut self, room: RoomConfig) -> Self {
        self.room = room;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.room_path, "/room");
        assert_eq!(config.login_path, "/login");
        assert_eq!(config.session_cookie, "CHAT_SESSION");
        assert_eq!(config.avatar, Avatar::ProvidedUrl);
        assert_eq!(config.room.outbound_capacity, 256);
        assert_eq!(config.room.fanout, FanoutMode::Blocking);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr, addr);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .room_path("/chat")
            .login_path("/auth")
            .session_cookie("sid")
            .avatar(Avatar::Gravatar)
            .max_message_size(1024)
            .outbound_capacity(8)
            .forward_capacity(4)
            .evict_slow_members(Duration::from_millis(50));

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.room_path, "/chat");
        assert_eq!(config.login_path, "/auth");
        assert_eq!(config.session_cookie, "sid");
        assert_eq!(config.avatar, Avatar::Gravatar);
        assert_eq!(config.max_message_size, 1024);
        assert_eq!(config.room.outbound_capacity, 8);
        assert_eq!(config.room.forward_capacity, 4);
        assert_eq!(
            config.room.fanout,
            FanoutMode::Evict {
                timeout: Duration::from_millis(50)
            }
        );
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let config = ServerConfig::default().outbound_capacity(0);

        assert_eq!(config.room.outbound_capacity, 1);
    }

    #[test]
    fn test_from_lookup_empty_uses_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.room.fanout, FanoutMode::Blocking);
    }

    #[test]
    fn test_from_lookup_reads_all_keys() {
        let config = ServerConfig::from_lookup(lookup(&[
            (ENV_BIND_ADDR, "127.0.0.1:9000"),
            (ENV_AVATAR, "gravatar"),
            (ENV_OUTBOUND_CAPACITY, "16"),
            (ENV_FANOUT_TIMEOUT_MS, "250"),
            (ENV_LOGIN_PATH, "/signin"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.avatar, Avatar::Gravatar);
        assert_eq!(config.room.outbound_capacity, 16);
        assert_eq!(
            config.room.fanout,
            FanoutMode::Evict {
                timeout: Duration::from_millis(250)
            }
        );
        assert_eq!(config.login_path, "/signin");
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let err = ServerConfig::from_lookup(lookup(&[(ENV_BIND_ADDR, "nowhere")])).unwrap_err();
        assert_eq!(err.key, ENV_BIND_ADDR);

        let err = ServerConfig::from_lookup(lookup(&[(ENV_AVATAR, "facebook")])).unwrap_err();
        assert_eq!(err.key, ENV_AVATAR);

        let err =
            ServerConfig::from_lookup(lookup(&[(ENV_OUTBOUND_CAPACITY, "-1")])).unwrap_err();
        assert_eq!(err.key, ENV_OUTBOUND_CAPACITY);

        let err = ServerConfig::from_lookup(lookup(&[(ENV_LOGIN_PATH, "login")])).unwrap_err();
        assert_eq!(err.key, ENV_LOGIN_PATH);
        assert_eq!(err.to_string(), "Invalid CHAT_LOGIN_PATH: must start with '/'");
    }
}
