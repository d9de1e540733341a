//! Configuration for storefront-daemon

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorefrontConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Account and session configuration
    #[serde(default)]
    pub accounts: AccountsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// How often expired sessions are purged, in seconds
    #[serde(default = "default_session_sweep_interval")]
    pub session_sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: true,
            request_timeout_secs: default_request_timeout(),
            max_body_size: default_max_body_size(),
            session_sweep_interval_secs: default_session_sweep_interval(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (for development/testing)
    #[default]
    Memory,

    /// PostgreSQL storage
    Postgres {
        /// Connection URL
        url: String,

        /// Maximum connections in pool
        #[serde(default = "default_pool_size")]
        max_connections: u32,

        /// Connection timeout in seconds
        #[serde(default = "default_connection_timeout")]
        connect_timeout_secs: u64,
    },
}

/// Account configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountsConfig {
    /// Session lifetime in hours
    #[serde(default = "default_session_ttl")]
    pub session_ttl_hours: i64,

    /// PBKDF2 rounds for new password hashes
    #[serde(default = "default_password_iterations")]
    pub password_iterations: u32,

    /// Usernames granted staff rights when they register
    #[serde(default)]
    pub staff_usernames: Vec<String>,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: default_session_ttl(),
            password_iterations: default_password_iterations(),
            staff_usernames: Vec::new(),
        }
    }
}

impl AccountsConfig {
    /// Longest accepted session lifetime
    pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

    pub fn is_staff_username(&self, username: &str) -> bool {
        self.staff_usernames.iter().any(|staff| staff == username)
    }

    /// Session lifetime, or `None` when the configured hours are out of range
    pub fn session_ttl(&self) -> Option<chrono::Duration> {
        chrono::Duration::try_hours(self.session_ttl_hours)
    }

    fn validate(&self) -> Result<(), String> {
        if !(1..=Self::MAX_SESSION_TTL_HOURS).contains(&self.session_ttl_hours) {
            return Err(format!(
                "accounts.session_ttl_hours must be between 1 and {}, got {}",
                Self::MAX_SESSION_TTL_HOURS,
                self.session_ttl_hours
            ));
        }
        if self.password_iterations == 0 {
            return Err("accounts.password_iterations must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 8080))
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_body_size() -> usize {
    1024 * 1024
}

fn default_session_sweep_interval() -> u64 {
    15 * 60
}

fn default_pool_size() -> u32 {
    10
}

fn default_connection_timeout() -> u64 {
    5
}

fn default_session_ttl() -> i64 {
    // two weeks
    14 * 24
}

fn default_password_iterations() -> u32 {
    storefront_types::password::DEFAULT_ITERATIONS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl StorefrontConfig {
    /// Load configuration: defaults, then the optional file, then `STOREFRONT__*` variables
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&StorefrontConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Nested keys use a double underscore, e.g. STOREFRONT__SERVER__LISTEN_ADDR
        builder = builder.add_source(
            config::Environment::with_prefix("STOREFRONT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would break the daemon at runtime
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        self.accounts.validate().map_err(config::ConfigError::Message)
    }

    /// Configuration for tests: memory storage and cheap password hashing
    pub fn testing() -> Self {
        Self {
            accounts: AccountsConfig {
                password_iterations: 10,
                staff_usernames: vec!["admin".to_string()],
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StorefrontConfig::default();
        assert_eq!(config.server.listen_addr.port(), 8080);
        assert!(matches!(config.storage, StorageConfig::Memory));
        assert_eq!(config.accounts.session_ttl_hours, 336);
    }

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::default();
        assert!(config.enable_cors);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_staff_usernames() {
        let config = StorefrontConfig::testing();
        assert!(config.accounts.is_staff_username("admin"));
        assert!(!config.accounts.is_staff_username("Admin"));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = StorefrontConfig::load(None).unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(matches!(config.storage, StorageConfig::Memory));
    }

    #[test]
    fn test_postgres_storage_deserializes() {
        let storage: StorageConfig = serde_json::from_value(serde_json::json!({
            "type": "postgres",
            "url": "postgres://localhost/shop"
        }))
        .unwrap();
        match storage {
            StorageConfig::Postgres {
                max_connections,
                connect_timeout_secs,
                ..
            } => {
                assert_eq!(max_connections, 10);
                assert_eq!(connect_timeout_secs, 5);
            }
            StorageConfig::Memory => panic!("expected postgres"),
        }
    }

    #[test]
    fn test_session_ttl_is_bounded() {
        let mut config = StorefrontConfig::testing();
        assert!(config.validate().is_ok());
        assert_eq!(config.accounts.session_ttl(), Some(chrono::Duration::hours(336)));

        config.accounts.session_ttl_hours = i64::MAX;
        assert!(config.accounts.session_ttl().is_none());
        assert!(matches!(
            config.validate(),
            Err(config::ConfigError::Message(msg)) if msg.contains("session_ttl_hours")
        ));

        config.accounts.session_ttl_hours = 0;
        assert!(config.validate().is_err());
    }
}
