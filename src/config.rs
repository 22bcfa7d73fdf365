//! # Configuration Management
//!
//! Centralized configuration for SMB client sessions.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides (`SMB_PROTOCOL_*`)
//!
//! Durations are serialized as milliseconds.

use crate::core::codec::MAX_FRAME_SIZE;
use crate::core::packet::{DEFAULT_BUFFER_SIZE, MIN_BUFFER_SIZE};
use crate::error::{ProtocolError, Result};
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Well-known SMB over TCP port
pub const SMB_PORT: u16 = 445;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SmbConfig {
    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub signing: SigningConfig,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SmbConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("SMB_PROTOCOL_SERVER_ADDRESS") {
            config.client.address = addr;
        }

        if let Ok(timeout) = std::env::var("SMB_PROTOCOL_CONNECTION_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.client.connection_timeout = Duration::from_millis(val);
            }
        }

        if let Ok(timeout) = std::env::var("SMB_PROTOCOL_RESPONSE_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.client.response_timeout = Duration::from_millis(val);
            }
        }

        if let Ok(size) = std::env::var("SMB_PROTOCOL_BUFFER_SIZE") {
            if let Ok(val) = size.parse::<usize>() {
                config.client.buffer_size = val;
            }
        }

        if let Ok(dump) = std::env::var("SMB_PROTOCOL_DUMP_PACKETS") {
            if let Ok(val) = dump.parse::<bool>() {
                config.client.dump_packets = val;
            }
        }

        if let Ok(verify) = std::env::var("SMB_PROTOCOL_VERIFY_SIGNATURES") {
            if let Ok(val) = verify.parse::<bool>() {
                config.signing.verify_received = val;
            }
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.client.validate());
        errors.extend(self.transport.validate());
        errors.extend(self.logging.validate());

        if self.client.buffer_size > self.transport.max_frame_size + crate::core::packet::HEADER_LEN {
            errors.push(format!(
                "Buffer size {} exceeds the largest NetBIOS frame ({} bytes)",
                self.client.buffer_size, self.transport.max_frame_size
            ));
        }

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Client session configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Server address as `host:port`
    pub address: String,

    /// Timeout for connection attempts
    #[serde(with = "duration_serde")]
    pub connection_timeout: Duration,

    /// Timeout for waiting on the response to a request
    #[serde(with = "duration_serde")]
    pub response_timeout: Duration,

    /// Default wait used when polling for unsolicited packets
    #[serde(with = "duration_serde")]
    pub async_poll_timeout: Duration,

    /// Capacity of packets from `SmbSession::new_packet`, NetBIOS header included
    pub buffer_size: usize,

    /// Process id stamped on every request
    pub process_id: u16,

    /// Log a decoded dump of every matched response
    #[serde(default)]
    pub dump_packets: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: format!("127.0.0.1:{SMB_PORT}"),
            connection_timeout: timeout::DEFAULT_TIMEOUT,
            response_timeout: timeout::RESPONSE_TIMEOUT,
            async_poll_timeout: timeout::ASYNC_POLL_TIMEOUT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            process_id: 1,
            dump_packets: false,
        }
    }
}

impl ClientConfig {
    /// Validate client configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Client address cannot be empty".to_string());
        } else {
            match self.address.rsplit_once(':') {
                Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {}
                _ => errors.push(format!(
                    "Invalid client address format: '{}' (expected format: 'fileserver:445')",
                    self.address
                )),
            }
        }

        if self.connection_timeout.as_millis() < 100 {
            errors.push("Connection timeout too short (minimum: 100ms)".to_string());
        } else if self.connection_timeout.as_secs() > 300 {
            errors.push("Connection timeout too long (maximum: 300s)".to_string());
        }

        if self.response_timeout.as_millis() < 100 {
            errors.push("Response timeout too short (minimum: 100ms)".to_string());
        }

        if self.async_poll_timeout.is_zero() {
            errors.push("Async poll timeout must be greater than 0".to_string());
        }

        if self.buffer_size < MIN_BUFFER_SIZE {
            errors.push(format!(
                "Buffer size too small: {} (minimum: {MIN_BUFFER_SIZE})",
                self.buffer_size
            ));
        }

        errors
    }
}

/// Signing behaviour once a session enables it
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SigningConfig {
    /// Verify the signature of matched responses
    pub verify_received: bool,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            verify_received: true,
        }
    }
}

/// Transport configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    /// Largest NetBIOS frame payload accepted
    pub max_frame_size: usize,

    /// Disable Nagle's algorithm on TCP connections
    pub nodelay: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
            nodelay: true,
        }
    }
}

impl TransportConfig {
    /// Validate transport configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_frame_size < crate::core::packet::MIN_RX_LEN {
            errors.push(format!(
                "Max frame size too small: {} (minimum: {})",
                self.max_frame_size,
                crate::core::packet::MIN_RX_LEN
            ));
        } else if self.max_frame_size > MAX_FRAME_SIZE {
            errors.push(format!(
                "Max frame size too large: {} (NetBIOS limit: {MAX_FRAME_SIZE})",
                self.max_frame_size
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to log to file
    pub log_to_file: bool,

    /// Path to log file (if log_to_file is true)
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("smb-protocol"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        if self.log_to_file {
            if let Some(ref path) = self.log_file_path {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            } else {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
        }

        if !self.log_to_console && !self.log_to_file {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
