//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the lookup server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (port, backlog, connection limit).
    pub listener: ListenerConfig,

    /// Directory static files are served from.
    pub web_root: String,

    /// Lookup backend the proxy handler talks to.
    pub backend: BackendConfig,

    /// Static file serving settings.
    pub files: FilesConfig,

    /// Lookup route settings.
    pub lookup: LookupConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            web_root: ".".to_string(),
            backend: BackendConfig::default(),
            files: FilesConfig::default(),
            lookup: LookupConfig::default(),
            limits: LimitsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (all interfaces by default).
    pub bind_address: String,

    /// TCP port to listen on. Zero picks an ephemeral port.
    pub port: u16,

    /// Pending connection queue length passed to `listen(2)`.
    pub backlog: u32,

    /// Maximum connections handled at once (backpressure).
    /// A value of 1 serves connections strictly one after another.
    pub max_connections: usize,

    /// Seconds to wait for open connections after shutdown is signalled.
    pub shutdown_grace_secs: u64,
}

impl ListenerConfig {
    /// The `host:port` string the listener binds to.
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            backlog: 5,
            max_connections: 64,
            shutdown_grace_secs: 10,
        }
    }
}

/// Lookup backend address.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Host name or address, resolved once at startup.
    pub host: String,

    /// Backend TCP port.
    pub port: u16,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9999,
        }
    }
}

/// Static file serving configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilesConfig {
    /// File name substituted when the URI ends in `/`.
    pub index_file: String,

    /// Size of each read/write chunk when streaming a file.
    pub chunk_size: usize,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            index_file: "index.html".to_string(),
            chunk_size: 4096,
        }
    }
}

/// Lookup route configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LookupConfig {
    /// URI prefix routed to the lookup handler.
    pub path_prefix: String,

    /// Query parameter carrying the lookup key.
    pub key_param: String,
}

impl LookupConfig {
    /// Literal prefix preceding the key, e.g. `/mdb-lookup?key=`.
    pub fn key_prefix(&self) -> String {
        format!("{}?{}=", self.path_prefix, self.key_param)
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            path_prefix: "/mdb-lookup".to_string(),
            key_param: "key".to_string(),
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Longest request or header line accepted in one piece. Also bounds
    /// each row read from the lookup backend.
    pub max_line_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: 8192,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default `EnvFilter` directive, used when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Output format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "lookup_httpd=info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_wire_conventions() {
        let config = ServerConfig::default();
        assert_eq!(config.listener.backlog, 5);
        assert_eq!(config.listener.shutdown_grace_secs, 10);
        assert_eq!(config.files.index_file, "index.html");
        assert_eq!(config.files.chunk_size, 4096);
        assert_eq!(config.lookup.key_prefix(), "/mdb-lookup?key=");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            web_root = "/srv/www"

            [listener]
            port = 8888

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.web_root, "/srv/www");
        assert_eq!(config.listener.port, 8888);
        assert_eq!(config.listener.bind_address, "0.0.0.0");
        assert_eq!(config.listener.socket_address(), "0.0.0.0:8888");
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.backend.port, 9999);
    }
}
