//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! framework. All types derive Serde traits for deserialization from
//! config files, and every section falls back to its defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Application directories and response charset.
    pub app: ApplicationConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:5000").
    pub bind_address: String,

    /// Largest request body read into a request context.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5000".to_string(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Where the application lives and how it encodes responses.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application root; relative directories below resolve against it.
    pub root_dir: PathBuf,

    /// Static asset directory. Request paths containing this string are
    /// treated as static asset requests.
    pub static_dir: String,

    /// Template directory.
    pub template_dir: String,

    /// Charset for text and JSON bodies.
    pub charset: String,

    /// Secret for obscured cookies.
    pub cookie_secret: Option<String>,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            static_dir: "static".to_string(),
            template_dir: "templates".to_string(),
            charset: "UTF-8".to_string(),
            cookie_secret: None,
        }
    }
}

impl ApplicationConfig {
    /// `dir` joined onto the root unless it is already absolute.
    pub fn resolve(&self, dir: impl AsRef<Path>) -> PathBuf {
        let dir = dir.as_ref();
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.root_dir.join(dir)
        }
    }

    /// Directories searched for static files and templates, in order:
    /// root, static dir, template dir.
    pub fn candidate_dirs(&self) -> Vec<PathBuf> {
        vec![
            self.root_dir.clone(),
            self.resolve(&self.static_dir),
            self.resolve(&self.template_dir),
        ]
    }

    /// Substring identifying static asset requests.
    pub fn static_marker(&self) -> &str {
        self.static_dir.trim_start_matches("./").trim_matches('/')
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub log_level: String,

    /// Log format: "pretty" or "json".
    pub log_format: String,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Address the exporter listens on.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
