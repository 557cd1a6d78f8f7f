//! Configuration types for the scale telemetry system
//!
//! This module defines all configuration structures used throughout the
//! crate. Ports, the allowed sender, and file paths are deployment
//! constants: the defaults below mirror the reference deployment and are
//! overridden by the daemon's environment variables, never negotiated at
//! runtime.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleConfig {
    /// Ingestion transport configuration
    pub ingest: IngestConfig,

    /// Query service configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Audit trail configuration
    #[serde(default)]
    pub audit: AuditConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl ScaleConfig {
    /// Create a configuration with the reference-deployment defaults
    pub fn new() -> Self {
        Self {
            ingest: IngestConfig::default(),
            api: ApiConfig::default(),
            audit: AuditConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.ingest.validate()?;
        self.audit.validate()?;

        if self.api.port == 0 {
            return Err(crate::Error::config("API port cannot be 0"));
        }

        Ok(())
    }
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Ingestion transport configuration
///
/// One deployment runs exactly one variant; both use the same numeric
/// port value in the reference deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IngestConfig {
    /// Connectionless transport: datagrams filtered by address and port
    Udp {
        /// Port to listen on
        port: u16,
        /// The single allowed sender address
        allowed_ip: IpAddr,
        /// The fixed sender source port
        allowed_port: u16,
    },

    /// Connection-oriented transport: connections filtered by address only
    Tcp {
        /// Port to listen on
        port: u16,
        /// The single allowed sender address
        allowed_ip: IpAddr,
    },
}

impl IngestConfig {
    /// Validate the transport configuration
    ///
    /// Port 0 (kernel-assigned) is permitted so tests can bind an
    /// ephemeral endpoint; only the allowed sender port must be fixed.
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            IngestConfig::Udp { allowed_port, .. } => {
                if *allowed_port == 0 {
                    return Err(crate::Error::config("allowed sender port cannot be 0"));
                }
                Ok(())
            }
            IngestConfig::Tcp { .. } => Ok(()),
        }
    }

    /// Get the transport type name used by the registry
    pub fn type_name(&self) -> &'static str {
        match self {
            IngestConfig::Udp { .. } => "udp",
            IngestConfig::Tcp { .. } => "tcp",
        }
    }

    /// The configured listening port
    pub fn port(&self) -> u16 {
        match self {
            IngestConfig::Udp { port, .. } | IngestConfig::Tcp { port, .. } => *port,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig::Udp {
            port: default_ingest_port(),
            allowed_ip: default_allowed_ip(),
            allowed_port: default_allowed_port(),
        }
    }
}

/// Query service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Port the HTTP query service listens on
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Single allowed CORS origin; `None` allows any origin
    #[serde(default = "default_cors_origin")]
    pub cors_origin: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

/// Audit trail configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditConfig {
    /// Append-only JSONL file
    #[default]
    File,

    /// JSONL file at a custom path
    FileAt {
        /// Path to the audit log
        path: String,
    },

    /// No audit trail (connection-oriented deployments)
    Disabled,
}

impl AuditConfig {
    /// Validate the audit configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            AuditConfig::FileAt { path } if path.is_empty() => {
                Err(crate::Error::config("audit path cannot be empty"))
            }
            _ => Ok(()),
        }
    }

    /// Resolved log path, `None` when auditing is disabled
    pub fn path(&self) -> Option<&str> {
        match self {
            AuditConfig::File => Some(DEFAULT_AUDIT_PATH),
            AuditConfig::FileAt { path } => Some(path),
            AuditConfig::Disabled => None,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Pause after a per-iteration processing error (in seconds)
    ///
    /// A single bad packet must never terminate the listener; the loop
    /// resumes after this fixed backoff.
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,

    /// Capacity of the internal event channel
    ///
    /// When full, new engine events are dropped (with a warning log) so
    /// a slow consumer cannot grow memory without bound.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            error_backoff_secs: default_error_backoff_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Default audit log path of the reference deployment
pub const DEFAULT_AUDIT_PATH: &str = "data/scale_data.json";

fn default_ingest_port() -> u16 {
    3666
}

fn default_allowed_ip() -> IpAddr {
    IpAddr::from([192, 168, 0, 199])
}

fn default_allowed_port() -> u16 {
    5001
}

fn default_api_port() -> u16 {
    7001
}

fn default_cors_origin() -> Option<String> {
    Some("http://localhost:3000".to_string())
}

fn default_error_backoff_secs() -> u64 {
    1
}

fn default_event_channel_capacity() -> usize {
    1000
}
