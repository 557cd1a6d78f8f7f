//! Plugin-based transport registry
//!
//! The registry allows ingest transports to be registered dynamically at
//! runtime, avoiding hardcoded if-else chains in the daemon.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scale_core::registry::TransportRegistry;
//! use scale_core::config::IngestConfig;
//!
//! let registry = TransportRegistry::new();
//!
//! // Transport crates register themselves during initialization:
//! scale_ingest_udp::register(&registry);
//!
//! // Create a transport from config
//! let transport = registry.create_transport(&config)?;
//! ```

use crate::config::IngestConfig;
use crate::error::{Error, Result};
use crate::traits::{IngestTransport, TransportFactory};
use std::collections::HashMap;
use std::sync::RwLock;

/// Registry for plugin-based transport creation
///
/// Maintains a map of transport type names to factory objects, allowing
/// dynamic instantiation based on configuration.
///
/// ## Thread Safety
///
/// Uses interior mutability with RwLock, allowing concurrent reads and
/// exclusive writes.
#[derive(Default)]
pub struct TransportRegistry {
    /// Registered transport factories
    transports: RwLock<HashMap<String, Box<dyn TransportFactory>>>,
}

impl TransportRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transport factory
    ///
    /// # Parameters
    ///
    /// - `name`: Transport type name (e.g., "udp", "tcp")
    /// - `factory`: Factory object for creating transport instances
    pub fn register_transport(&self, name: impl Into<String>, factory: Box<dyn TransportFactory>) {
        let name = name.into();
        let mut transports = self.transports.write().unwrap();
        transports.insert(name, factory);
    }

    /// Create a transport from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn IngestTransport>)`: Created transport instance
    /// - `Err(Error)`: If the type is not registered or creation fails
    pub fn create_transport(&self, config: &IngestConfig) -> Result<Box<dyn IngestTransport>> {
        let transport_type = config.type_name();
        let transports = self.transports.read().unwrap();

        let factory = transports.get(transport_type).ok_or_else(|| {
            Error::config(format!("Unknown transport type: {}", transport_type))
        })?;

        factory.create(config)
    }

    /// List all registered transport types
    pub fn list_transports(&self) -> Vec<String> {
        let transports = self.transports.read().unwrap();
        transports.keys().cloned().collect()
    }

    /// Check if a transport type is registered
    pub fn has_transport(&self, name: &str) -> bool {
        let transports = self.transports.read().unwrap();
        transports.contains_key(name)
    }
}
