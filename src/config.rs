//! Configuration System
//!
//! Layered configuration for the itinerary service: built-in defaults, the
//! user config file, workspace config files, then `BOTTLE__*` environment
//! variables. The Azure Maps key may also come from `MAPS_SUB_KEY`.

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Search and routing provider
    #[serde(default)]
    pub maps: MapsConfig,

    /// Journey document store
    #[serde(default)]
    pub storage: StorageConfig,

    /// Delayed retrigger queue
    #[serde(default)]
    pub queue: QueueConfig,

    /// Broadcast channel
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// HTTP adapter
    #[serde(default)]
    pub server: ServerConfig,

    /// Per-bottle extension lease
    #[serde(default)]
    pub lease: LeaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapsConfig {
    /// Azure Maps subscription key
    #[serde(default)]
    pub subscription_key: Option<String>,

    /// Override for the Azure Maps endpoint
    #[serde(default)]
    pub base_url: Option<String>,

    /// Search radius around the jittered center, in meters
    #[serde(default = "default_search_radius_m")]
    pub search_radius_m: f64,

    /// Per-request timeout, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_search_radius_m() -> f64 {
    crate::geo::DEFAULT_SEARCH_RADIUS_M
}

fn default_timeout_secs() -> u64 {
    crate::geo::DEFAULT_PROVIDER_TIMEOUT.as_secs()
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            subscription_key: None,
            base_url: None,
            search_radius_m: default_search_radius_m(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl MapsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sled,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,

    /// Store directory; relative paths resolve against the workspace root
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_backend() -> StorageBackend {
    StorageBackend::Sled
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".driftbottle/store")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_store_path(),
        }
    }
}

impl StorageConfig {
    pub fn resolve_path(&self, workspace_root: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            workspace_root.join(&self.path)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_queue_name")]
    pub name: String,
}

fn default_queue_name() -> String {
    "bottle-retrigger".to_string()
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: default_queue_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Messages buffered per slow subscriber before it starts lagging
    #[serde(default = "default_broadcast_capacity")]
    pub capacity: usize,
}

fn default_broadcast_capacity() -> usize {
    64
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            capacity: default_broadcast_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Where the retrigger dispatcher posts due messages.
    /// Defaults to this server's own route function.
    #[serde(default)]
    pub route_function_url: Option<String>,

    /// How long one retrigger may wait for the route function to answer.
    /// A bootstrap makes two rounds of provider calls, so this must exceed
    /// twice `maps.timeout_secs`.
    #[serde(default = "default_retrigger_timeout_secs")]
    pub retrigger_timeout_secs: u64,
}

fn default_bind() -> String {
    "127.0.0.1:7071".to_string()
}

fn default_retrigger_timeout_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            route_function_url: None,
            retrigger_timeout_secs: default_retrigger_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn retrigger_timeout(&self) -> Duration {
        Duration::from_secs(self.retrigger_timeout_secs)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.bind)
    }

    pub fn route_function_url(&self) -> String {
        self.route_function_url
            .clone()
            .unwrap_or_else(|| format!("{}/api/route-function", self.base_url()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseConfig {
    #[serde(default = "default_lease_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_lease_ttl_secs() -> u64 {
    crate::route_function::DEFAULT_LEASE_TTL.as_secs()
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_lease_ttl_secs(),
        }
    }
}

impl LeaseConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Maps(String),
    Storage(String),
    Queue(String),
    Server(String),
    Lease(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Maps(msg) => write!(f, "maps: {}", msg),
            ValidationError::Storage(msg) => write!(f, "storage: {}", msg),
            ValidationError::Queue(msg) => write!(f, "queue: {}", msg),
            ValidationError::Server(msg) => write!(f, "server: {}", msg),
            ValidationError::Lease(msg) => write!(f, "lease: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl DriftConfig {
    /// Validate the entire configuration, collecting every problem
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        match self.maps.subscription_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {}
            _ => errors.push(ValidationError::Maps(
                "subscription_key is required (set MAPS_SUB_KEY or BOTTLE__MAPS__SUBSCRIPTION_KEY)"
                    .to_string(),
            )),
        }
        if !(self.maps.search_radius_m.is_finite() && self.maps.search_radius_m > 0.0) {
            errors.push(ValidationError::Maps(format!(
                "search_radius_m must be positive, got {}",
                self.maps.search_radius_m
            )));
        }
        if self.maps.timeout_secs == 0 {
            errors.push(ValidationError::Maps("timeout_secs must be at least 1".to_string()));
        }

        if self.storage.backend == StorageBackend::Sled && self.storage.path.as_os_str().is_empty()
        {
            errors.push(ValidationError::Storage("path cannot be empty".to_string()));
        }

        if self.queue.name.trim().is_empty() {
            errors.push(ValidationError::Queue("name cannot be empty".to_string()));
        }

        if self.server.bind.trim().is_empty() {
            errors.push(ValidationError::Server("bind cannot be empty".to_string()));
        }
        let url = self.server.route_function_url();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ValidationError::Server(format!(
                "route_function_url must be an http(s) URL, got {}",
                url
            )));
        }

        let provider_rounds = self.maps.timeout_secs.saturating_mul(2);
        if self.server.retrigger_timeout_secs <= provider_rounds {
            errors.push(ValidationError::Server(format!(
                "retrigger_timeout_secs must exceed twice maps.timeout_secs ({}), got {}",
                provider_rounds, self.server.retrigger_timeout_secs
            )));
        }

        if self.lease.ttl_secs == 0 {
            errors.push(ValidationError::Lease("ttl_secs must be at least 1".to_string()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
