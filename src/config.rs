use crate::core::DEFAULT_MOVEMENT_TOLERANCE_DEG;
use crate::models::RadiusPolicy;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub places: PlacesSettings,
    #[serde(default)]
    pub discovery: DiscoverySettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub sessions: SessionSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlacesSettings {
    #[serde(default = "default_places_endpoint")]
    pub endpoint: String,
    pub api_key: String,
    pub timeout_secs: Option<u64>,
}

fn default_places_endpoint() -> String { crate::services::GOOGLE_MAPS_API_URL.to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverySettings {
    #[serde(default = "default_initial_radius")]
    pub initial_radius_meters: u32,
    #[serde(default = "default_radius_step")]
    pub radius_step_meters: u32,
    #[serde(default = "default_radius_ceiling")]
    pub radius_ceiling_meters: u32,
    #[serde(default = "default_movement_tolerance")]
    pub movement_tolerance_deg: f64,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            initial_radius_meters: default_initial_radius(),
            radius_step_meters: default_radius_step(),
            radius_ceiling_meters: default_radius_ceiling(),
            movement_tolerance_deg: default_movement_tolerance(),
        }
    }
}

impl DiscoverySettings {
    pub fn radius_policy(&self) -> RadiusPolicy {
        RadiusPolicy {
            initial_meters: self.initial_radius_meters,
            step_meters: self.radius_step_meters.max(1),
            ceiling_meters: self.radius_ceiling_meters,
        }
    }
}

fn default_initial_radius() -> u32 { 1500 }
fn default_radius_step() -> u32 { 1500 }
fn default_radius_ceiling() -> u32 { 5000 }
fn default_movement_tolerance() -> f64 { DEFAULT_MOVEMENT_TOLERANCE_DEG }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,
    pub redis_url: Option<String>,
    pub l1_cache_size: Option<u64>,
    pub l1_ttl_secs: Option<u64>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            redis_url: None,
            l1_cache_size: None,
            l1_ttl_secs: None,
        }
    }
}

fn default_store_backend() -> StoreBackend { StoreBackend::Memory }

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_max_sessions")]
    pub max_sessions: u64,
    #[serde(default = "default_idle_secs")]
    pub idle_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            idle_secs: default_idle_secs(),
        }
    }
}

fn default_max_sessions() -> u64 { 10_000 }
fn default_idle_secs() -> u64 { 1800 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with SWIPE_)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., SWIPE__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("SWIPE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("SWIPE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Pick up well-known secrets from plain environment variables
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    // GOOGLE_API_KEY is what the mobile app's build uses
    let api_key = env::var("SWIPE__PLACES__API_KEY")
        .or_else(|_| env::var("GOOGLE_API_KEY"))
        .ok();
    let redis_url = env::var("REDIS_URL").ok();

    let mut builder = Config::builder().add_source(settings);

    if let Some(api_key) = api_key {
        builder = builder.set_override("places.api_key", api_key)?;
    }
    if let Some(redis_url) = redis_url {
        builder = builder.set_override("store.redis_url", redis_url)?;
    }

    builder.build()
}
