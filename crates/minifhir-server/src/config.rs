use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use minifhir_validation::ProfileStoreConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub fhir: FhirSettings,
    #[serde(default)]
    pub profiles: ProfilesConfig,
    #[serde(default)]
    pub seed: SeedConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.request_timeout_ms == 0 {
            return Err("server.request_timeout_ms must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        if self.profiles.fetch_timeout_secs == 0 {
            return Err("profiles.fetch_timeout_secs must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        let v = self.fhir.version.to_ascii_uppercase();
        let allowed = ["DSTU3", "STU3", "3.0.2"];
        if !allowed.contains(&v.as_str()) {
            return Err(format!(
                "unsupported fhir.version: {} (only dstu3 is supported)",
                self.fhir.version
            ));
        }
        if self
            .seed
            .pattern
            .as_deref()
            .is_some_and(|p| p.trim().is_empty())
        {
            return Err("seed.pattern must not be empty when set".into());
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }

    pub fn profile_store_config(&self) -> ProfileStoreConfig {
        let mut cfg = ProfileStoreConfig::new()
            .with_cache_ttl(Duration::from_secs(self.profiles.cache_ttl_secs))
            .with_cache_version(self.profiles.cache_version)
            .with_fetch_timeout(Duration::from_secs(self.profiles.fetch_timeout_secs));
        if let Some(dir) = self.profiles.cache_dir() {
            cfg = cfg.with_cache_dir(dir);
        }
        cfg
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_ms: default_request_timeout_ms(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FhirSettings {
    #[serde(default = "default_fhir_version")]
    pub version: String,
}
fn default_fhir_version() -> String {
    "dstu3".into()
}
impl Default for FhirSettings {
    fn default() -> Self {
        Self {
            version: default_fhir_version(),
        }
    }
}

/// Profile fetching and disk cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilesConfig {
    /// Empty disables the disk cache.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
    /// Zero disables expiry.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_version")]
    pub cache_version: i64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_cache_dir() -> String {
    ".fhir-cache".into()
}
fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}
fn default_cache_version() -> i64 {
    minifhir_validation::CACHE_VERSION
}
fn default_fetch_timeout_secs() -> u64 {
    15
}

impl ProfilesConfig {
    pub fn cache_dir(&self) -> Option<PathBuf> {
        let dir = self.cache_dir.trim();
        (!dir.is_empty()).then(|| PathBuf::from(dir))
    }
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_version: default_cache_version(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Glob pattern of seed files; unset skips seeding.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Abort startup on the first bad seed resource.
    #[serde(default = "default_seed_strict")]
    pub strict: bool,
}
fn default_seed_strict() -> bool {
    true
}
impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            pattern: None,
            strict: default_seed_strict(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_PATH: &str = "minifhir.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., MINIFHIR__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("MINIFHIR")
                .prefix_separator("__")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
