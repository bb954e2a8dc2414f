use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            gateway: GatewayConfig::default(),
            providers: ProvidersConfig::default(),
            build: BuildConfig::default(),
            http_server: HttpServerConfig::default(),
        }
    }
}

/// Request gateway configuration (cache and retry)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Lifetime of a cached response in seconds
    pub cache_ttl_secs: u64,
    /// Maximum number of cached responses
    pub cache_capacity: usize,
    /// Extra attempts after the first failed one
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Per-attempt HTTP timeout
    pub request_timeout_secs: u64,
    /// Also retry 4xx responses (other than 429)
    ///
    /// Off by default so hub error bodies come back as answers. `true` retries
    /// every non-2xx status.
    pub retry_client_errors: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 60 * 60,
            cache_capacity: 4096,
            max_retries: 5,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
            request_timeout_secs: 30,
            retry_client_errors: false,
        }
    }
}

/// Upstream provider endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Name registry used to resolve handles
    pub registry_url: String,
    /// Hub HTTP API used for profiles, links and readiness
    pub hub_url: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            registry_url: "https://fnames.farcaster.xyz".to_string(),
            hub_url: "https://hub.pinata.cloud".to_string(),
        }
    }
}

/// Graph build tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub readiness_timeout_secs: u64,
    /// Upper bound for a whole build, readiness check included
    pub deadline_secs: u64,
    /// Concurrent relationship probes
    pub probe_concurrency: usize,
    /// Concurrent handle resolutions and profile lookups
    pub lookup_concurrency: usize,
    /// Largest handle list one build accepts (n handles cost n·(n−1) probes)
    pub max_handles: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            readiness_timeout_secs: 5,
            deadline_secs: 600,
            probe_concurrency: 8,
            lookup_concurrency: 16,
            max_handles: 50,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    /// Largest graph `POST /api/metrics` accepts
    pub max_nodes: usize,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            // Empty means any origin (local dev)
            allowed_origins: vec![],
            max_nodes: 500,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in FOLLOWGRAPH_CONFIG environment variable (must exist)
    /// 2. ./config.toml in current directory (defaults are used when absent)
    pub fn load() -> Result<Self> {
        let _ = dotenv::dotenv();

        let config = match std::env::var("FOLLOWGRAPH_CONFIG") {
            Ok(path) => Self::from_path(PathBuf::from(path))?,
            Err(_) => {
                let path = PathBuf::from("config.toml");
                if path.exists() {
                    Self::from_path(path)?
                } else {
                    log::debug!("No config.toml found, using defaults");
                    Self::default()
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        let config_str = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("providers.registry_url", &self.providers.registry_url),
            ("providers.hub_url", &self.providers.hub_url),
        ] {
            url::Url::parse(value).with_context(|| format!("{} is not a valid URL: {}", name, value))?;
        }

        if self.gateway.cache_ttl_secs == 0 {
            anyhow::bail!("gateway.cache_ttl_secs must be greater than 0");
        }

        if self.gateway.cache_capacity == 0 {
            anyhow::bail!("gateway.cache_capacity must be greater than 0");
        }

        if self.gateway.initial_backoff_ms > self.gateway.max_backoff_ms {
            anyhow::bail!("gateway.initial_backoff_ms must not exceed gateway.max_backoff_ms");
        }

        if self.build.probe_concurrency == 0 || self.build.lookup_concurrency == 0 {
            anyhow::bail!("build.probe_concurrency and build.lookup_concurrency must be greater than 0");
        }

        if self.build.max_handles == 0 || self.http_server.max_nodes == 0 {
            anyhow::bail!("build.max_handles and http_server.max_nodes must be greater than 0");
        }

        if self.build.readiness_timeout_secs == 0 {
            anyhow::bail!("build.readiness_timeout_secs must be greater than 0");
        }

        if self.build.deadline_secs < self.build.readiness_timeout_secs {
            anyhow::bail!("build.deadline_secs must be at least build.readiness_timeout_secs");
        }

        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.gateway.cache_ttl_secs)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_secs(self.build.readiness_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    const TEST_CONFIG: &str = r#"
log_level = "debug"

[gateway]
cache_ttl_secs = 600
max_retries = 3

[providers]
hub_url = "http://127.0.0.1:2281"

[build]
probe_concurrency = 4
"#;

    fn with_config_env(config_path: &std::path::Path, f: impl FnOnce()) {
        let original = std::env::var("FOLLOWGRAPH_CONFIG").ok();
        std::env::set_var("FOLLOWGRAPH_CONFIG", config_path.to_str().unwrap());
        f();
        std::env::remove_var("FOLLOWGRAPH_CONFIG");
        if let Some(val) = original {
            std::env::set_var("FOLLOWGRAPH_CONFIG", val);
        }
    }

    #[test]
    fn test_config_load_success() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, TEST_CONFIG).unwrap();
        with_config_env(&config_path, || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
            let config = config.unwrap();
            assert_eq!(config.log_level, "debug");
            assert_eq!(config.cache_ttl(), Duration::from_secs(600));
            assert_eq!(config.gateway.max_retries, 3);
            assert_eq!(config.build.probe_concurrency, 4);
            // Untouched fields keep their defaults
            assert_eq!(config.build.lookup_concurrency, 16);
            assert_eq!(config.providers.registry_url, "https://fnames.farcaster.xyz");
        });
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gateway.max_retries, 5);
        assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.readiness_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_config_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.build.probe_concurrency = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("probe_concurrency"));
    }

    #[test]
    fn test_config_rejects_zero_limits() {
        let mut config = Config::default();
        config.build.max_handles = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_handles"));
    }

    #[test]
    fn test_config_rejects_bad_url() {
        let mut config = Config::default();
        config.providers.hub_url = "not a url".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("providers.hub_url"));
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        with_config_env(std::path::Path::new("nonexistent.toml"), || {
            assert!(Config::load().is_err());
        });
    }
}
