use gatepass_core::token::DEFAULT_NAMESPACE;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub registry: RegistryConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RegistryBackend {
    Memory,
    Redis,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistryConfig {
    pub backend: RegistryBackend,
    pub seed_path: Option<String>,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_key_prefix() -> String {
    "gatepass".to_string()
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: default_key_prefix(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScannerConfig {
    /// Capacity of the scan event broadcast channel.
    pub event_buffer: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self { event_buffer: 100 }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Untracked local overrides
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. GATEPASS_REGISTRY__BACKEND=redis
            .add_source(config::Environment::with_prefix("GATEPASS").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn from_toml(source: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 8080

            [registry]
            backend = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.registry.backend, RegistryBackend::Memory);
        assert_eq!(config.registry.namespace, "MI3AD");
        assert!(config.registry.seed_path.is_none());
        assert_eq!(config.redis.key_prefix, "gatepass");
        assert_eq!(config.scanner.event_buffer, 100);
    }

    #[test]
    fn test_redis_backend() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 9000

            [registry]
            backend = "redis"
            seed_path = "config/seed-tickets.json"

            [redis]
            url = "redis://cache:6379"
            key_prefix = "north-gate"

            [scanner]
            event_buffer = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.registry.backend, RegistryBackend::Redis);
        assert_eq!(config.redis.url, "redis://cache:6379");
        assert_eq!(config.redis.key_prefix, "north-gate");
        assert_eq!(config.scanner.event_buffer, 16);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result = Config::from_toml(
            r#"
            [server]
            port = 1
            [registry]
            backend = "postgres"
            "#,
        );
        assert!(result.is_err());
    }
}
