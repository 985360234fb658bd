use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub templates: TemplateConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    /// Shared key required in `X-API-Key`; unset disables the check
    pub key: Option<String>,
}

/// Redis pub/sub event ingestion
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Channels or patterns carrying event envelopes
    #[serde(default)]
    pub channels: Vec<String>,
    /// Dispatches from Redis messages allowed to run at once
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
    #[serde(default = "default_true")]
    pub run_migrations: bool,
    /// Consecutive query failures before storage calls fail fast
    #[serde(default = "default_circuit_failure_threshold")]
    pub circuit_failure_threshold: u32,
    #[serde(default = "default_circuit_reset_timeout")]
    pub circuit_reset_timeout_ms: u64,
}

/// Which backend stores settings and notification records
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// "memory" (default) or "postgres"
    #[serde(default = "default_storage_backend")]
    pub backend: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Upper bound for a single channel send
    #[serde(default = "default_channel_timeout")]
    pub channel_timeout_ms: u64,
    /// Address channels by user id when the directory has no entry
    #[serde(default = "default_true")]
    pub recipient_fallback_to_user_id: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RulesConfig {
    /// Critical events ignore quiet hours
    #[serde(default = "default_true")]
    pub critical_bypasses_quiet_hours: bool,
    /// Offset of the wall clock quiet hours are written in
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateConfig {
    /// Reject renders with missing variables instead of blanking them
    #[serde(default)]
    pub strict: bool,
    /// JSON file with an array of templates loaded at startup
    #[serde(default)]
    pub seed_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
    /// Emit logs as JSON lines instead of text
    #[serde(default)]
    pub json_logs: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_true() -> bool {
    true
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_max_in_flight() -> usize {
    32
}

fn default_database_url() -> String {
    "postgres://localhost:5432/notifications".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_idle_timeout() -> u64 {
    600 // 10 minutes
}

fn default_circuit_failure_threshold() -> u32 {
    5
}

fn default_circuit_reset_timeout() -> u64 {
    30_000 // 30 seconds
}

fn default_storage_backend() -> String {
    "memory".to_string()
}

fn default_channel_timeout() -> u64 {
    5_000 // 5 seconds
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "notification-router".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8081)?
            .set_default("storage.backend", "memory")?
            .set_default("dispatch.channel_timeout_ms", 5_000)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // NOTIFY_SERVER__PORT, NOTIFY_STORAGE__BACKEND, NOTIFY_DISPATCH__CHANNEL_TIMEOUT_MS, ...
            .add_source(
                Environment::with_prefix("NOTIFY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("redis.channels"),
            );

        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that deserialize but cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatch.channel_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "dispatch.channel_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.redis.max_in_flight == 0 {
            return Err(ConfigError::Message(
                "redis.max_in_flight must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            api: ApiConfig::default(),
            redis: RedisConfig::default(),
            database: DatabaseConfig::default(),
            storage: StorageConfig::default(),
            dispatch: DispatchConfig::default(),
            rules: RulesConfig::default(),
            templates: TemplateConfig::default(),
            otel: OtelConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_redis_url(),
            channels: vec![],
            max_in_flight: default_max_in_flight(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            pool_size: default_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
            run_migrations: true,
            circuit_failure_threshold: default_circuit_failure_threshold(),
            circuit_reset_timeout_ms: default_circuit_reset_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            channel_timeout_ms: default_channel_timeout(),
            recipient_fallback_to_user_id: true,
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            critical_bypasses_quiet_hours: true,
            utc_offset_minutes: 0,
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8081);
        assert_eq!(settings.storage.backend, "memory");
        assert_eq!(settings.dispatch.channel_timeout_ms, 5_000);
        assert!(settings.rules.critical_bypasses_quiet_hours);
        assert!(!settings.templates.strict);
        assert!(!settings.redis.enabled);
        assert!(!settings.otel.enabled);
    }

    #[test]
    fn test_partial_sections_deserialize_with_defaults() {
        let settings: Settings = serde_json::from_value(serde_json::json!({
            "server": {"port": 9000},
            "rules": {"utc_offset_minutes": 120},
            "templates": {"strict": true}
        }))
        .unwrap();

        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.rules.utc_offset_minutes, 120);
        assert!(settings.rules.critical_bypasses_quiet_hours);
        assert!(settings.templates.strict);
        assert_eq!(settings.database.pool_size, 10);
    }

    #[test]
    fn test_zero_channel_timeout_rejected() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());

        settings.dispatch.channel_timeout_ms = 0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("channel_timeout_ms"));

        let mut settings = Settings::default();
        settings.redis.max_in_flight = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_server_addr() {
        let settings = Settings::default();
        assert_eq!(settings.server_addr(), "0.0.0.0:8081");
    }
}
