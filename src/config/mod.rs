mod settings;

pub use settings::{
    ApiConfig, DatabaseConfig, DispatchConfig, OtelConfig, RedisConfig, RulesConfig, ServerConfig,
    Settings, StorageConfig, TemplateConfig,
};
