use common::config::{DatabaseConfig, ENV_PREFIX, JudgeConfig, MqAppConfig, config_path};
use config::{Config, ConfigError, Environment, File};
use exec_client::ExecutorConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    #[serde(default)]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            max_age: default_cors_max_age(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors: CorsConfig::default(),
        }
    }
}

/// Bounds applied to incoming submissions before they are accepted.
#[derive(Debug, Deserialize, Clone)]
pub struct SubmissionConfig {
    /// Source size cap in bytes. Default: 65536.
    #[serde(default = "default_max_code_bytes")]
    pub max_code_bytes: usize,
    /// Default: 15000.
    #[serde(default = "default_max_time_limit_ms")]
    pub max_time_limit_ms: i32,
    /// Default: 524288 (512 MB).
    #[serde(default = "default_max_memory_limit_kb")]
    pub max_memory_limit_kb: i32,
}

fn default_max_code_bytes() -> usize {
    64 * 1024
}
fn default_max_time_limit_ms() -> i32 {
    15_000
}
fn default_max_memory_limit_kb() -> i32 {
    512 * 1024
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            max_code_bytes: default_max_code_bytes(),
            max_time_limit_ms: default_max_time_limit_ms(),
            max_memory_limit_kb: default_max_memory_limit_kb(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub judge: JudgeConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            // Load from config/config.toml unless GAVEL_CONFIG points elsewhere
            .add_source(File::with_name(&config_path()).required(false))
            // Override from environment (e.g., GAVEL__JUDGE__CALLBACK_BASE_URL)
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
