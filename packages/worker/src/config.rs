use common::config::{
    DatabaseConfig, ENV_PREFIX, JudgeConfig, MqAppConfig, config_path,
};
use config::{Config, ConfigError, Environment, File};
use exec_client::ExecutorConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    /// Instance name used in logs. Default: "worker-1".
    #[serde(default = "default_worker_id")]
    pub id: String,
    /// Tasks processed concurrently. Default: 10.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// How often the retry tracker is swept. Default: 300.
    #[serde(default = "default_retry_cleanup_interval_secs")]
    pub retry_cleanup_interval_secs: u64,
}

fn default_worker_id() -> String {
    "worker-1".into()
}
fn default_concurrency() -> usize {
    10
}
fn default_retry_cleanup_interval_secs() -> u64 {
    300
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            id: default_worker_id(),
            concurrency: default_concurrency(),
            retry_cleanup_interval_secs: default_retry_cleanup_interval_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WorkerAppConfig {
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub judge: JudgeConfig,
}

impl WorkerAppConfig {
    /// Defaults, then the optional config file, then `GAVEL__*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(&config_path()).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()
    }
}
