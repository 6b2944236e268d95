use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub rabbitmq_url: String,
    /// Queue receiving one message per dataset record.
    pub data_queue_name: String,
    /// Queue receiving raw payloads pulled by the HTTP collector.
    pub raw_data_queue_name: String,
    pub dataset_path: PathBuf,
    pub scheduler_interval: Duration,
    /// Only the HTTP collector persists data, so this is optional here and
    /// enforced by `mdc-server` at startup.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub source_request_timeout_secs: u64,
    pub persist_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("rabbitmq_url", &"[redacted]")
            .field("data_queue_name", &self.data_queue_name)
            .field("raw_data_queue_name", &self.raw_data_queue_name)
            .field("dataset_path", &self.dataset_path)
            .field("scheduler_interval", &self.scheduler_interval)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "source_request_timeout_secs",
                &self.source_request_timeout_secs,
            )
            .field("persist_timeout_secs", &self.persist_timeout_secs)
            .finish()
    }
}
