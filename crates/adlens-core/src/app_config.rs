use std::path::PathBuf;

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
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub roster_path: PathBuf,
    pub adreal_username: String,
    pub adreal_password: String,
    pub adreal_base_url: String,
    pub market: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub fetch_request_timeout_secs: u64,
    pub fetch_page_limit: u64,
    pub fetch_stats_limit: u64,
    pub fetch_max_concurrent_pages: usize,
    pub fetch_max_retries: u32,
    pub fetch_retry_backoff_ms: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("roster_path", &self.roster_path)
            .field("database_url", &"[redacted]")
            .field("adreal_username", &self.adreal_username)
            .field("adreal_password", &"[redacted]")
            .field("adreal_base_url", &self.adreal_base_url)
            .field("market", &self.market)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "fetch_request_timeout_secs",
                &self.fetch_request_timeout_secs,
            )
            .field("fetch_page_limit", &self.fetch_page_limit)
            .field("fetch_stats_limit", &self.fetch_stats_limit)
            .field(
                "fetch_max_concurrent_pages",
                &self.fetch_max_concurrent_pages,
            )
            .field("fetch_max_retries", &self.fetch_max_retries)
            .field("fetch_retry_backoff_ms", &self.fetch_retry_backoff_ms)
            .finish()
    }
}
