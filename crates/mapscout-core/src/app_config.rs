use std::path::PathBuf;

/// User agents rotated across runs when `MAPSCOUT_USER_AGENTS` is unset.
pub const DEFAULT_USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

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

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub search_base_url: String,
    pub navigation_timeout_secs: u64,
    pub consent_timeout_secs: u64,
    pub feed_timeout_secs: u64,
    /// Detail worker pool limit; always at least 1.
    pub concurrency: usize,
    pub scroll_pause_min_ms: u64,
    pub scroll_pause_max_ms: u64,
    pub stagnation_limit: u32,
    pub max_scroll_iterations: u32,
    pub run_deadline_secs: u64,
    pub navigation_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub user_agents: Vec<String>,
    pub chrome_path: Option<PathBuf>,
    pub debug_dump_dir: Option<PathBuf>,
}
