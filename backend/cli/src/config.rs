/// Warden CLI configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file.
    pub db_path: String,
    /// Default log level when RUST_LOG is unset.
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            db_path: std::env::var("WARDEN_DB").unwrap_or_else(|_| "warden.db".to_string()),
            log_level: std::env::var("WARDEN_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }
}
