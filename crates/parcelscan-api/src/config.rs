use std::env;
use std::path::PathBuf;

/// Service configuration, read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Socket address to bind (`PARCELSCAN_API_BIND`)
    pub bind_addr: String,
    /// Path of the backing database file (`PARCELSCAN_API_DB`)
    pub db_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bind_addr =
            env::var("PARCELSCAN_API_BIND").unwrap_or_else(|_| "0.0.0.0:8787".to_string());
        let db_path = env::var_os("PARCELSCAN_API_DB")
            .map_or_else(|| PathBuf::from("parcelscan-api.db"), PathBuf::from);
        Self { bind_addr, db_path }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        // Only meaningful when the env vars are unset, as in CI.
        if env::var_os("PARCELSCAN_API_BIND").is_none() {
            let config = AppConfig::from_env();
            assert_eq!(config.bind_addr, "0.0.0.0:8787");
        }
    }
}
