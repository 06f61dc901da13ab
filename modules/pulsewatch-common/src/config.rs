use std::env;

use crate::error::PulseWatchError;

/// Infrastructure configuration loaded from environment variables.
/// Taxonomy and keyword tables live in the TOML file config instead.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Optional API credentials
    pub youtube_api_key: Option<String>,

    // Pipeline
    pub data_retention_days: u32,
    pub run_interval_hours: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, PulseWatchError> {
        Ok(Self {
            database_url: required_env("DATABASE_URL")?,
            youtube_api_key: env::var("YOUTUBE_API_KEY").ok(),
            data_retention_days: parse_env("DATA_RETENTION_DAYS", 90)?,
            run_interval_hours: parse_env("RUN_INTERVAL_HOURS", 6)?,
        })
    }
}

fn required_env(key: &str) -> Result<String, PulseWatchError> {
    env::var(key).map_err(|_| PulseWatchError::Config(format!("{key} must be set")))
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, PulseWatchError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| PulseWatchError::Config(format!("{key} must be a number, got '{raw}'"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env mutation is process-global; this is the only test in the
    // workspace that touches these vars.
    #[test]
    fn missing_database_url_is_a_config_error() {
        env::remove_var("DATABASE_URL");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, PulseWatchError::Config(_)));
        assert!(err.to_string().contains("DATABASE_URL"));

        env::set_var("DATABASE_URL", "postgres://localhost/pulsewatch");
        env::set_var("DATA_RETENTION_DAYS", "not-a-number");
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("DATA_RETENTION_DAYS"));

        env::set_var("DATA_RETENTION_DAYS", "30");
        env::remove_var("RUN_INTERVAL_HOURS");
        let config = Config::from_env().unwrap();
        assert_eq!(config.data_retention_days, 30);
        assert_eq!(config.run_interval_hours, 6);
    }
}
