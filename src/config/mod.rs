use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid duration {0:?}: expected forms like \"90s\", \"15m\", \"24h\", \"7d\"")]
    InvalidDuration(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub database: DatabaseConfig,
    pub client_session: SessionConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
    #[serde(default = "default_connection_limit")]
    pub connection_limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    #[serde(default)]
    pub jwt_signature: String,
    pub expire: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub port: u16,
    pub upload_dir: PathBuf,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_connection_limit() -> u32 {
    10
}

impl AppConfig {
    /// Load from a YAML file, rejecting unknown fields, then apply
    /// environment overrides for the two secrets so they can stay out of
    /// the file (`DAYBOOK_DB_PASSWORD`, `DAYBOOK_JWT_SIGNATURE`).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: AppConfig = serde_yaml::from_str(&raw)?;

        if let Ok(v) = std::env::var("DAYBOOK_DB_PASSWORD") {
            config.database.password = v;
        }
        if let Ok(v) = std::env::var("DAYBOOK_JWT_SIGNATURE") {
            config.client_session.jwt_signature = v;
        }

        // fail at startup, not on the first login
        config.session_lifetime()?;
        Ok(config)
    }

    pub fn session_lifetime(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.client_session.expire)
    }
}

/// Parse a compound duration string: one or more `<number><unit>` terms
/// with units `s`, `m`, `h` or `d` (e.g. `"1h30m"`).
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration(input.to_string());

    if input.is_empty() {
        return Err(invalid());
    }

    let mut total = Duration::zero();
    let mut digits = String::new();

    for ch in input.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let amount: i64 = digits.parse().map_err(|_| invalid())?;
        digits.clear();
        // out-of-range terms and sums are parse failures, not panics
        let term = match ch {
            's' => Duration::try_seconds(amount),
            'm' => Duration::try_minutes(amount),
            'h' => Duration::try_hours(amount),
            'd' => Duration::try_days(amount),
            _ => return Err(invalid()),
        }
        .ok_or_else(invalid)?;
        total = total.checked_add(&term).ok_or_else(invalid)?;
    }

    if !digits.is_empty() {
        return Err(invalid());
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
log_level: debug
database:
  host: localhost
  user: daybook
  password: hunter2
  database: daybook
client_session:
  jwt_signature: not-a-real-secret
  expire: 24h
server:
  port: 8080
  upload_dir: /srv/daybook/uploads
"#;

    #[test]
    fn parses_the_sample_config() {
        let config: AppConfig = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.connection_limit, 10);
        assert_eq!(config.session_lifetime().unwrap(), Duration::hours(24));
        assert_eq!(config.server.upload_dir, PathBuf::from("/srv/daybook/uploads"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let with_typo = SAMPLE.replace("log_level", "log_levl");
        assert!(serde_yaml::from_str::<AppConfig>(&with_typo).is_err());
    }

    #[test]
    fn durations_parse_and_compound() {
        assert_eq!(parse_duration("90s").unwrap(), Duration::seconds(90));
        assert_eq!(parse_duration("15m").unwrap(), Duration::minutes(15));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::minutes(90));
        assert_eq!(parse_duration("7d").unwrap(), Duration::days(7));
    }

    #[test]
    fn malformed_durations_fail() {
        for bad in ["", "h", "10", "10x", "ten minutes"] {
            assert!(parse_duration(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn oversized_durations_are_errors_not_panics() {
        for huge in ["99999999999999999d", "9223372036854775807s1d"] {
            assert!(
                matches!(parse_duration(huge), Err(ConfigError::InvalidDuration(_))),
                "accepted {:?}",
                huge
            );
        }
    }
}
