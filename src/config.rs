use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub stats_log_path: String,
    pub settlement: SettlementTimeouts,
    pub screen_width: i64,
}

/// Per-pair settlement timeouts: a base value with per-coin overrides for
/// slow chains. A swap is considered expired 2x this value past its quote
/// timestamp.
#[derive(Debug, Clone)]
pub struct SettlementTimeouts {
    default_secs: i64,
    overrides: HashMap<String, i64>,
}

impl SettlementTimeouts {
    pub fn new(default_secs: i64) -> Self {
        SettlementTimeouts {
            default_secs,
            overrides: HashMap::new(),
        }
    }

    pub fn with_overrides(default_secs: i64, overrides: HashMap<String, i64>) -> Self {
        SettlementTimeouts {
            default_secs,
            overrides,
        }
    }

    /// Timeout for a pair: the slower coin wins.
    pub fn pair_timeout(&self, base: &str, rel: &str) -> i64 {
        let base_secs = self.overrides.get(base).copied().unwrap_or(self.default_secs);
        let rel_secs = self.overrides.get(rel).copied().unwrap_or(self.default_secs);
        self.default_secs.max(base_secs).max(rel_secs)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let stats_log_path = env_map
            .get("STATS_LOG_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("STATS_LOG_PATH".to_string()))?;

        let default_secs = env_map
            .get("SETTLEMENT_TIMEOUT_SECS")
            .map(|s| s.as_str())
            .unwrap_or("3600")
            .parse::<i64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "SETTLEMENT_TIMEOUT_SECS".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let overrides = match env_map.get("SETTLEMENT_TIMEOUT_OVERRIDES") {
            Some(raw) => parse_timeout_overrides(raw)?,
            None => HashMap::new(),
        };

        let screen_width = env_map
            .get("CANDLE_SCREEN_WIDTH")
            .map(|s| s.as_str())
            .unwrap_or("1024")
            .parse::<i64>()
            .ok()
            .filter(|width| *width > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "CANDLE_SCREEN_WIDTH".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        Ok(Config {
            port,
            stats_log_path,
            settlement: SettlementTimeouts::with_overrides(default_secs, overrides),
            screen_width,
        })
    }
}

/// Parse "COIN=secs,COIN=secs" override lists.
fn parse_timeout_overrides(raw: &str) -> Result<HashMap<String, i64>, ConfigError> {
    let mut overrides = HashMap::new();
    for entry in raw.split(',').filter(|e| !e.trim().is_empty()) {
        let invalid = || {
            ConfigError::InvalidValue(
                "SETTLEMENT_TIMEOUT_OVERRIDES".to_string(),
                format!("bad entry {:?}, expected COIN=secs", entry),
            )
        };
        let (coin, secs) = entry.trim().split_once('=').ok_or_else(invalid)?;
        let secs = secs
            .parse::<i64>()
            .ok()
            .filter(|s| *s > 0)
            .ok_or_else(invalid)?;
        overrides.insert(coin.trim().to_string(), secs);
    }
    Ok(overrides)
}
