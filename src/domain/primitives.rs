//! Domain primitives: TimeSec, Coin.

use serde::{Deserialize, Serialize};

/// Time in whole seconds since Unix epoch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct TimeSec(pub i64);

impl TimeSec {
    /// Create a TimeSec from seconds.
    pub fn new(secs: i64) -> Self {
        TimeSec(secs)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        TimeSec(chrono::Utc::now().timestamp())
    }

    /// Get the underlying seconds value.
    pub fn as_secs(&self) -> i64 {
        self.0
    }

    /// Zero is the "unset" sentinel for terminal timestamps.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for TimeSec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coin/asset symbol (e.g., "KMD", "BTC").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coin(pub String);

impl Coin {
    /// Create a Coin from a string.
    pub fn new(coin: String) -> Self {
        Coin(coin)
    }

    /// Get the coin as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Coin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timesec_ordering() {
        let t1 = TimeSec::new(1000);
        let t2 = TimeSec::new(2000);
        assert!(t1 < t2);
    }

    #[test]
    fn test_timesec_zero() {
        assert!(TimeSec::new(0).is_zero());
        assert!(!TimeSec::new(1).is_zero());
    }

    #[test]
    fn test_coin_display() {
        let coin = Coin::new("KMD".to_string());
        assert_eq!(coin.to_string(), "KMD");
    }
}
