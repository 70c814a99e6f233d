//! Application configuration loaded from environment variables.

use std::path::Path;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::error::BotError;

/// Minimum spread, in units per point, worth trading.
pub const TRADE_DELTA_THRESHOLD: i64 = 300;
/// Merchants that must be at home before trading.
pub const MIN_MERCHANTS: i64 = 4;
/// Premium points that must be held before trading.
pub const MIN_POINTS: i64 = 500;
/// Adverse drift tolerated between scan and begin.
pub const MAX_CHANGE: Decimal = dec!(0.1);
/// Length of the buy retry window.
pub const TRY_BUY_FOR_SECONDS: u64 = 5;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Trading Parameters ===
    /// Minimum spread between buy and sell rates.
    #[serde(default = "default_trade_delta_threshold")]
    pub trade_delta_threshold: i64,

    /// Merchants required at home.
    #[serde(default = "default_min_merchants")]
    pub min_merchants: i64,

    /// Premium points required.
    #[serde(default = "default_min_points")]
    pub min_points: i64,

    /// Adverse drift tolerance (0.1 = 10%).
    #[serde(default = "default_max_change")]
    pub max_change: Decimal,

    /// Seconds to keep retrying the buy leg after a sell.
    #[serde(default = "default_try_buy_for_seconds")]
    pub try_buy_for_seconds: u64,

    // === Timing ===
    /// Sleep between scan cycles.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Stop after this many cycles (0 = run forever).
    #[serde(default)]
    pub max_cycles: u64,

    /// Wait between begin and confirm.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Wait between a settled sell and the first buy attempt.
    #[serde(default = "default_post_sell_delay_ms")]
    pub post_sell_delay_ms: u64,

    /// Wait after a failed buy attempt.
    #[serde(default = "default_buy_retry_delay_ms")]
    pub buy_retry_delay_ms: u64,

    // === Game Access ===
    /// File holding the session id.
    #[serde(default = "default_session_file")]
    pub session_file: String,

    /// JSON file with the exchange endpoint URLs.
    #[serde(default = "default_urls_file")]
    pub urls_file: String,

    /// HTTP request timeout.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    // === Operation Modes ===
    /// Evaluate and log opportunities without trading.
    #[serde(default)]
    pub dry_run: bool,

    // === Logging & Metrics ===
    /// Trade journal file.
    #[serde(default = "default_info_log")]
    pub info_log: String,

    /// Abort and error file.
    #[serde(default = "default_error_log")]
    pub error_log: String,

    /// Serve Prometheus metrics.
    #[serde(default)]
    pub metrics_enabled: bool,

    /// Prometheus exporter port.
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Emit console logs as JSON.
    #[serde(default)]
    pub log_json: bool,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_trade_delta_threshold() -> i64 {
    TRADE_DELTA_THRESHOLD
}

fn default_min_merchants() -> i64 {
    MIN_MERCHANTS
}

fn default_min_points() -> i64 {
    MIN_POINTS
}

fn default_max_change() -> Decimal {
    MAX_CHANGE
}

fn default_try_buy_for_seconds() -> u64 {
    TRY_BUY_FOR_SECONDS
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_settle_delay_ms() -> u64 {
    100
}

fn default_post_sell_delay_ms() -> u64 {
    1000
}

fn default_buy_retry_delay_ms() -> u64 {
    500
}

fn default_session_file() -> String {
    "sid.txt".to_string()
}

fn default_urls_file() -> String {
    "urls.json".to_string()
}

fn default_http_timeout_ms() -> u64 {
    5000
}

fn default_info_log() -> String {
    "info.log".to_string()
}

fn default_error_log() -> String {
    "error.log".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trade_delta_threshold: default_trade_delta_threshold(),
            min_merchants: default_min_merchants(),
            min_points: default_min_points(),
            max_change: default_max_change(),
            try_buy_for_seconds: default_try_buy_for_seconds(),
            poll_interval_ms: default_poll_interval_ms(),
            max_cycles: 0,
            settle_delay_ms: default_settle_delay_ms(),
            post_sell_delay_ms: default_post_sell_delay_ms(),
            buy_retry_delay_ms: default_buy_retry_delay_ms(),
            session_file: default_session_file(),
            urls_file: default_urls_file(),
            http_timeout_ms: default_http_timeout_ms(),
            dry_run: false,
            info_log: default_info_log(),
            error_log: default_error_log(),
            metrics_enabled: false,
            metrics_port: default_metrics_port(),
            rust_log: default_log_level(),
            log_json: false,
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Load configuration from environment, reading the given env file first.
    /// Variables already set in the environment win over the file.
    pub fn load_from(env_file: &Path) -> Result<Self, BotError> {
        dotenvy::from_path(env_file).map_err(|e| {
            BotError::InvalidConfig(format!("cannot read {}: {}", env_file.display(), e))
        })?;
        Ok(envy::from_env()?)
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.trade_delta_threshold <= 0 {
            return Err("TRADE_DELTA_THRESHOLD must be positive".to_string());
        }

        if self.min_merchants < 0 || self.min_points < 0 {
            return Err("MIN_MERCHANTS and MIN_POINTS must not be negative".to_string());
        }

        if self.max_change < Decimal::ZERO {
            return Err("MAX_CHANGE must not be negative".to_string());
        }

        if self.try_buy_for_seconds == 0 {
            return Err("TRY_BUY_FOR_SECONDS must be at least 1".to_string());
        }

        if self.http_timeout_ms == 0 {
            return Err("HTTP_TIMEOUT_MS must be positive".to_string());
        }

        if self.session_file.trim().is_empty() || self.urls_file.trim().is_empty() {
            return Err("SESSION_FILE and URLS_FILE must be set".to_string());
        }

        Ok(())
    }

    /// Typed trading parameters.
    pub fn trading_params(&self) -> TradingParams {
        TradingParams::from(self)
    }
}

/// Trading parameters handed to the scanner and the exchange client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingParams {
    /// Minimum spread worth trading.
    pub trade_delta_threshold: i64,
    /// Merchants required at home.
    pub min_merchants: i64,
    /// Premium points required.
    pub min_points: i64,
    /// Adverse drift tolerance.
    pub max_change: Decimal,
    /// Buy retry window.
    pub try_buy_for: Duration,
    /// Sleep between cycles.
    pub poll_interval: Duration,
    /// Begin to confirm wait.
    pub settle_delay: Duration,
    /// Sell to first buy wait.
    pub post_sell_delay: Duration,
    /// Wait after a failed buy.
    pub buy_retry_delay: Duration,
    /// Cycle cap, 0 for none.
    pub max_cycles: u64,
    /// Skip the trade legs.
    pub dry_run: bool,
}

impl From<&Config> for TradingParams {
    fn from(config: &Config) -> Self {
        Self {
            trade_delta_threshold: config.trade_delta_threshold,
            min_merchants: config.min_merchants,
            min_points: config.min_points,
            max_change: config.max_change,
            try_buy_for: Duration::from_secs(config.try_buy_for_seconds),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            post_sell_delay: Duration::from_millis(config.post_sell_delay_ms),
            buy_retry_delay: Duration::from_millis(config.buy_retry_delay_ms),
            max_cycles: config.max_cycles,
            dry_run: config.dry_run,
        }
    }
}

impl Default for TradingParams {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn env(pairs: &[(&str, &str)]) -> Result<Config, envy::Error> {
        envy::from_iter(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn default_values_are_sensible() {
        let params = TradingParams::default();
        assert_eq!(params.trade_delta_threshold, 300);
        assert_eq!(params.min_merchants, 4);
        assert_eq!(params.min_points, 500);
        assert_eq!(params.max_change, dec!(0.1));
        assert_eq!(params.try_buy_for, Duration::from_secs(5));
        assert_eq!(params.settle_delay, Duration::from_millis(100));
        assert_eq!(params.post_sell_delay, Duration::from_millis(1000));
        assert_eq!(params.buy_retry_delay, Duration::from_millis(500));
        assert_eq!(params.poll_interval, Duration::from_millis(1000));
        assert_eq!(params.max_cycles, 0);
        assert!(!params.dry_run);
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = env(&[]).unwrap();
        assert_eq!(config.trading_params(), TradingParams::default());
        assert_eq!(config.urls_file, "urls.json");
        assert_eq!(config.session_file, "sid.txt");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn environment_overrides_are_parsed() {
        let config = env(&[
            ("TRADE_DELTA_THRESHOLD", "250"),
            ("MAX_CHANGE", "0.05"),
            ("MAX_CYCLES", "12"),
            ("DRY_RUN", "true"),
            ("URLS_FILE", "village42.json"),
        ])
        .unwrap();

        assert_eq!(config.trade_delta_threshold, 250);
        assert_eq!(config.max_change, dec!(0.05));
        assert_eq!(config.max_cycles, 12);
        assert!(config.dry_run);
        assert_eq!(config.urls_file, "village42.json");
    }

    #[test]
    fn validate_rejects_nonsense() {
        let config = Config {
            trade_delta_threshold: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            max_change: dec!(-0.1),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            try_buy_for_seconds: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            urls_file: " ".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
