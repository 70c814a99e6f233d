//! Unified error types for the exchange bot.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::market::{Endpoint, Resource};
use crate::trading::{TradeAction, TradePhase};

/// Unified error type for the exchange bot.
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Endpoint URL could not be parsed.
    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),

    /// Game API error.
    #[error("market error: {0}")]
    Market(#[from] MarketError),

    /// Trade leg error.
    #[error("trade error: {0}")]
    Trade(#[from] TradeError),

    /// Pricing model error.
    #[error("pricing error: {0}")]
    Pricing(#[from] PricingError),

    /// Logging could not be initialised.
    #[error("logging setup failed: {0}")]
    Logging(String),

    /// Metrics exporter could not be installed.
    #[error("metrics setup failed: {0}")]
    Metrics(String),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pricing model errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// Marginal price is exactly zero, so no finite rate exists.
    #[error("marginal price is zero, no finite rate exists")]
    ZeroMarginalPrice,

    /// `capacity + stock_size_modifier` is zero.
    #[error("capacity plus stock size modifier is zero")]
    DegenerateCapacity,

    /// Intermediate value left the representable range.
    #[error("arithmetic overflow while pricing")]
    Overflow,
}

/// Game API errors.
#[derive(Error, Debug)]
pub enum MarketError {
    /// Endpoint answered with a non-success status.
    #[error("request to {endpoint} failed: {reason}")]
    FetchFailed {
        /// Endpoint that failed.
        endpoint: Endpoint,
        /// Reason for failure.
        reason: String,
    },

    /// Server reported a failure in the response body.
    #[error("server rejected request: {0}")]
    Rejected(String),

    /// Response did not have the expected shape.
    #[error("failed to parse response: {0}")]
    ParseError(String),

    /// Session cookie could not be read.
    #[error("session unavailable: {0}")]
    Session(String),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Trade leg errors.
#[derive(Error, Debug)]
pub enum TradeError {
    /// Server quote moved against us beyond tolerance.
    #[error("amountChange: {drift} ({expected} -> {candidate}) exceeds tolerance for {action} {resource}")]
    DriftExceeded {
        /// Trade direction.
        action: TradeAction,
        /// Resource traded.
        resource: Resource,
        /// Amount computed in the previous scan.
        expected: i64,
        /// Amount quoted by the begin phase.
        candidate: i64,
        /// Relative change `(candidate - expected) / expected`.
        drift: Decimal,
    },

    /// Drift is undefined for a zero expected amount.
    #[error("expected amount for {action} {resource} is zero")]
    ZeroExpectedAmount {
        /// Trade direction.
        action: TradeAction,
        /// Resource traded.
        resource: Resource,
    },

    /// Transport, server or response-shape failure in one phase.
    #[error("{phase} phase failed: {source}")]
    ProtocolFailure {
        /// Phase that failed.
        phase: TradePhase,
        /// Underlying API error.
        #[source]
        source: MarketError,
    },

    /// Buy window closed without a fill.
    #[error("no fill after {attempts} attempts in {elapsed_ms}ms")]
    Timeout {
        /// Time spent in the window.
        elapsed_ms: u64,
        /// Attempts made.
        attempts: u32,
    },

    /// Anything else, e.g. a panic caught at the cycle boundary.
    #[error("unexpected failure: {0}")]
    Unknown(String),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, BotError>;
