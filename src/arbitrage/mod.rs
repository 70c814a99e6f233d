//! Arbitrage module for pricing, detection and the scan loop.
//!
//! This module handles:
//! - Break-even rate calculation from exchange constants
//! - Opportunity detection and trade gates
//! - The scan loop with the sell leg and buy retry window

pub mod calculator;
pub mod detector;
pub mod scanner;

pub use calculator::{cost, marginal_price, rate_for_one_point, rate_for_one_point_traced, RateEstimate};
pub use detector::{
    check_gates, find_opportunity, quote_resources, AbortReason, ArbitrageOpportunity, QuoteBoard,
    ResourceQuote,
};
pub use scanner::{CycleOutcome, MarketScanner, ScannerStats, TradeReport};
