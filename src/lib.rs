//! Premium exchange arbitrage bot.
//!
//! The game's resource exchange prices wood, stone and iron independently,
//! each from its own stock and capacity. Whenever one resource buys far more
//! units per premium point than another, selling the cheap one and buying
//! the expensive one nets extra resources for the same points.
//!
//! # Strategy
//!
//! Every cycle the bot converts each resource's market state into a
//! break-even rate: the number of units that trade for one point.
//!
//! ```text
//! wood:   377 units/pp   <- sell (lowest rate)
//! stone:  513 units/pp
//! iron:   830 units/pp   <- buy  (highest rate)
//! ───────────────────────
//! delta:  453 >= 300     -> trade
//! ```
//!
//! The sell leg runs first; the buy leg is retried for a bounded window.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`market`]: Game API transport, session and market types
//! - [`arbitrage`]: Pricing model, opportunity detection and the scan loop
//! - [`trading`]: Two-phase trade execution
//! - [`logging`]: Console and journal file logging
//! - [`metrics`]: Prometheus counters and latency histograms
//! - [`utils`]: Utility functions

pub mod arbitrage;
pub mod config;
pub mod error;
pub mod logging;
pub mod market;
pub mod metrics;
pub mod trading;
pub mod utils;

pub use config::{Config, TradingParams};
pub use error::{BotError, Result};
