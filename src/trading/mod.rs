//! Trading module for trade legs and their execution.
//!
//! This module handles:
//! - Trade leg types
//! - Two-phase begin/confirm execution with drift tolerance

pub mod exchange;
pub mod order;

pub use exchange::{check_drift, ExchangeClient};
pub use order::{TradeAction, TradeAttempt, TradeFill, TradePhase};
