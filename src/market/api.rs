//! Game exchange API abstraction.
//!
//! The scanner and the trade executor only talk to the game through
//! [`ExchangeApi`], so tests can swap the HTTP client for
//! [`MockExchange`](super::mock::MockExchange).

use async_trait::async_trait;

use super::types::{MarketSnapshot, Resource};
use crate::error::MarketError;
use crate::trading::TradeAction;

/// Result of the begin phase: a locked rate and the server's amount for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeginQuote {
    /// Rate lock token to pass to the confirm phase.
    pub rate_hash: String,
    /// Server amount at the locked rate, as sent (not sign-normalised).
    pub amount: i64,
}

/// Result of the confirm phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmReceipt {
    /// Settled amount of the first transaction, as sent.
    pub amount: i64,
    /// Merchants left after the trade.
    pub merchants: i64,
}

/// Abstraction over the game's premium exchange.
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    /// Fetch market and village state.
    async fn poll_market(&self) -> Result<MarketSnapshot, MarketError>;

    /// Lock a rate for one unit-point of `action` on `resource`.
    async fn begin_trade(
        &self,
        action: TradeAction,
        resource: Resource,
        csrf: Option<&str>,
    ) -> Result<BeginQuote, MarketError>;

    /// Settle a previously locked rate for `amount` units.
    async fn confirm_trade(
        &self,
        action: TradeAction,
        resource: Resource,
        rate_hash: &str,
        amount: i64,
        csrf: Option<&str>,
    ) -> Result<ConfirmReceipt, MarketError>;
}
