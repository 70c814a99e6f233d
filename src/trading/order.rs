//! Trade leg types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::market::Resource;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TradeAction {
    /// Spend points for resources.
    Buy,
    /// Spend resources for points.
    Sell,
}

impl TradeAction {
    /// Sign applied to server amounts: `+1` for buy, `-1` for sell.
    pub fn direction(&self) -> i64 {
        match self {
            TradeAction::Buy => 1,
            TradeAction::Sell => -1,
        }
    }

    /// Whether a relative amount change helps the trader.
    ///
    /// Buying, more units per point is better. Selling, fewer units given up
    /// per point is better.
    pub fn is_favorable(&self, drift: Decimal) -> bool {
        match self {
            TradeAction::Buy => drift > Decimal::ZERO,
            TradeAction::Sell => drift < Decimal::ZERO,
        }
    }

    /// Form field naming this leg, e.g. `sell_wood`.
    pub fn field(&self, resource: Resource) -> String {
        format!("{}_{}", self, resource)
    }
}

/// Phase of the two-phase trade protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum TradePhase {
    /// Rate lock.
    Begin,
    /// Settlement.
    Confirm,
}

/// One trade leg as requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeAttempt {
    /// Direction.
    pub action: TradeAction,
    /// Resource traded.
    pub resource: Resource,
    /// Unit count computed by the pricing model.
    pub attempted_amount: i64,
}

impl TradeAttempt {
    /// Create a sell leg.
    pub fn sell(resource: Resource, amount: i64) -> Self {
        Self {
            action: TradeAction::Sell,
            resource,
            attempted_amount: amount,
        }
    }

    /// Create a buy leg.
    pub fn buy(resource: Resource, amount: i64) -> Self {
        Self {
            action: TradeAction::Buy,
            resource,
            attempted_amount: amount,
        }
    }
}

/// Settled trade leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeFill {
    /// The leg that was requested.
    pub attempt: TradeAttempt,
    /// Amount the server actually settled, sign-normalised.
    pub actual_amount: i64,
    /// Merchants left after the trade.
    pub merchants_remaining: i64,
}

impl TradeFill {
    /// Amount the pricing model asked for.
    pub fn attempted_amount(&self) -> i64 {
        self.attempt.attempted_amount
    }
}
