//! Arbitrage opportunity detection.

use std::fmt;

use tracing::{debug, instrument};

use super::calculator::rate_for_one_point;
use crate::config::TradingParams;
use crate::error::{PricingError, TradeError};
use crate::market::{MarketSnapshot, PerResource, Resource, VillageState};
use crate::trading::TradeFill;

/// Break-even rate of one resource in one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceQuote {
    /// Resource quoted.
    pub resource: Resource,
    /// Units per premium point.
    pub price: i64,
}

/// One quote per resource, in scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteBoard {
    quotes: [ResourceQuote; 3],
}

impl QuoteBoard {
    /// Build a board from per-resource prices.
    pub fn new(prices: PerResource<i64>) -> Self {
        Self {
            quotes: Resource::ALL.map(|resource| ResourceQuote {
                resource,
                price: prices[resource],
            }),
        }
    }

    /// Quotes in scan order.
    pub fn quotes(&self) -> &[ResourceQuote; 3] {
        &self.quotes
    }

    /// Price of one resource.
    pub fn price(&self, resource: Resource) -> i64 {
        self.quotes
            .iter()
            .find(|q| q.resource == resource)
            .map(|q| q.price)
            .unwrap_or_default()
    }

    /// Highest rate: the most units per point, so the cheapest to buy.
    /// The first resource in scan order wins ties.
    pub fn to_buy(&self) -> ResourceQuote {
        self.quotes[1..]
            .iter()
            .fold(self.quotes[0], |best, q| if q.price > best.price { *q } else { best })
    }

    /// Lowest rate: the fewest units per point, so the dearest to sell.
    /// The first resource in scan order wins ties.
    pub fn to_sell(&self) -> ResourceQuote {
        self.quotes[1..]
            .iter()
            .fold(self.quotes[0], |best, q| if q.price < best.price { *q } else { best })
    }

    /// Difference between the buy and sell rates.
    pub fn spread(&self) -> Result<i64, PricingError> {
        self.to_buy()
            .price
            .checked_sub(self.to_sell().price)
            .ok_or(PricingError::Overflow)
    }
}

impl fmt::Display for QuoteBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [wood, stone, iron] = self.quotes;
        write!(
            f,
            "wood {}, stone {}, iron {}",
            wood.price, stone.price, iron.price
        )
    }
}

/// Price every resource in a snapshot.
pub fn quote_resources(snapshot: &MarketSnapshot) -> Result<QuoteBoard, PricingError> {
    let mut prices = PerResource::default();
    for resource in Resource::ALL {
        *prices.get_mut(resource) = rate_for_one_point(
            &snapshot.constants,
            snapshot.stock[resource],
            snapshot.capacity[resource],
            &snapshot.tax,
        )?;
    }
    Ok(QuoteBoard::new(prices))
}

/// Detected arbitrage opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbitrageOpportunity {
    /// Resource to buy with the points raised.
    pub to_buy: ResourceQuote,
    /// Resource to sell for points.
    pub to_sell: ResourceQuote,
    /// `to_buy.price - to_sell.price`.
    pub delta: i64,
}

impl fmt::Display for ArbitrageOpportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sell {}, buy {}, delta {}",
            self.to_sell.resource, self.to_buy.resource, self.delta
        )
    }
}

/// Check the spread against the threshold.
#[instrument(level = "debug", skip(board), fields(board = %board))]
pub fn find_opportunity(
    board: &QuoteBoard,
    threshold: i64,
) -> Result<Option<ArbitrageOpportunity>, PricingError> {
    let delta = board.spread()?;

    if delta < threshold {
        debug!(delta, threshold, "Spread below threshold");
        return Ok(None);
    }

    Ok(Some(ArbitrageOpportunity {
        to_buy: board.to_buy(),
        to_sell: board.to_sell(),
        delta,
    }))
}

/// Why a cycle stopped short of a completed trade.
#[derive(Debug)]
pub enum AbortReason {
    /// Too few merchants at home.
    Merchants {
        /// Merchants at home.
        available: i64,
        /// Merchants required.
        required: i64,
    },
    /// Not enough of the sold resource, or too few points.
    Resources {
        /// Village resources.
        available: PerResource<i64>,
        /// Premium points held.
        points: i64,
    },
    /// The sell leg failed. Nothing changed hands.
    Selling(TradeError),
    /// The sell leg settled but no buy went through in the window.
    /// The sold resources are not recovered.
    BuyTimeout {
        /// The settled sell leg.
        sold: TradeFill,
        /// Window exhaustion error.
        error: TradeError,
    },
}

impl AbortReason {
    /// Short label for metrics and stats.
    pub fn label(&self) -> &'static str {
        match self {
            AbortReason::Merchants { .. } => "merchants",
            AbortReason::Resources { .. } => "resources",
            AbortReason::Selling(_) => "selling",
            AbortReason::BuyTimeout { .. } => "buy_timeout",
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Merchants { available, .. } => {
                write!(f, "ABORT TRADE because merchants: {}", available)
            }
            AbortReason::Resources { available, points } => write!(
                f,
                "ABORT TRADE because resources: wood={} stone={} iron={} pp={}",
                available.wood, available.stone, available.iron, points
            ),
            AbortReason::Selling(err) => write!(f, "ABORT SELLING because: {}", err),
            AbortReason::BuyTimeout {
                error: TradeError::Timeout { elapsed_ms, .. },
                ..
            } => write!(f, "ABORT BUYING because timeout: {}", elapsed_ms),
            AbortReason::BuyTimeout { error, .. } => {
                write!(f, "ABORT BUYING because: {}", error)
            }
        }
    }
}

/// Apply the liquidity and affordability gates.
pub fn check_gates(
    opportunity: &ArbitrageOpportunity,
    village: &VillageState,
    params: &TradingParams,
) -> Result<(), AbortReason> {
    if village.merchants < params.min_merchants {
        return Err(AbortReason::Merchants {
            available: village.merchants,
            required: params.min_merchants,
        });
    }

    let to_sell = opportunity.to_sell;
    if village.available[to_sell.resource] < to_sell.price || village.points < params.min_points {
        return Err(AbortReason::Resources {
            available: village.available,
            points: village.points,
        });
    }

    Ok(())
}
