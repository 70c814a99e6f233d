//! Two-phase trade execution.
//!
//! A trade leg first locks a rate (begin), checks that the quoted amount has
//! not moved too far from what the pricing model expected, waits briefly and
//! then settles at the locked rate (confirm).

use std::time::Duration;

use rust_decimal::Decimal;
use tokio::time::sleep;
use tracing::{debug, instrument};

use super::order::{TradeAction, TradeAttempt, TradeFill, TradePhase};
use crate::config::TradingParams;
use crate::error::TradeError;
use crate::market::{ExchangeApi, Resource};
use crate::metrics;

/// Relative change between the expected and quoted amounts.
///
/// Favorable moves always pass. Adverse moves pass while `|drift|` stays
/// within `max_change`.
pub fn check_drift(
    action: TradeAction,
    resource: Resource,
    expected: i64,
    candidate: i64,
    max_change: Decimal,
) -> Result<Decimal, TradeError> {
    if expected == 0 {
        return Err(TradeError::ZeroExpectedAmount { action, resource });
    }

    let drift = (Decimal::from(candidate) - Decimal::from(expected)) / Decimal::from(expected);

    if action.is_favorable(drift) || drift.abs() <= max_change {
        Ok(drift)
    } else {
        Err(TradeError::DriftExceeded {
            action,
            resource,
            expected,
            candidate,
            drift,
        })
    }
}

/// Executes single trade legs against an [`ExchangeApi`].
#[derive(Debug, Clone)]
pub struct ExchangeClient {
    max_change: Decimal,
    settle_delay: Duration,
}

impl ExchangeClient {
    /// Create a client from trading parameters.
    pub fn new(params: &TradingParams) -> Self {
        Self::with_settings(params.max_change, params.settle_delay)
    }

    /// Create a client with explicit drift tolerance and settle delay.
    pub fn with_settings(max_change: Decimal, settle_delay: Duration) -> Self {
        Self {
            max_change,
            settle_delay,
        }
    }

    /// Adverse drift tolerance.
    pub fn max_change(&self) -> Decimal {
        self.max_change
    }

    /// Execute one trade leg: begin, drift check, settle delay, confirm.
    ///
    /// Every failure comes back as a [`TradeError`]. A failure before the
    /// confirm call leaves the village untouched.
    #[instrument(
        skip(self, api, csrf),
        fields(
            action = %attempt.action,
            resource = %attempt.resource,
            expected = attempt.attempted_amount
        )
    )]
    pub async fn trade<A>(
        &self,
        api: &A,
        attempt: TradeAttempt,
        csrf: Option<&str>,
    ) -> Result<TradeFill, TradeError>
    where
        A: ExchangeApi + ?Sized,
    {
        let result = self.execute(api, attempt, csrf).await;

        if let Err(ref e) = result {
            metrics::inc_trade_legs_failed(attempt.action);
            debug!(error = %e, "Trade leg failed");
        }

        result
    }

    async fn execute<A>(
        &self,
        api: &A,
        attempt: TradeAttempt,
        csrf: Option<&str>,
    ) -> Result<TradeFill, TradeError>
    where
        A: ExchangeApi + ?Sized,
    {
        let TradeAttempt {
            action,
            resource,
            attempted_amount,
        } = attempt;
        let direction = action.direction();

        let quote = api
            .begin_trade(action, resource, csrf)
            .await
            .map_err(|source| TradeError::ProtocolFailure {
                phase: TradePhase::Begin,
                source,
            })?;

        let candidate = quote
            .amount
            .checked_mul(direction)
            .ok_or_else(|| TradeError::Unknown(format!("begin amount {} out of range", quote.amount)))?;

        let drift = check_drift(action, resource, attempted_amount, candidate, self.max_change)?;
        debug!(candidate, drift = %drift, "Rate locked");

        sleep(self.settle_delay).await;

        let receipt = api
            .confirm_trade(action, resource, &quote.rate_hash, candidate, csrf)
            .await
            .map_err(|source| TradeError::ProtocolFailure {
                phase: TradePhase::Confirm,
                source,
            })?;

        let actual_amount = receipt
            .amount
            .checked_mul(direction)
            .ok_or_else(|| TradeError::Unknown(format!("confirm amount {} out of range", receipt.amount)))?;

        debug!(actual_amount, merchants = receipt.merchants, "Trade leg settled");

        Ok(TradeFill {
            attempt,
            actual_amount,
            merchants_remaining: receipt.merchants,
        })
    }
}
