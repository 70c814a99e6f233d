//! Mock exchange for testing.
//!
//! Scripted, in-memory [`ExchangeApi`] implementation: tests queue poll,
//! begin and confirm results and inspect the call log afterwards. No
//! network requests are made.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::api::{BeginQuote, ConfirmReceipt, ExchangeApi};
use super::types::{MarketConstants, MarketSnapshot, PerResource, Resource, TaxRates, VillageState};
use crate::error::MarketError;
use crate::trading::TradeAction;

/// Scripted result of one market poll.
#[derive(Debug, Clone)]
pub enum MockPoll {
    /// Return this snapshot.
    Snapshot(MarketSnapshot),
    /// Fail with a server rejection.
    Error(String),
    /// Panic inside the poll.
    Panic(String),
}

/// Recorded call against the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// Market poll.
    Poll,
    /// Begin phase.
    Begin {
        action: TradeAction,
        resource: Resource,
    },
    /// Confirm phase.
    Confirm {
        action: TradeAction,
        resource: Resource,
        rate_hash: String,
        amount: i64,
    },
}

#[derive(Debug, Default)]
struct MockState {
    polls: VecDeque<MockPoll>,
    default_snapshot: Option<MarketSnapshot>,
    begins: VecDeque<Result<i64, String>>,
    default_begin: Option<Result<i64, String>>,
    confirms: VecDeque<Result<ConfirmReceipt, String>>,
    confirm_error: Option<String>,
    merchants_after: i64,
    calls: Vec<MockCall>,
}

/// Mock premium exchange.
///
/// Polls pop the queue and fall back to the default snapshot. Begins pop
/// their queue (the server amount, as sent) and fall back to the default
/// begin. Confirms pop their queue and otherwise settle the requested amount
/// in full, signed the way the server signs it.
#[derive(Debug, Clone, Default)]
pub struct MockExchange {
    state: Arc<Mutex<MockState>>,
}

impl MockExchange {
    /// Create an empty mock. Every call fails until scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that returns `snapshot` on every poll.
    pub fn with_snapshot(snapshot: MarketSnapshot) -> Self {
        let mock = Self::new();
        mock.set_default_snapshot(snapshot);
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the snapshot returned once the poll queue is empty.
    pub fn set_default_snapshot(&self, snapshot: MarketSnapshot) {
        let mut state = self.state();
        state.merchants_after = snapshot.village.merchants;
        state.default_snapshot = Some(snapshot);
    }

    /// Queue a poll result.
    pub fn push_poll(&self, poll: MockPoll) {
        self.state().polls.push_back(poll);
    }

    /// Queue a begin result with the given server amount.
    pub fn push_begin(&self, amount: i64) {
        self.state().begins.push_back(Ok(amount));
    }

    /// Queue a begin failure.
    pub fn push_begin_error(&self, message: impl Into<String>) {
        self.state().begins.push_back(Err(message.into()));
    }

    /// Set the begin result used once the begin queue is empty.
    pub fn set_default_begin(&self, result: Result<i64, String>) {
        self.state().default_begin = Some(result);
    }

    /// Queue a confirm receipt.
    pub fn push_confirm(&self, receipt: ConfirmReceipt) {
        self.state().confirms.push_back(Ok(receipt));
    }

    /// Queue a confirm failure.
    pub fn push_confirm_error(&self, message: impl Into<String>) {
        self.state().confirms.push_back(Err(message.into()));
    }

    /// Make every unscripted confirm fail.
    pub fn fail_confirms(&self, message: impl Into<String>) {
        self.state().confirm_error = Some(message.into());
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    /// Number of polls made.
    pub fn poll_count(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| matches!(c, MockCall::Poll))
            .count()
    }

    /// Number of begin calls for `action`.
    pub fn begin_count(&self, action: TradeAction) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| matches!(c, MockCall::Begin { action: a, .. } if *a == action))
            .count()
    }

    /// Number of confirm calls for `action`.
    pub fn confirm_count(&self, action: TradeAction) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| matches!(c, MockCall::Confirm { action: a, .. } if *a == action))
            .count()
    }

    /// Number of trade calls of any kind.
    pub fn trade_call_count(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| !matches!(c, MockCall::Poll))
            .count()
    }
}

#[async_trait]
impl ExchangeApi for MockExchange {
    async fn poll_market(&self) -> Result<MarketSnapshot, MarketError> {
        let mut state = self.state();
        state.calls.push(MockCall::Poll);

        let next = state
            .polls
            .pop_front()
            .or_else(|| state.default_snapshot.clone().map(MockPoll::Snapshot));

        match next {
            Some(MockPoll::Snapshot(snapshot)) => Ok(snapshot),
            Some(MockPoll::Error(message)) => Err(MarketError::Rejected(message)),
            Some(MockPoll::Panic(message)) => {
                drop(state);
                panic!("{}", message);
            }
            None => Err(MarketError::Rejected("no poll scripted".to_string())),
        }
    }

    async fn begin_trade(
        &self,
        action: TradeAction,
        resource: Resource,
        _csrf: Option<&str>,
    ) -> Result<BeginQuote, MarketError> {
        let mut state = self.state();
        state.calls.push(MockCall::Begin { action, resource });
        let serial = state.calls.len();

        let next = state
            .begins
            .pop_front()
            .or_else(|| state.default_begin.clone())
            .unwrap_or_else(|| Err("no begin scripted".to_string()));

        next.map(|amount| BeginQuote {
            rate_hash: format!("hash-{}-{}", resource, serial),
            amount,
        })
        .map_err(MarketError::Rejected)
    }

    async fn confirm_trade(
        &self,
        action: TradeAction,
        resource: Resource,
        rate_hash: &str,
        amount: i64,
        _csrf: Option<&str>,
    ) -> Result<ConfirmReceipt, MarketError> {
        let mut state = self.state();
        state.calls.push(MockCall::Confirm {
            action,
            resource,
            rate_hash: rate_hash.to_string(),
            amount,
        });

        if let Some(scripted) = state.confirms.pop_front() {
            return scripted.map_err(MarketError::Rejected);
        }

        if let Some(message) = state.confirm_error.clone() {
            return Err(MarketError::Rejected(message));
        }

        Ok(ConfirmReceipt {
            amount: action.direction() * amount,
            merchants: state.merchants_after,
        })
    }
}

/// Builder for market snapshots with realistic defaults.
///
/// Defaults: 10000 capacity per resource, base price 0.0025, elasticity
/// 0.0015, stock modifier 1000, 5% tax both ways, plenty of merchants,
/// resources and points.
pub struct MockSnapshotBuilder {
    snapshot: MarketSnapshot,
}

impl MockSnapshotBuilder {
    /// Create a builder with the defaults.
    pub fn new() -> Self {
        Self {
            snapshot: MarketSnapshot {
                village: VillageState {
                    available: PerResource::new(20_000, 20_000, 20_000),
                    points: 2_000,
                    merchants: 20,
                    csrf: Some("csrf-token".to_string()),
                },
                constants: MarketConstants {
                    resource_base_price: dec!(0.0025),
                    resource_price_elasticity: dec!(0.0015),
                    stock_size_modifier: dec!(1000),
                },
                stock: PerResource::new(5_000, 5_000, 5_000),
                capacity: PerResource::new(10_000, 10_000, 10_000),
                tax: TaxRates {
                    buy: dec!(0.05),
                    sell: dec!(0.05),
                },
            },
        }
    }

    /// Set merchants at home.
    pub fn merchants(mut self, merchants: i64) -> Self {
        self.snapshot.village.merchants = merchants;
        self
    }

    /// Set premium points.
    pub fn points(mut self, points: i64) -> Self {
        self.snapshot.village.points = points;
        self
    }

    /// Set village resources.
    pub fn available(mut self, wood: i64, stone: i64, iron: i64) -> Self {
        self.snapshot.village.available = PerResource::new(wood, stone, iron);
        self
    }

    /// Set exchange stock.
    pub fn stock(mut self, wood: i64, stone: i64, iron: i64) -> Self {
        self.snapshot.stock = PerResource::new(wood, stone, iron);
        self
    }

    /// Set exchange capacity.
    pub fn capacity(mut self, wood: i64, stone: i64, iron: i64) -> Self {
        self.snapshot.capacity = PerResource::new(wood, stone, iron);
        self
    }

    /// Set pricing constants.
    pub fn constants(mut self, base: Decimal, elasticity: Decimal, modifier: Decimal) -> Self {
        self.snapshot.constants = MarketConstants {
            resource_base_price: base,
            resource_price_elasticity: elasticity,
            stock_size_modifier: modifier,
        };
        self
    }

    /// Set tax rates.
    pub fn tax(mut self, buy: Decimal, sell: Decimal) -> Self {
        self.snapshot.tax = TaxRates { buy, sell };
        self
    }

    /// Set or clear the CSRF token.
    pub fn csrf(mut self, csrf: Option<&str>) -> Self {
        self.snapshot.village.csrf = csrf.map(str::to_string);
        self
    }

    /// Build the snapshot.
    pub fn build(self) -> MarketSnapshot {
        self.snapshot
    }
}

impl Default for MockSnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}
