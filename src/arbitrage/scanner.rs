//! Market scan loop.
//!
//! One cycle polls the exchange, prices the three resources, and when the
//! spread is wide enough sells the dearest resource for points and buys the
//! cheapest back with them. The loop runs cycles on a fixed interval.

use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use rust_decimal::Decimal;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, instrument, warn};

use super::detector::{
    check_gates, find_opportunity, quote_resources, AbortReason, ArbitrageOpportunity,
    ResourceQuote,
};
use crate::config::TradingParams;
use crate::error::{BotError, TradeError};
use crate::market::{ExchangeApi, VillageState};
use crate::metrics;
use crate::trading::{ExchangeClient, TradeAttempt, TradeFill};
use crate::utils::panic_message;

/// Completed sell and buy pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeReport {
    /// Settled sell leg.
    pub sell: TradeFill,
    /// Settled buy leg.
    pub buy: TradeFill,
    /// Buy attempts it took.
    pub buy_attempts: u32,
    /// Profit implied by the pricing model, in percent.
    pub attempted_profit_pct: Option<Decimal>,
    /// Profit actually realised, in percent.
    pub actual_profit_pct: Option<Decimal>,
}

/// What one cycle did.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Spread under the threshold. Nothing logged.
    BelowThreshold {
        /// Observed spread.
        delta: i64,
    },
    /// Opportunity passed every gate but trading is disabled.
    DryRun(ArbitrageOpportunity),
    /// Opportunity abandoned.
    Aborted(AbortReason),
    /// Both legs settled.
    Traded(TradeReport),
}

/// Counters kept across cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannerStats {
    /// Cycles run by the loop.
    pub cycles: u64,
    /// Cycles whose spread passed the threshold.
    pub opportunities: u64,
    /// Sell and buy pairs completed.
    pub trades_completed: u64,
    /// Aborts keyed by reason label.
    pub aborts: BTreeMap<&'static str, u64>,
    /// Cycles that ended in an error or panic.
    pub scan_errors: u64,
}

impl ScannerStats {
    /// Aborts recorded for one reason label.
    pub fn aborts_for(&self, label: &str) -> u64 {
        self.aborts.get(label).copied().unwrap_or_default()
    }
}

/// Polls the exchange and trades the spread.
pub struct MarketScanner<A> {
    api: A,
    exchange: ExchangeClient,
    params: TradingParams,
    village: VillageState,
    stats: ScannerStats,
}

impl<A: ExchangeApi> MarketScanner<A> {
    /// Create a scanner over `api`.
    pub fn new(api: A, params: TradingParams) -> Self {
        Self {
            exchange: ExchangeClient::new(&params),
            api,
            params,
            village: VillageState::default(),
            stats: ScannerStats::default(),
        }
    }

    /// Underlying API.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Trading parameters in use.
    pub fn params(&self) -> &TradingParams {
        &self.params
    }

    /// Village state from the latest poll.
    pub fn village(&self) -> &VillageState {
        &self.village
    }

    /// Counters so far.
    pub fn stats(&self) -> &ScannerStats {
        &self.stats
    }

    /// Run one scan cycle.
    #[instrument(level = "debug", skip(self))]
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, BotError> {
        let snapshot = self.api.poll_market().await?;
        self.village = snapshot.village.clone();

        let board = quote_resources(&snapshot)?;
        let Some(opportunity) = find_opportunity(&board, self.params.trade_delta_threshold)? else {
            return Ok(CycleOutcome::BelowThreshold {
                delta: board.spread()?,
            });
        };

        self.stats.opportunities += 1;
        info!("{}", board);
        info!("{}", opportunity);

        if let Err(reason) = check_gates(&opportunity, &self.village, &self.params) {
            return Ok(self.abort(reason));
        }

        if self.params.dry_run {
            info!(
                sell = %opportunity.to_sell.resource,
                sell_amount = opportunity.to_sell.price,
                buy = %opportunity.to_buy.resource,
                buy_amount = opportunity.to_buy.price,
                "DRY RUN: trade skipped"
            );
            return Ok(CycleOutcome::DryRun(opportunity));
        }

        let csrf = self.village.csrf.clone();
        let to_sell = opportunity.to_sell;

        let sold = match self
            .exchange
            .trade(
                &self.api,
                TradeAttempt::sell(to_sell.resource, to_sell.price),
                csrf.as_deref(),
            )
            .await
        {
            Ok(fill) => fill,
            Err(e) => return Ok(self.abort(AbortReason::Selling(e))),
        };

        match self.buy_within_window(opportunity.to_buy, csrf.as_deref()).await {
            Ok((bought, buy_attempts)) => {
                let report = TradeReport {
                    attempted_profit_pct: profit_pct(sold.attempted_amount(), bought.attempted_amount()),
                    actual_profit_pct: profit_pct(sold.actual_amount, bought.actual_amount),
                    sell: sold,
                    buy: bought,
                    buy_attempts,
                };
                self.record_trade(&report);
                Ok(CycleOutcome::Traded(report))
            }
            Err(error) => Ok(self.abort(AbortReason::BuyTimeout { sold, error })),
        }
    }

    /// Retry the buy leg until it settles or the window closes.
    async fn buy_within_window(
        &self,
        to_buy: ResourceQuote,
        csrf: Option<&str>,
    ) -> Result<(TradeFill, u32), TradeError> {
        sleep(self.params.post_sell_delay).await;

        let window = self.params.try_buy_for;
        let start = Instant::now();
        let mut attempts = 0;

        while start.elapsed() < window {
            attempts += 1;

            match self
                .exchange
                .trade(&self.api, TradeAttempt::buy(to_buy.resource, to_buy.price), csrf)
                .await
            {
                Ok(fill) => return Ok((fill, attempts)),
                Err(e) => {
                    error!(attempt = attempts, "ABORT BUYING because: {}", e);
                    let remaining = window.saturating_sub(start.elapsed());
                    sleep(self.params.buy_retry_delay.min(remaining)).await;
                }
            }
        }

        Err(TradeError::Timeout {
            elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            attempts,
        })
    }

    fn abort(&mut self, reason: AbortReason) -> CycleOutcome {
        let label = reason.label();

        match &reason {
            AbortReason::BuyTimeout { sold, .. } => error!(
                reason = label,
                sold_resource = %sold.attempt.resource,
                sold_amount = sold.actual_amount,
                "{}", reason
            ),
            _ => error!(reason = label, "{}", reason),
        }

        metrics::inc_trade_aborts(label);
        *self.stats.aborts.entry(label).or_default() += 1;
        CycleOutcome::Aborted(reason)
    }

    fn record_trade(&mut self, report: &TradeReport) {
        info!("Trade successful!");
        info!(
            "Attempted: {} -> {} ({}% profit)",
            report.sell.attempted_amount(),
            report.buy.attempted_amount(),
            format_pct(report.attempted_profit_pct)
        );
        info!(
            "Actual: {} -> {} ({}% profit)",
            report.sell.actual_amount,
            report.buy.actual_amount,
            format_pct(report.actual_profit_pct)
        );

        metrics::inc_trades_completed();
        self.stats.trades_completed += 1;
    }

    /// Run one cycle, absorbing errors and panics.
    ///
    /// Returns `None` when the cycle failed; the failure is logged as a scan
    /// error.
    pub async fn cycle_once(&mut self) -> Option<CycleOutcome> {
        let result = AssertUnwindSafe(self.run_cycle()).catch_unwind().await;

        self.stats.cycles += 1;
        metrics::inc_cycles();

        let message = match result {
            Ok(Ok(outcome)) => {
                debug!(?outcome, "Cycle finished");
                return Some(outcome);
            }
            Ok(Err(e)) => e.to_string(),
            Err(payload) => panic_message(payload),
        };

        error!("scan error: {}", message);
        metrics::inc_scan_errors();
        self.stats.scan_errors += 1;
        None
    }

    /// Run cycles until `shutdown` resolves or the cycle cap is reached.
    ///
    /// Shutdown is only observed between cycles, so a trade in flight always
    /// runs to completion.
    pub async fn run<F>(&mut self, shutdown: F) -> ScannerStats
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut completed: u64 = 0;

        loop {
            self.cycle_once().await;

            let stop = tokio::select! {
                biased;
                _ = shutdown.as_mut() => true,
                _ = sleep(self.params.poll_interval) => false,
            };

            if stop {
                warn!(cycles = completed + 1, "Shutdown requested, scanner stopped");
                break;
            }

            completed += 1;
            if self.params.max_cycles > 0 && completed >= self.params.max_cycles {
                info!(cycles = completed, "Cycle limit reached");
                break;
            }
        }

        self.stats.clone()
    }
}

/// `100 * (to - from) / from`, or `None` when `from` is zero.
fn profit_pct(from: i64, to: i64) -> Option<Decimal> {
    if from == 0 {
        return None;
    }

    (Decimal::from(to) - Decimal::from(from))
        .checked_mul(Decimal::ONE_HUNDRED)?
        .checked_div(Decimal::from(from))
}

fn format_pct(pct: Option<Decimal>) -> String {
    pct.map(|p| p.round_dp(2).normalize().to_string())
        .unwrap_or_else(|| "n/a".to_string())
}
