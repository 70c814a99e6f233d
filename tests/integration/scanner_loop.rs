//! Scan loop behaviour over several cycles.

use std::time::Duration;

use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use tokio::time::Instant;

use exchange_arb::arbitrage::{quote_resources, MarketScanner};
use exchange_arb::config::{Config, TradingParams};
use exchange_arb::market::{MockExchange, MockPoll, MockSnapshotBuilder, Resource};
use exchange_arb::trading::TradeAction;

fn params(max_cycles: u64) -> TradingParams {
    TradingParams {
        max_cycles,
        ..TradingParams::default()
    }
}

fn spread_snapshot() -> MockSnapshotBuilder {
    MockSnapshotBuilder::new().stock(0, 5_000, 10_000)
}

#[tokio::test(start_paused = true)]
async fn bounded_run_stops_after_cycle_cap() {
    let mock = MockExchange::with_snapshot(MockSnapshotBuilder::new().build());
    let mut scanner = MarketScanner::new(mock.clone(), params(3));

    let start = Instant::now();
    let stats = scanner.run(std::future::pending()).await;

    assert_eq!(stats.cycles, 3);
    assert_eq!(stats.opportunities, 0);
    assert_eq!(scanner.api().poll_count(), 3);
    assert_eq!(mock.trade_call_count(), 0);
    // The inter-cycle sleep runs after every cycle, including the last.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(3_000), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(3_100), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn loop_recovers_from_errors_and_panics() {
    let degenerate = MockSnapshotBuilder::new()
        .capacity(0, 0, 0)
        .constants(dec!(0.0025), dec!(0.0015), dec!(0))
        .build();

    let mock = MockExchange::with_snapshot(spread_snapshot().merchants(0).build());
    mock.push_poll(MockPoll::Error("session expired".to_string()));
    mock.push_poll(MockPoll::Panic("unexpected payload".to_string()));
    mock.push_poll(MockPoll::Snapshot(degenerate));

    let mut scanner = MarketScanner::new(mock.clone(), params(4));
    let stats = scanner.run(std::future::pending()).await;

    assert_eq!(stats.cycles, 4);
    assert_eq!(stats.scan_errors, 3);
    assert_eq!(stats.aborts_for("merchants"), 1);
    assert_eq!(mock.poll_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn full_trade_through_the_loop() {
    let snapshot = spread_snapshot().build();
    let board = quote_resources(&snapshot).unwrap();
    let sell_price = board.price(Resource::Wood);
    let buy_price = board.price(Resource::Iron);

    let mock = MockExchange::with_snapshot(snapshot);
    mock.push_begin(-sell_price);
    mock.push_begin(buy_price);

    let mut scanner = MarketScanner::new(mock.clone(), params(1));
    let stats = scanner.run(std::future::pending()).await;

    assert_eq!(stats.trades_completed, 1);
    assert_eq!(stats.scan_errors, 0);
    assert_eq!(mock.confirm_count(TradeAction::Sell), 1);
    assert_eq!(mock.confirm_count(TradeAction::Buy), 1);
}

#[tokio::test(start_paused = true)]
async fn buy_timeout_does_not_stop_later_cycles() {
    let spread = spread_snapshot().build();
    let sell_price = quote_resources(&spread).unwrap().price(Resource::Wood);

    let mock = MockExchange::with_snapshot(MockSnapshotBuilder::new().build());
    mock.push_poll(MockPoll::Snapshot(spread));
    mock.push_begin(-sell_price);
    mock.set_default_begin(Err("exchange closed".to_string()));

    let mut scanner = MarketScanner::new(mock.clone(), params(2));
    let stats = scanner.run(std::future::pending()).await;

    assert_eq!(stats.cycles, 2);
    assert_eq!(stats.trades_completed, 0);
    assert_eq!(stats.aborts_for("buy_timeout"), 1);
    assert_eq!(mock.confirm_count(TradeAction::Sell), 1);
    assert_eq!(mock.confirm_count(TradeAction::Buy), 0);
    assert_eq!(mock.poll_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn dry_run_from_config_never_trades() {
    let config = Config {
        dry_run: true,
        max_cycles: 2,
        ..Config::default()
    };

    let mock = MockExchange::with_snapshot(spread_snapshot().build());
    let mut scanner = MarketScanner::new(mock.clone(), config.trading_params());
    let stats = scanner.run(std::future::pending()).await;

    assert_eq!(stats.opportunities, 2);
    assert_eq!(stats.trades_completed, 0);
    assert_eq!(mock.trade_call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_lets_an_inflight_trade_finish() {
    let spread = spread_snapshot().build();
    let board = quote_resources(&spread).unwrap();

    let mock = MockExchange::with_snapshot(spread);
    mock.push_begin(-board.price(Resource::Wood));
    mock.push_begin(board.price(Resource::Iron));

    let mut scanner = MarketScanner::new(mock.clone(), params(0));
    // Fires while the first cycle is between its sell and buy legs.
    let stats = scanner.run(tokio::time::sleep(Duration::from_millis(500))).await;

    assert_eq!(stats.cycles, 1);
    assert_eq!(stats.trades_completed, 1);
}
