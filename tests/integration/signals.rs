//! Process signals against the scan loop.

use std::time::Duration;

use tokio::time::sleep;
use tokio_test::assert_ok;

use exchange_arb::arbitrage::{quote_resources, MarketScanner};
use exchange_arb::config::TradingParams;
use exchange_arb::market::{MockExchange, MockSnapshotBuilder, Resource};
use exchange_arb::trading::TradeAction;
use exchange_arb::utils::ShutdownSignal;

fn raise(signal: &str) {
    let status = std::process::Command::new("kill")
        .args([signal, &std::process::id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());
}

#[tokio::test]
async fn interrupt_during_first_trade_lets_the_buy_finish() {
    let spread = MockSnapshotBuilder::new().stock(0, 5_000, 10_000).build();
    let board = quote_resources(&spread).unwrap();

    let mock = MockExchange::with_snapshot(spread);
    mock.push_begin(-board.price(Resource::Wood));
    mock.push_begin(board.price(Resource::Iron));

    let params = TradingParams {
        settle_delay: Duration::from_millis(10),
        post_sell_delay: Duration::from_millis(400),
        poll_interval: Duration::from_millis(50),
        ..TradingParams::default()
    };

    let shutdown = assert_ok!(ShutdownSignal::install());
    let observer = shutdown.clone();

    // Lands during the post-sell wait of the first cycle.
    let killer = tokio::spawn(async {
        sleep(Duration::from_millis(150)).await;
        tokio::task::spawn_blocking(|| raise("-INT")).await.unwrap();
    });

    let mut scanner = MarketScanner::new(mock.clone(), params);
    let stats = scanner.run(shutdown.wait()).await;
    killer.await.unwrap();

    assert!(observer.is_requested());
    assert_eq!(stats.cycles, 1);
    assert_eq!(stats.trades_completed, 1);
    assert_eq!(mock.confirm_count(TradeAction::Sell), 1);
    assert_eq!(mock.confirm_count(TradeAction::Buy), 1);
    assert_eq!(scanner.params().post_sell_delay, Duration::from_millis(400));
}
